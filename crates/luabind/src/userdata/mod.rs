// User-Data Binding Protocol
// Host values living inside VM-allocated blocks, with metamethods
// dispatched back to the host type through a per-type tag
mod block;
mod metatable;

use crate::lua_vm::LuaState;

pub use metatable::USERDATA_METATABLE;

/// Metamethod slots of the shared userdata metatable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaMethod {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    IDiv,
    BAnd,
    BOr,
    BXor,
    BNot,
    Shl,
    Shr,
    Concat,
    Len,
    Eq,
    Lt,
    Le,
    Index,
    NewIndex,
    Call,
    Gc,
    ToString,
    Close,
}

impl MetaMethod {
    pub const ALL: [MetaMethod; 25] = [
        MetaMethod::Add,
        MetaMethod::Sub,
        MetaMethod::Mul,
        MetaMethod::Div,
        MetaMethod::Mod,
        MetaMethod::Pow,
        MetaMethod::Unm,
        MetaMethod::IDiv,
        MetaMethod::BAnd,
        MetaMethod::BOr,
        MetaMethod::BXor,
        MetaMethod::BNot,
        MetaMethod::Shl,
        MetaMethod::Shr,
        MetaMethod::Concat,
        MetaMethod::Len,
        MetaMethod::Eq,
        MetaMethod::Lt,
        MetaMethod::Le,
        MetaMethod::Index,
        MetaMethod::NewIndex,
        MetaMethod::Call,
        MetaMethod::Gc,
        MetaMethod::ToString,
        MetaMethod::Close,
    ];

    /// Metatable field name, e.g. `"__add"`.
    pub fn name(self) -> &'static str {
        match self {
            MetaMethod::Add => "__add",
            MetaMethod::Sub => "__sub",
            MetaMethod::Mul => "__mul",
            MetaMethod::Div => "__div",
            MetaMethod::Mod => "__mod",
            MetaMethod::Pow => "__pow",
            MetaMethod::Unm => "__unm",
            MetaMethod::IDiv => "__idiv",
            MetaMethod::BAnd => "__band",
            MetaMethod::BOr => "__bor",
            MetaMethod::BXor => "__bxor",
            MetaMethod::BNot => "__bnot",
            MetaMethod::Shl => "__shl",
            MetaMethod::Shr => "__shr",
            MetaMethod::Concat => "__concat",
            MetaMethod::Len => "__len",
            MetaMethod::Eq => "__eq",
            MetaMethod::Lt => "__lt",
            MetaMethod::Le => "__le",
            MetaMethod::Index => "__index",
            MetaMethod::NewIndex => "__newindex",
            MetaMethod::Call => "__call",
            MetaMethod::Gc => "__gc",
            MetaMethod::ToString => "__tostring",
            MetaMethod::Close => "__close",
        }
    }
}

/// A host type that can be pushed into the VM as a full userdata.
///
/// Every hook receives the calling state with the metamethod's arguments on
/// the stack exactly as the interpreter passes them (operands at 1 and 2,
/// the key at 2 for `__index`, …), pushes its results and returns their
/// count. The defaults push nothing.
///
/// Hooks only get `&self`: scripts may reach the same value re-entrantly,
/// so mutable state belongs in `Cell`/`RefCell` fields.
///
/// `lua_gc` runs once, right before the value is dropped by the collector.
#[allow(unused_variables)]
pub trait UserData: 'static {
    /// Name used by the default `__tostring`.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn lua_add(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_sub(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_mul(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_div(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_mod(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_pow(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_unm(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_idiv(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_band(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_bor(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_bxor(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_bnot(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_shl(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_shr(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_concat(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_len(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_eq(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_lt(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_le(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_index(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_newindex(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_call(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_gc(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_tostring(&self, state: LuaState) -> i32 {
        0
    }
    fn lua_close(&self, state: LuaState) -> i32 {
        0
    }
}

// In-place layout of a host value inside a VM-allocated userdata block
use std::any::TypeId;
use std::cell::Cell;
use std::ffi::c_int;
use std::mem::ManuallyDrop;

use super::{MetaMethod, UserData};
use crate::lua_vm::LuaState;

/// Per-type function table, shared by every block of that type.
pub(crate) struct UserDataTag {
    pub(crate) type_id: fn() -> TypeId,
    pub(crate) type_name: fn() -> &'static str,
    /// Runs a metamethod hook (everything but `__gc`) on a live block.
    pub(crate) dispatch: unsafe fn(*mut u8, MetaMethod, LuaState) -> c_int,
    /// Runs the `lua_gc` hook, then drops the value in place.
    pub(crate) finalize: unsafe fn(*mut u8, LuaState),
}

/// Type-independent prefix of every [`UserDataBlock`].
#[repr(C)]
pub(crate) struct BlockHeader {
    pub(crate) tag: &'static UserDataTag,
    pub(crate) alive: Cell<bool>,
}

/// `{tag, alive, value}`; the tag is written once, before the block gets
/// its metatable, and never changes.
#[repr(C)]
pub(crate) struct UserDataBlock<T> {
    header: BlockHeader,
    value: ManuallyDrop<T>,
}

impl<T: UserData> UserDataBlock<T> {
    pub(crate) fn new(value: T) -> Self {
        let tag: &'static UserDataTag = const {
            &UserDataTag {
                type_id: TypeId::of::<T>,
                type_name: std::any::type_name::<T>,
                dispatch: dispatch::<T>,
                finalize: finalize::<T>,
            }
        };
        UserDataBlock {
            header: BlockHeader {
                tag,
                alive: Cell::new(true),
            },
            value: ManuallyDrop::new(value),
        }
    }

    /// Address of the value inside a block at `p`.
    ///
    /// # Safety
    /// `p` must point to a `UserDataBlock<T>`.
    pub(crate) unsafe fn value_ptr(p: *mut u8) -> *mut T {
        let block = p.cast::<UserDataBlock<T>>();
        unsafe { std::ptr::addr_of_mut!((*block).value).cast::<T>() }
    }
}

impl BlockHeader {
    /// # Safety
    /// `p` must point to a block created by [`UserDataBlock::new`].
    pub(crate) unsafe fn from_ptr<'a>(p: *mut u8) -> &'a BlockHeader {
        unsafe { &*p.cast::<BlockHeader>() }
    }

    pub(crate) fn holds<T: 'static>(&self) -> bool {
        self.alive.get() && (self.tag.type_id)() == TypeId::of::<T>()
    }
}

unsafe fn dispatch<T: UserData>(p: *mut u8, method: MetaMethod, state: LuaState) -> c_int {
    let value: &T = unsafe { &*UserDataBlock::<T>::value_ptr(p) };
    match method {
        MetaMethod::Add => value.lua_add(state),
        MetaMethod::Sub => value.lua_sub(state),
        MetaMethod::Mul => value.lua_mul(state),
        MetaMethod::Div => value.lua_div(state),
        MetaMethod::Mod => value.lua_mod(state),
        MetaMethod::Pow => value.lua_pow(state),
        MetaMethod::Unm => value.lua_unm(state),
        MetaMethod::IDiv => value.lua_idiv(state),
        MetaMethod::BAnd => value.lua_band(state),
        MetaMethod::BOr => value.lua_bor(state),
        MetaMethod::BXor => value.lua_bxor(state),
        MetaMethod::BNot => value.lua_bnot(state),
        MetaMethod::Shl => value.lua_shl(state),
        MetaMethod::Shr => value.lua_shr(state),
        MetaMethod::Concat => value.lua_concat(state),
        MetaMethod::Len => value.lua_len(state),
        MetaMethod::Eq => value.lua_eq(state),
        MetaMethod::Lt => value.lua_lt(state),
        MetaMethod::Le => value.lua_le(state),
        MetaMethod::Index => value.lua_index(state),
        MetaMethod::NewIndex => value.lua_newindex(state),
        MetaMethod::Call => value.lua_call(state),
        MetaMethod::Close => value.lua_close(state),
        MetaMethod::ToString => {
            let n = value.lua_tostring(state);
            if n > 0 {
                return n;
            }
            let text = format!("{}: {:p}", value.type_name(), p);
            state.push_string(&text);
            1
        }
        MetaMethod::Gc => 0,
    }
}

unsafe fn finalize<T: UserData>(p: *mut u8, state: LuaState) {
    let header = unsafe { BlockHeader::from_ptr(p) };
    if !header.alive.get() {
        return;
    }
    let value = unsafe { UserDataBlock::<T>::value_ptr(p) };
    unsafe { (*value).lua_gc(state) };
    unsafe { std::ptr::drop_in_place(value) };
    header.alive.set(false);
    log::debug!("finalized {} userdata at {:p}", std::any::type_name::<T>(), p);
}

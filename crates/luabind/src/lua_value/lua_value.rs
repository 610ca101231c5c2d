// Safe layer: registry handles released on drop
use std::cell::Cell;
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::rc::Rc;

use super::{Key, LuaNumber, Table, UnsafeLuaRef, UnsafeLuaValue, Value};
use crate::lua_vm::{LuaError, LuaResult, LuaState, LuaType, MULTRET, RefId, ThreadStatus};
use crate::userdata::UserData;

/// Single owner of one registry handle; releases it when dropped.
///
/// A handle that outlives its VM is not released: the registry is gone.
#[derive(Debug)]
pub struct LuaRef {
    state: LuaState,
    id: RefId,
    alive: Option<Rc<Cell<bool>>>,
}

impl LuaRef {
    fn new(state: LuaState, id: RefId) -> Self {
        LuaRef {
            state,
            id,
            alive: state.liveness(),
        }
    }

    /// Pop the top value and register it.
    pub fn pop_from(state: LuaState) -> Self {
        let id = state.registry_ref();
        Self::new(state, id)
    }

    /// Register the value at `idx`; the stack is unchanged.
    pub fn from_index(state: LuaState, idx: i32) -> Self {
        state.push_value(idx);
        Self::pop_from(state)
    }

    /// Take over an unsafe handle.
    pub fn from_unsafe(r: UnsafeLuaRef) -> Self {
        let (state, id) = r.into_raw_parts();
        Self::new(state, id)
    }

    /// Give the handle back to manual management.
    pub fn into_unsafe(self) -> UnsafeLuaRef {
        let mut this = ManuallyDrop::new(self);
        drop(this.alive.take());
        UnsafeLuaRef::new(this.state, this.id)
    }

    #[inline]
    pub fn state(&self) -> LuaState {
        self.state
    }

    #[inline]
    pub fn id(&self) -> RefId {
        self.id
    }

    /// Push the referenced value on the owning state's stack.
    pub fn push(&self) -> LuaType {
        self.state.push_ref(self.id)
    }

    /// A second, independently released handle to the same value.
    pub fn copy(&self) -> Self {
        self.push();
        Self::pop_from(self.state)
    }

    pub fn type_of(&self) -> LuaType {
        let t = self.push();
        self.state.pop(1);
        t
    }
}

impl Drop for LuaRef {
    fn drop(&mut self) {
        if self.alive.as_ref().is_none_or(|alive| alive.get()) {
            self.state.registry_unref(self.id);
        }
    }
}

macro_rules! typed_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name(LuaRef);

        impl $name {
            /// The underlying handle.
            #[inline]
            pub fn inner(&self) -> &LuaRef {
                &self.0
            }

            #[inline]
            pub fn into_inner(self) -> LuaRef {
                self.0
            }

            #[inline]
            pub fn state(&self) -> LuaState {
                self.0.state()
            }

            #[inline]
            pub fn push(&self) -> LuaType {
                self.0.push()
            }

            pub fn copy(&self) -> Self {
                $name(self.0.copy())
            }
        }
    };
}

typed_ref!(
    /// Handle to a Lua string.
    LuaStringRef
);
typed_ref!(
    /// Handle to a Lua table.
    LuaTableRef
);
typed_ref!(
    /// Handle to a Lua or host function.
    LuaFunctionRef
);
typed_ref!(
    /// Handle to a full userdata.
    LuaUserDataRef
);
typed_ref!(
    /// Handle to a coroutine.
    LuaThreadRef
);

impl LuaStringRef {
    pub fn to_string_lossy(&self) -> String {
        self.push();
        let s = self.state().to_string(-1).unwrap_or_default();
        self.state().pop(1);
        s
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.push();
        let b = self.state().to_bytes(-1).unwrap_or_default();
        self.state().pop(1);
        b
    }
}

impl LuaTableRef {
    /// Push the table, asserting the handle still denotes one.
    fn push_table(&self) -> LuaState {
        let state = self.state();
        let t = self.push();
        assert_eq!(t, LuaType::Table, "table handle {} denotes a {t}", self.0.id());
        state
    }

    /// Recursive host copy of the table.
    pub fn copy_to_host(&self) -> Table {
        let state = self.push_table();
        let table = state.copy_table(-1);
        state.pop(1);
        table
    }

    fn push_key(state: LuaState, key: Key) {
        match key {
            Key::Bool(b) => state.push_boolean(b),
            Key::String(s) => state.push_string(&s),
            Key::Integer(i) => state.push_integer(i),
            Key::Float(f) => state.push_number(f),
        }
    }

    /// `t[key]` (honoring `__index`) copied to the host; `None` when the
    /// value has no host form.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let state = self.push_table();
        Self::push_key(state, key.into());
        state.get_table(-2);
        let v = state.to_host(-1);
        state.pop(2);
        v
    }

    /// `t[key] = value` (honoring `__newindex`).
    pub fn set(&self, key: impl Into<Key>, value: &Value) {
        let state = self.push_table();
        Self::push_key(state, key.into());
        state.push_host(value);
        state.set_table(-3);
        state.pop(1);
    }

    /// Length as the `#` operator reports it.
    pub fn len(&self) -> i64 {
        let state = self.push_table();
        state.len(-1);
        let n = state.to_integer(-1).unwrap_or_default();
        state.pop(2);
        n
    }

    pub fn is_empty(&self) -> bool {
        let state = self.push_table();
        state.push_nil();
        let empty = !state.next(-2);
        state.pop(if empty { 1 } else { 3 });
        empty
    }

    /// Visit every pair with the key at -2 and the value at -1.
    ///
    /// `f` must leave the stack as it found it; returning false stops early.
    pub fn for_each(&self, mut f: impl FnMut(LuaState) -> bool) {
        let state = self.push_table();
        let t = state.abs_index(-1);
        state.push_nil();
        while state.next(t) {
            if !f(state) {
                state.pop(2);
                break;
            }
            state.pop(1);
        }
        state.pop(1);
    }
}

impl LuaFunctionRef {
    /// Protected call with host arguments.
    ///
    /// All results (or the error object) are left on the stack; the count of
    /// values pushed is returned with the status.
    pub fn call(&self, args: &[Value]) -> (ThreadStatus, i32) {
        let state = self.state();
        let base = state.get_top();
        self.push();
        for arg in args {
            state.push_host(arg);
        }
        let status = state.pcall(args.len() as i32, MULTRET, 0);
        (status, state.get_top() - base)
    }
}

impl LuaUserDataRef {
    /// The bound host value, if this userdata carries a live `T`.
    ///
    /// The handle keeps the userdata alive, so the borrow is valid for as
    /// long as the handle is.
    pub fn downcast<T: UserData>(&self) -> Option<&T> {
        self.push();
        let p = self.state().to_userdata::<T>(-1);
        self.state().pop(1);
        p.map(|p| unsafe { &*p.as_ptr() })
    }
}

impl LuaThreadRef {
    /// Handle of the coroutine, asserting the handle still denotes one.
    pub fn thread(&self) -> LuaState {
        let state = self.state();
        let t = self.push();
        let co = state.to_thread(-1);
        state.pop(1);
        match co {
            Some(co) => co,
            None => panic!("thread handle {} denotes a {t}", self.0.id()),
        }
    }
}

macro_rules! typed_from_value {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            impl TryFrom<LuaValue> for $name {
                type Error = LuaError;

                /// On a mismatch the value is released.
                fn try_from(value: LuaValue) -> LuaResult<Self> {
                    match value {
                        LuaValue::$variant(r) => Ok(r),
                        other => Err(LuaError::TypeMismatch {
                            expected: LuaType::$variant,
                            found: other.type_of(),
                        }),
                    }
                }
            }
        )*
    };
}

typed_from_value! {
    LuaStringRef => String,
    LuaTableRef => Table,
    LuaFunctionRef => Function,
    LuaUserDataRef => UserData,
    LuaThreadRef => Thread,
}

/// Lua value detached from the stack, released on drop.
///
/// Extracting a typed handle with one of the `as_*` methods consumes the
/// value: on a type mismatch the value is released and `None` returned.
#[derive(Debug)]
pub enum LuaValue {
    /// Invalid stack index.
    None,
    Nil,
    Bool(bool),
    Number(LuaNumber),
    String(LuaStringRef),
    Table(LuaTableRef),
    Function(LuaFunctionRef),
    UserData(LuaUserDataRef),
    Thread(LuaThreadRef),
    LightUserData(*mut c_void),
}

#[allow(clippy::wrong_self_convention)]
impl LuaValue {
    /// Detach the value at `idx`; the stack is unchanged.
    pub fn from_index(state: LuaState, idx: i32) -> Self {
        Self::from_unsafe(UnsafeLuaValue::from_index(state, idx))
    }

    /// Detach and pop the top value.
    pub fn pop_from(state: LuaState) -> Self {
        Self::from_unsafe(UnsafeLuaValue::pop_from(state))
    }

    pub fn from_unsafe(v: UnsafeLuaValue) -> Self {
        match v {
            UnsafeLuaValue::None => LuaValue::None,
            UnsafeLuaValue::Nil => LuaValue::Nil,
            UnsafeLuaValue::Bool(b) => LuaValue::Bool(b),
            UnsafeLuaValue::Number(n) => LuaValue::Number(n),
            UnsafeLuaValue::LightUserData(p) => LuaValue::LightUserData(p),
            UnsafeLuaValue::String(r) => LuaValue::String(LuaStringRef(LuaRef::from_unsafe(r))),
            UnsafeLuaValue::Table(r) => LuaValue::Table(LuaTableRef(LuaRef::from_unsafe(r))),
            UnsafeLuaValue::Function(r) => {
                LuaValue::Function(LuaFunctionRef(LuaRef::from_unsafe(r)))
            }
            UnsafeLuaValue::UserData(r) => {
                LuaValue::UserData(LuaUserDataRef(LuaRef::from_unsafe(r)))
            }
            UnsafeLuaValue::Thread(r) => LuaValue::Thread(LuaThreadRef(LuaRef::from_unsafe(r))),
        }
    }

    /// Give the value back to manual management.
    pub fn into_unsafe(self) -> UnsafeLuaValue {
        match self {
            LuaValue::None => UnsafeLuaValue::None,
            LuaValue::Nil => UnsafeLuaValue::Nil,
            LuaValue::Bool(b) => UnsafeLuaValue::Bool(b),
            LuaValue::Number(n) => UnsafeLuaValue::Number(n),
            LuaValue::LightUserData(p) => UnsafeLuaValue::LightUserData(p),
            LuaValue::String(r) => UnsafeLuaValue::String(r.0.into_unsafe()),
            LuaValue::Table(r) => UnsafeLuaValue::Table(r.0.into_unsafe()),
            LuaValue::Function(r) => UnsafeLuaValue::Function(r.0.into_unsafe()),
            LuaValue::UserData(r) => UnsafeLuaValue::UserData(r.0.into_unsafe()),
            LuaValue::Thread(r) => UnsafeLuaValue::Thread(r.0.into_unsafe()),
        }
    }

    pub fn type_of(&self) -> LuaType {
        match self {
            LuaValue::None => LuaType::None,
            LuaValue::Nil => LuaType::Nil,
            LuaValue::Bool(_) => LuaType::Boolean,
            LuaValue::Number(_) => LuaType::Number,
            LuaValue::String(_) => LuaType::String,
            LuaValue::Table(_) => LuaType::Table,
            LuaValue::Function(_) => LuaType::Function,
            LuaValue::UserData(_) => LuaType::UserData,
            LuaValue::Thread(_) => LuaType::Thread,
            LuaValue::LightUserData(_) => LuaType::LightUserData,
        }
    }

    /// The registry handle behind a reference variant.
    pub fn reference(&self) -> Option<&LuaRef> {
        match self {
            LuaValue::String(r) => Some(&r.0),
            LuaValue::Table(r) => Some(&r.0),
            LuaValue::Function(r) => Some(&r.0),
            LuaValue::UserData(r) => Some(&r.0),
            LuaValue::Thread(r) => Some(&r.0),
            _ => None,
        }
    }

    /// Push the value on `state`, which must belong to the same VM.
    pub fn push(&self, state: LuaState) {
        match self {
            LuaValue::None | LuaValue::Nil => state.push_nil(),
            LuaValue::Bool(b) => state.push_boolean(*b),
            LuaValue::Number(LuaNumber::Int(i)) => state.push_integer(*i),
            LuaValue::Number(LuaNumber::Float(f)) => state.push_number(*f),
            LuaValue::LightUserData(p) => state.push_light_userdata(*p),
            _ => {
                if let Some(r) = self.reference() {
                    state.push_ref(r.id());
                }
            }
        }
    }

    /// Independent copy; reference variants are registered again.
    pub fn copy(&self) -> Self {
        match self {
            LuaValue::None => LuaValue::None,
            LuaValue::Nil => LuaValue::Nil,
            LuaValue::Bool(b) => LuaValue::Bool(*b),
            LuaValue::Number(n) => LuaValue::Number(*n),
            LuaValue::LightUserData(p) => LuaValue::LightUserData(*p),
            LuaValue::String(r) => LuaValue::String(r.copy()),
            LuaValue::Table(r) => LuaValue::Table(r.copy()),
            LuaValue::Function(r) => LuaValue::Function(r.copy()),
            LuaValue::UserData(r) => LuaValue::UserData(r.copy()),
            LuaValue::Thread(r) => LuaValue::Thread(r.copy()),
        }
    }

    /// Fully detached host copy; `None` for functions, userdata and threads.
    pub fn copy_to_host(&self) -> Option<Value> {
        Some(match self {
            LuaValue::Nil => Value::Nil,
            LuaValue::Bool(b) => Value::Bool(*b),
            LuaValue::Number(n) => Value::Number(*n),
            LuaValue::LightUserData(p) => Value::LightUserData(*p),
            LuaValue::String(s) => Value::String(s.to_string_lossy()),
            LuaValue::Table(t) => Value::Table(t.copy_to_host()),
            LuaValue::None | LuaValue::Function(_) | LuaValue::UserData(_) | LuaValue::Thread(_) => {
                return None;
            }
        })
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::None | LuaValue::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LuaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<LuaNumber> {
        match self {
            LuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_light_userdata(&self) -> Option<*mut c_void> {
        match self {
            LuaValue::LightUserData(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_string(self) -> Option<LuaStringRef> {
        match self {
            LuaValue::String(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_table(self) -> Option<LuaTableRef> {
        match self {
            LuaValue::Table(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_function(self) -> Option<LuaFunctionRef> {
        match self {
            LuaValue::Function(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_userdata(self) -> Option<LuaUserDataRef> {
        match self {
            LuaValue::UserData(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_thread(self) -> Option<LuaThreadRef> {
        match self {
            LuaValue::Thread(r) => Some(r),
            _ => None,
        }
    }
}

impl LuaState {
    /// Detach the value at `idx` into the safe layer (stack unchanged).
    pub fn to_value(&self, idx: i32) -> LuaValue {
        LuaValue::from_index(*self, idx)
    }
}

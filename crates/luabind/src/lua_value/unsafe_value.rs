// Unsafe layer: registry handles released by hand
use std::ffi::c_void;

use super::{LuaNumber, LuaValue};
use crate::lua_vm::{LuaState, LuaType, RefId};

/// One registry handle that the holder must release exactly once with
/// [`unref`](Self::unref).
///
/// Not `Clone`: a second owner needs its own handle, obtained with
/// [`copy`](Self::copy), which registers the value again.
#[must_use = "registry handles leak unless released with unref()"]
#[derive(Debug, PartialEq, Eq)]
pub struct UnsafeLuaRef {
    state: LuaState,
    id: RefId,
}

impl UnsafeLuaRef {
    pub(crate) fn new(state: LuaState, id: RefId) -> Self {
        UnsafeLuaRef { state, id }
    }

    /// Pop the top value and register it.
    pub fn pop_from(state: LuaState) -> Self {
        let id = state.registry_ref();
        UnsafeLuaRef { state, id }
    }

    /// Register the value at `idx`; the stack is unchanged.
    pub fn from_index(state: LuaState, idx: i32) -> Self {
        state.push_value(idx);
        Self::pop_from(state)
    }

    /// Adopt a handle obtained from [`LuaState::registry_ref`].
    ///
    /// # Safety
    /// `id` must be live in the registry of `state`'s VM and owned by nobody else.
    pub unsafe fn from_raw_parts(state: LuaState, id: RefId) -> Self {
        UnsafeLuaRef { state, id }
    }

    /// Give up ownership without releasing.
    pub fn into_raw_parts(self) -> (LuaState, RefId) {
        (self.state, self.id)
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

    /// Register the same value again under a new, independent handle.
    pub fn copy(&self) -> Self {
        self.push();
        Self::pop_from(self.state)
    }

    /// Release the handle.
    pub fn unref(self) {
        self.state.registry_unref(self.id);
    }
}

/// Lua value detached from the stack, with manual release.
///
/// Reference variants hold an [`UnsafeLuaRef`]; the value must be released
/// with [`unref`](Self::unref) or turned into a [`LuaValue`] with
/// [`into_safe`](Self::into_safe).
#[must_use = "registry handles leak unless released with unref()"]
#[derive(Debug)]
pub enum UnsafeLuaValue {
    /// Invalid stack index.
    None,
    Nil,
    Bool(bool),
    Number(LuaNumber),
    String(UnsafeLuaRef),
    Table(UnsafeLuaRef),
    Function(UnsafeLuaRef),
    UserData(UnsafeLuaRef),
    Thread(UnsafeLuaRef),
    LightUserData(*mut c_void),
}

#[allow(clippy::wrong_self_convention)]
impl UnsafeLuaValue {
    /// Detach the value at `idx`; references get registered, the stack is unchanged.
    pub fn from_index(state: LuaState, idx: i32) -> Self {
        match state.type_of(idx) {
            LuaType::None => UnsafeLuaValue::None,
            LuaType::Nil => UnsafeLuaValue::Nil,
            LuaType::Boolean => UnsafeLuaValue::Bool(state.to_boolean(idx)),
            LuaType::Number => UnsafeLuaValue::Number(if state.is_integer(idx) {
                LuaNumber::Int(state.to_integer(idx).unwrap_or_default())
            } else {
                LuaNumber::Float(state.to_number(idx).unwrap_or_default())
            }),
            LuaType::LightUserData => UnsafeLuaValue::LightUserData(state.to_userdata_ptr(idx)),
            LuaType::String => UnsafeLuaValue::String(UnsafeLuaRef::from_index(state, idx)),
            LuaType::Table => UnsafeLuaValue::Table(UnsafeLuaRef::from_index(state, idx)),
            LuaType::Function => UnsafeLuaValue::Function(UnsafeLuaRef::from_index(state, idx)),
            LuaType::UserData => UnsafeLuaValue::UserData(UnsafeLuaRef::from_index(state, idx)),
            LuaType::Thread => UnsafeLuaValue::Thread(UnsafeLuaRef::from_index(state, idx)),
        }
    }

    /// Detach and pop the top value.
    pub fn pop_from(state: LuaState) -> Self {
        let v = Self::from_index(state, -1);
        state.pop(1);
        v
    }

    pub fn type_of(&self) -> LuaType {
        match self {
            UnsafeLuaValue::None => LuaType::None,
            UnsafeLuaValue::Nil => LuaType::Nil,
            UnsafeLuaValue::Bool(_) => LuaType::Boolean,
            UnsafeLuaValue::Number(_) => LuaType::Number,
            UnsafeLuaValue::String(_) => LuaType::String,
            UnsafeLuaValue::Table(_) => LuaType::Table,
            UnsafeLuaValue::Function(_) => LuaType::Function,
            UnsafeLuaValue::UserData(_) => LuaType::UserData,
            UnsafeLuaValue::Thread(_) => LuaType::Thread,
            UnsafeLuaValue::LightUserData(_) => LuaType::LightUserData,
        }
    }

    fn reference(&self) -> Option<&UnsafeLuaRef> {
        match self {
            UnsafeLuaValue::String(r)
            | UnsafeLuaValue::Table(r)
            | UnsafeLuaValue::Function(r)
            | UnsafeLuaValue::UserData(r)
            | UnsafeLuaValue::Thread(r) => Some(r),
            _ => None,
        }
    }

    /// Push the value on `state`, which must belong to the same VM.
    pub fn push(&self, state: LuaState) {
        match self {
            UnsafeLuaValue::None | UnsafeLuaValue::Nil => state.push_nil(),
            UnsafeLuaValue::Bool(b) => state.push_boolean(*b),
            UnsafeLuaValue::Number(LuaNumber::Int(i)) => state.push_integer(*i),
            UnsafeLuaValue::Number(LuaNumber::Float(f)) => state.push_number(*f),
            UnsafeLuaValue::LightUserData(p) => state.push_light_userdata(*p),
            UnsafeLuaValue::String(r)
            | UnsafeLuaValue::Table(r)
            | UnsafeLuaValue::Function(r)
            | UnsafeLuaValue::UserData(r)
            | UnsafeLuaValue::Thread(r) => {
                state.push_ref(r.id());
            }
        }
    }

    /// Independent copy; reference variants are registered again.
    pub fn copy(&self) -> Self {
        match self {
            UnsafeLuaValue::None => UnsafeLuaValue::None,
            UnsafeLuaValue::Nil => UnsafeLuaValue::Nil,
            UnsafeLuaValue::Bool(b) => UnsafeLuaValue::Bool(*b),
            UnsafeLuaValue::Number(n) => UnsafeLuaValue::Number(*n),
            UnsafeLuaValue::LightUserData(p) => UnsafeLuaValue::LightUserData(*p),
            UnsafeLuaValue::String(r) => UnsafeLuaValue::String(r.copy()),
            UnsafeLuaValue::Table(r) => UnsafeLuaValue::Table(r.copy()),
            UnsafeLuaValue::Function(r) => UnsafeLuaValue::Function(r.copy()),
            UnsafeLuaValue::UserData(r) => UnsafeLuaValue::UserData(r.copy()),
            UnsafeLuaValue::Thread(r) => UnsafeLuaValue::Thread(r.copy()),
        }
    }

    /// Release the handle of a reference variant; no-op for the others.
    pub fn unref(self) {
        match self {
            UnsafeLuaValue::String(r)
            | UnsafeLuaValue::Table(r)
            | UnsafeLuaValue::Function(r)
            | UnsafeLuaValue::UserData(r)
            | UnsafeLuaValue::Thread(r) => r.unref(),
            _ => {}
        }
    }

    /// Hand the value over to the safe layer, which releases it on drop.
    pub fn into_safe(self) -> LuaValue {
        LuaValue::from_unsafe(self)
    }

    /// Registry handle of a reference variant.
    pub fn ref_id(&self) -> Option<RefId> {
        self.reference().map(UnsafeLuaRef::id)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, UnsafeLuaValue::None | UnsafeLuaValue::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            UnsafeLuaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<LuaNumber> {
        match self {
            UnsafeLuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_light_userdata(&self) -> Option<*mut c_void> {
        match self {
            UnsafeLuaValue::LightUserData(p) => Some(*p),
            _ => None,
        }
    }

    /// The string handle, or the value itself back when it is not a string.
    pub fn as_string(self) -> Result<UnsafeLuaRef, Self> {
        match self {
            UnsafeLuaValue::String(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn as_table(self) -> Result<UnsafeLuaRef, Self> {
        match self {
            UnsafeLuaValue::Table(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn as_function(self) -> Result<UnsafeLuaRef, Self> {
        match self {
            UnsafeLuaValue::Function(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn as_userdata(self) -> Result<UnsafeLuaRef, Self> {
        match self {
            UnsafeLuaValue::UserData(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn as_thread(self) -> Result<UnsafeLuaRef, Self> {
        match self {
            UnsafeLuaValue::Thread(r) => Ok(r),
            other => Err(other),
        }
    }
}

impl LuaState {
    /// Detach the value at `idx` into the unsafe layer (stack unchanged).
    pub fn to_unsafe_value(&self, idx: i32) -> UnsafeLuaValue {
        UnsafeLuaValue::from_index(*self, idx)
    }
}

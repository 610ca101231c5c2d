// Reference Registry Bridge
// Integer handles into the registry table keep values alive off-stack
use super::{LuaState, LuaType, REGISTRY_INDEX};
use crate::ffi;

/// Integer key of one registered value.
///
/// A handle is not an object: once released, the same integer may be handed
/// out again for an unrelated value.
pub type RefId = i32;

/// Sentinel meaning "no value registered".
pub const NO_REF: RefId = ffi::LUA_NOREF;

/// Sentinel returned when registering `nil`.
pub const REF_NIL: RefId = ffi::LUA_REFNIL;

impl LuaState {
    /// Pop the top value and register it, returning its handle.
    ///
    /// Registering `nil` returns [`REF_NIL`] without touching the registry.
    pub fn registry_ref(&self) -> RefId {
        debug_assert!(self.get_top() > 0, "registry_ref on an empty stack");
        let id = unsafe { ffi::luaL_ref(self.as_ptr(), REGISTRY_INDEX) };
        log::trace!("ref {id}");
        id
    }

    /// Release a handle. No-op for [`NO_REF`] and [`REF_NIL`].
    ///
    /// Releasing the same live handle twice may release a later, unrelated
    /// handle that reused the integer.
    pub fn registry_unref(&self, id: RefId) {
        if id == NO_REF || id == REF_NIL {
            return;
        }
        log::trace!("unref {id}");
        unsafe { ffi::luaL_unref(self.as_ptr(), REGISTRY_INDEX, id) }
    }

    /// Push the value a handle refers to (nil for the sentinels).
    pub fn push_ref(&self, id: RefId) -> LuaType {
        if id == NO_REF || id == REF_NIL {
            self.push_nil();
            return LuaType::Nil;
        }
        self.raw_get_i_registry(id as i64)
    }

    /// Push `registry[n]` without metamethods.
    pub fn raw_get_i_registry(&self, n: i64) -> LuaType {
        self.raw_get_i(REGISTRY_INDEX, n)
    }
}

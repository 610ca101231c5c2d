// Table access, metatables and globals
use std::ffi::{CString, c_void};
use std::ptr::NonNull;

use super::{LuaState, LuaType, REGISTRY_INDEX, RIDX_GLOBALS};
use crate::ffi;

/// C string for names handed to the auxiliary library; cut at the first NUL.
pub(crate) fn c_name(s: &str) -> CString {
    let bytes = s.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    // No interior NUL is left after the cut.
    CString::new(&bytes[..end]).unwrap_or_default()
}

impl LuaState {
    /// Push `t[name]` where `t` is at `idx` (may call `__index`).
    pub fn get_field(&self, idx: i32, name: &str) -> LuaType {
        self.check_index(idx);
        let t = self.abs_index(idx);
        self.push_string(name);
        LuaType::from_raw(unsafe { ffi::lua_gettable(self.as_ptr(), t) })
    }

    /// `t[name] = v` where `t` is at `idx` and `v` is on top; pops `v`.
    pub fn set_field(&self, idx: i32, name: &str) {
        self.check_index(idx);
        let t = self.abs_index(idx);
        self.push_string(name);
        self.insert(-2);
        unsafe { ffi::lua_settable(self.as_ptr(), t) }
    }

    /// Push `t[n]` (may call `__index`).
    pub fn get_i(&self, idx: i32, n: i64) -> LuaType {
        self.check_index(idx);
        self.reserve(1);
        LuaType::from_raw(unsafe { ffi::lua_geti(self.as_ptr(), idx, n as ffi::lua_Integer) })
    }

    /// `t[n] = v` with `v` on top; pops `v`.
    pub fn set_i(&self, idx: i32, n: i64) {
        self.check_index(idx);
        unsafe { ffi::lua_seti(self.as_ptr(), idx, n as ffi::lua_Integer) }
    }

    /// Replace the key on top with `t[key]`.
    pub fn get_table(&self, idx: i32) -> LuaType {
        self.check_index(idx);
        LuaType::from_raw(unsafe { ffi::lua_gettable(self.as_ptr(), idx) })
    }

    /// `t[k] = v` with `k` below `v` on top; pops both.
    pub fn set_table(&self, idx: i32) {
        self.check_index(idx);
        unsafe { ffi::lua_settable(self.as_ptr(), idx) }
    }

    pub fn raw_get(&self, idx: i32) -> LuaType {
        self.check_index(idx);
        LuaType::from_raw(unsafe { ffi::lua_rawget(self.as_ptr(), idx) })
    }

    pub fn raw_set(&self, idx: i32) {
        self.check_index(idx);
        unsafe { ffi::lua_rawset(self.as_ptr(), idx) }
    }

    pub fn raw_get_i(&self, idx: i32, n: i64) -> LuaType {
        self.check_index(idx);
        self.reserve(1);
        LuaType::from_raw(unsafe { ffi::lua_rawgeti(self.as_ptr(), idx, n as ffi::lua_Integer) })
    }

    pub fn raw_set_i(&self, idx: i32, n: i64) {
        self.check_index(idx);
        unsafe { ffi::lua_rawseti(self.as_ptr(), idx, n as ffi::lua_Integer) }
    }

    /// Pop a key and push the next key/value pair of the table at `idx`.
    ///
    /// Returns false, pushing nothing, when the traversal is over.
    pub fn next(&self, idx: i32) -> bool {
        self.check_index(idx);
        self.reserve(1);
        unsafe { ffi::lua_next(self.as_ptr(), idx) != 0 }
    }

    /// Push a new table preallocated for `narr` array and `nrec` hash entries.
    pub fn create_table(&self, narr: usize, nrec: usize) {
        self.reserve(1);
        let narr = narr.min(i32::MAX as usize) as i32;
        let nrec = nrec.min(i32::MAX as usize) as i32;
        unsafe { ffi::lua_createtable(self.as_ptr(), narr, nrec) }
    }

    #[inline]
    pub fn new_table(&self) {
        self.create_table(0, 0);
    }

    /// Push the metatable of the value at `idx`; false (nothing pushed) if none.
    pub fn get_metatable(&self, idx: i32) -> bool {
        self.check_index(idx);
        self.reserve(1);
        unsafe { ffi::lua_getmetatable(self.as_ptr(), idx) != 0 }
    }

    /// Pop a table (or nil) and set it as the metatable of the value at `idx`.
    pub fn set_metatable(&self, idx: i32) {
        self.check_index(idx);
        unsafe {
            ffi::lua_setmetatable(self.as_ptr(), idx);
        }
    }

    /// Push the registry metatable `name`, creating it when absent.
    ///
    /// Returns true if it was created by this call.
    pub fn new_metatable(&self, name: &str) -> bool {
        self.reserve(2);
        let name = c_name(name);
        unsafe { ffi::luaL_newmetatable(self.as_ptr(), name.as_ptr()) != 0 }
    }

    /// Push the registry metatable `name` (nil if absent).
    pub fn get_named_metatable(&self, name: &str) -> LuaType {
        self.get_field(REGISTRY_INDEX, name)
    }

    /// Block address of the full userdata at `idx` if its metatable is `name`.
    pub fn test_userdata(&self, idx: i32, name: &str) -> Option<NonNull<c_void>> {
        self.check_index(idx);
        self.reserve(2);
        let name = c_name(name);
        NonNull::new(unsafe { ffi::luaL_testudata(self.as_ptr(), idx, name.as_ptr()) })
    }

    /// Like [`test_userdata`](Self::test_userdata), but raises a Lua argument
    /// error on mismatch.
    ///
    /// Only valid inside a host function.
    pub fn check_userdata(&self, arg: i32, name: &str) -> NonNull<c_void> {
        match self.test_userdata(arg, name) {
            Some(p) => p,
            None => {
                {
                    let msg = format!("{name} expected, got {}", self.type_name(arg));
                    self.push_arg_error(arg, &msg);
                }
                self.error()
            }
        }
    }

    /// Push the `n`-th user value of the userdata at `idx`.
    pub fn get_user_value(&self, idx: i32, n: i32) -> LuaType {
        self.check_index(idx);
        self.reserve(1);
        LuaType::from_raw(unsafe { ffi::lua_getiuservalue(self.as_ptr(), idx, n) })
    }

    /// Pop a value into the `n`-th user value of the userdata at `idx`.
    ///
    /// Returns false if the userdata has no such slot.
    pub fn set_user_value(&self, idx: i32, n: i32) -> bool {
        self.check_index(idx);
        unsafe { ffi::lua_setiuservalue(self.as_ptr(), idx, n) != 0 }
    }

    /// Push the global table.
    pub fn push_globals(&self) {
        self.raw_get_i(REGISTRY_INDEX, RIDX_GLOBALS);
    }

    /// Push the global `name`.
    pub fn get_global(&self, name: &str) -> LuaType {
        self.push_globals();
        let t = self.get_field(-1, name);
        self.remove(-2);
        t
    }

    /// Pop the top value into the global `name`.
    pub fn set_global(&self, name: &str) {
        self.push_globals();
        self.insert(-2);
        self.set_field(-2, name);
        self.pop(1);
    }
}

#[cfg(test)]
mod tests {
    use super::c_name;

    #[test]
    fn test_c_name_cuts_at_nul() {
        assert_eq!(c_name("plain").as_bytes(), b"plain");
        assert_eq!(c_name("a\0b").as_bytes(), b"a");
        assert_eq!(c_name("").as_bytes(), b"");
    }
}

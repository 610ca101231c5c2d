// Stack Operations
// Push/pop/type/compare primitives addressing one thread's value stack
use std::ffi::{CStr, c_char, c_int, c_void};

use super::{CompareOp, LuaState, LuaType, REGISTRY_INDEX};
use crate::ffi;

/// Copy `len` bytes at `ptr` into an owned string, replacing invalid UTF-8.
///
/// # Safety
/// `ptr` must point to at least `len` readable bytes.
pub(crate) unsafe fn lossy_string(ptr: *const c_char, len: usize) -> String {
    let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
    String::from_utf8_lossy(bytes).into_owned()
}

impl LuaState {
    /// Reserve `n` extra slots; running out of stack is a protocol violation.
    #[inline]
    pub(crate) fn reserve(&self, n: i32) {
        let ok = unsafe { ffi::lua_checkstack(self.as_ptr(), n) } != 0;
        assert!(ok, "lua stack overflow (cannot grow by {n} slots)");
    }

    #[inline]
    pub(crate) fn check_index(&self, idx: i32) {
        debug_assert!(idx != 0, "stack index 0 is never valid");
        debug_assert!(
            idx > 0 || idx <= REGISTRY_INDEX || -idx <= self.get_top(),
            "stack index {idx} is below the bottom of the stack (top = {})",
            self.get_top()
        );
    }

    // ===== Stack control =====

    #[inline]
    pub fn get_top(&self) -> i32 {
        unsafe { ffi::lua_gettop(self.as_ptr()) }
    }

    /// Set the top to `idx`, filling with nil or discarding values.
    #[inline]
    pub fn set_top(&self, idx: i32) {
        unsafe { ffi::lua_settop(self.as_ptr(), idx) }
    }

    /// Remove the top `n` values.
    #[inline]
    pub fn pop(&self, n: i32) {
        debug_assert!(n <= self.get_top(), "pop({n}) with only {} values", self.get_top());
        self.set_top(-n - 1);
    }

    #[inline]
    pub fn abs_index(&self, idx: i32) -> i32 {
        unsafe { ffi::lua_absindex(self.as_ptr(), idx) }
    }

    /// Ensure room for `n` more values; false if the stack cannot grow.
    #[inline]
    pub fn check_stack(&self, n: i32) -> bool {
        unsafe { ffi::lua_checkstack(self.as_ptr(), n) != 0 }
    }

    /// Push a copy of the value at `idx`.
    pub fn push_value(&self, idx: i32) {
        self.check_index(idx);
        self.reserve(1);
        unsafe { ffi::lua_pushvalue(self.as_ptr(), idx) }
    }

    /// Move the top value into `idx`, shifting up the values above it.
    pub fn insert(&self, idx: i32) {
        self.check_index(idx);
        self.rotate(idx, 1);
    }

    /// Remove the value at `idx`, shifting down the values above it.
    pub fn remove(&self, idx: i32) {
        self.check_index(idx);
        self.rotate(idx, -1);
        self.pop(1);
    }

    /// Move the top value into `idx` without shifting, popping it.
    pub fn replace(&self, idx: i32) {
        self.check_index(idx);
        self.copy(-1, idx);
        self.pop(1);
    }

    /// Rotate the values between `idx` and the top `n` positions towards the top.
    pub fn rotate(&self, idx: i32, n: i32) {
        self.check_index(idx);
        unsafe { ffi::lua_rotate(self.as_ptr(), idx, n) }
    }

    /// Copy the value at `from` into `to`, replacing it.
    pub fn copy(&self, from: i32, to: i32) {
        self.check_index(from);
        self.check_index(to);
        unsafe { ffi::lua_copy(self.as_ptr(), from, to) }
    }

    /// Pop `n` values from this stack and push them onto `to`.
    ///
    /// Both threads must belong to the same VM.
    pub fn xmove(&self, to: LuaState, n: i32) {
        if n == 0 || to == *self {
            return;
        }
        to.reserve(n);
        unsafe { ffi::lua_xmove(self.as_ptr(), to.as_ptr(), n) }
    }

    // ===== Push =====

    #[inline]
    pub fn push_nil(&self) {
        self.reserve(1);
        unsafe { ffi::lua_pushnil(self.as_ptr()) }
    }

    #[inline]
    pub fn push_boolean(&self, b: bool) {
        self.reserve(1);
        unsafe { ffi::lua_pushboolean(self.as_ptr(), b as c_int) }
    }

    #[inline]
    pub fn push_integer(&self, n: i64) {
        self.reserve(1);
        unsafe { ffi::lua_pushinteger(self.as_ptr(), n as ffi::lua_Integer) }
    }

    #[inline]
    pub fn push_number(&self, n: f64) {
        self.reserve(1);
        unsafe { ffi::lua_pushnumber(self.as_ptr(), n as ffi::lua_Number) }
    }

    /// Push a string; embedded NUL bytes are kept.
    #[inline]
    pub fn push_string(&self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        self.reserve(1);
        unsafe {
            ffi::lua_pushlstring(self.as_ptr(), bytes.as_ptr().cast(), bytes.len());
        }
    }

    #[inline]
    pub fn push_light_userdata(&self, p: *mut c_void) {
        self.reserve(1);
        unsafe { ffi::lua_pushlightuserdata(self.as_ptr(), p) }
    }

    /// Push this thread; true if it is the main thread.
    pub fn push_thread(&self) -> bool {
        self.reserve(1);
        unsafe { ffi::lua_pushthread(self.as_ptr()) != 0 }
    }

    /// Push a raw C function with `nup` upvalues taken from the top of the stack.
    pub fn push_c_closure(&self, f: ffi::lua_CFunction, nup: i32) {
        self.reserve(1);
        unsafe { ffi::lua_pushcclosure(self.as_ptr(), f, nup) }
    }

    #[inline]
    pub fn push_c_function(&self, f: ffi::lua_CFunction) {
        self.push_c_closure(f, 0);
    }

    // ===== Type queries =====

    #[inline]
    pub fn type_of(&self, idx: i32) -> LuaType {
        self.check_index(idx);
        LuaType::from_raw(unsafe { ffi::lua_type(self.as_ptr(), idx) })
    }

    /// Name of the type stored at `idx`, as the interpreter spells it.
    pub fn type_name(&self, idx: i32) -> &'static str {
        let tp = unsafe { ffi::lua_type(self.as_ptr(), idx) };
        let name = unsafe { ffi::lua_typename(self.as_ptr(), tp) };
        if name.is_null() {
            return LuaType::from_raw(tp).name();
        }
        // Type names are static strings inside the interpreter.
        unsafe { CStr::from_ptr(name) }.to_str().unwrap_or("?")
    }

    #[inline]
    pub fn is_integer(&self, idx: i32) -> bool {
        unsafe { ffi::lua_isinteger(self.as_ptr(), idx) != 0 }
    }

    #[inline]
    pub fn is_nil(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::Nil
    }

    #[inline]
    pub fn is_none(&self, idx: i32) -> bool {
        self.type_of(idx) == LuaType::None
    }

    #[inline]
    pub fn is_none_or_nil(&self, idx: i32) -> bool {
        matches!(self.type_of(idx), LuaType::None | LuaType::Nil)
    }

    // ===== Conversions =====

    /// Truthiness: false only for `nil` and `false`.
    #[inline]
    pub fn to_boolean(&self, idx: i32) -> bool {
        self.check_index(idx);
        unsafe { ffi::lua_toboolean(self.as_ptr(), idx) != 0 }
    }

    /// Integer value at `idx` (numbers with an exact integer representation
    /// and convertible strings included).
    pub fn to_integer(&self, idx: i32) -> Option<i64> {
        self.check_index(idx);
        let mut isnum: c_int = 0;
        let n = unsafe { ffi::lua_tointegerx(self.as_ptr(), idx, &mut isnum) };
        (isnum != 0).then_some(n as i64)
    }

    pub fn to_number(&self, idx: i32) -> Option<f64> {
        self.check_index(idx);
        let mut isnum: c_int = 0;
        let n = unsafe { ffi::lua_tonumberx(self.as_ptr(), idx, &mut isnum) };
        (isnum != 0).then_some(n as f64)
    }

    /// String value at `idx`, lossily decoded.
    ///
    /// A number is converted in place, as the C API does. Never call this on
    /// the key slot of a running `next` traversal unless the key is a string.
    pub fn to_string(&self, idx: i32) -> Option<String> {
        self.check_index(idx);
        let mut len = 0usize;
        let ptr = unsafe { ffi::lua_tolstring(self.as_ptr(), idx, &mut len) };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { lossy_string(ptr, len) })
    }

    /// Raw bytes of the string at `idx`, with the same conversion rule as `to_string`.
    pub fn to_bytes(&self, idx: i32) -> Option<Vec<u8>> {
        self.check_index(idx);
        let mut len = 0usize;
        let ptr = unsafe { ffi::lua_tolstring(self.as_ptr(), idx, &mut len) };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) }.to_vec())
    }

    pub fn to_light_userdata(&self, idx: i32) -> Option<*mut c_void> {
        if self.type_of(idx) != LuaType::LightUserData {
            return None;
        }
        Some(unsafe { ffi::lua_touserdata(self.as_ptr(), idx) })
    }

    /// Block address of a full userdata, or the pointer of a light userdata;
    /// null for everything else.
    pub fn to_userdata_ptr(&self, idx: i32) -> *mut c_void {
        self.check_index(idx);
        unsafe { ffi::lua_touserdata(self.as_ptr(), idx) }
    }

    pub fn to_thread(&self, idx: i32) -> Option<LuaState> {
        self.check_index(idx);
        let raw = unsafe { ffi::lua_tothread(self.as_ptr(), idx) };
        if raw.is_null() {
            return None;
        }
        Some(unsafe { LuaState::from_raw(raw) })
    }

    /// Identity pointer of a reference value; only meaningful for comparison.
    pub fn to_pointer(&self, idx: i32) -> *const c_void {
        self.check_index(idx);
        unsafe { ffi::lua_topointer(self.as_ptr(), idx) }
    }

    /// Length without metamethods: string length, table border, userdata size.
    pub fn raw_len(&self, idx: i32) -> usize {
        self.check_index(idx);
        unsafe { ffi::lua_rawlen(self.as_ptr(), idx) as usize }
    }

    /// Push the result of the `#` operator (may call `__len`).
    pub fn len(&self, idx: i32) {
        self.check_index(idx);
        self.reserve(1);
        unsafe { ffi::lua_len(self.as_ptr(), idx) }
    }

    /// Compare two values, honoring metamethods. Invalid indices compare false.
    pub fn compare(&self, idx1: i32, idx2: i32, op: CompareOp) -> bool {
        unsafe { ffi::lua_compare(self.as_ptr(), idx1, idx2, op.to_raw()) != 0 }
    }

    pub fn raw_equal(&self, idx1: i32, idx2: i32) -> bool {
        unsafe { ffi::lua_rawequal(self.as_ptr(), idx1, idx2) != 0 }
    }

    /// Concatenate the top `n` values, leaving the result on top.
    pub fn concat(&self, n: i32) {
        debug_assert!(n <= self.get_top());
        if n == 0 {
            self.reserve(1);
        }
        unsafe { ffi::lua_concat(self.as_ptr(), n) }
    }

    /// `tostring(v)` semantics: pushes the converted string and returns a copy.
    pub fn to_string_meta(&self, idx: i32) -> String {
        self.check_index(idx);
        self.reserve(1);
        let mut len = 0usize;
        let ptr = unsafe { ffi::luaL_tolstring(self.as_ptr(), idx, &mut len) };
        if ptr.is_null() {
            return String::new();
        }
        unsafe { lossy_string(ptr, len) }
    }
}

// Debug introspection: activation records and upvalues
use std::ffi::{CStr, c_char};

use super::LuaState;
use super::table_ops::c_name;
use crate::ffi;

fn opt_str(p: *const c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
}

/// One function activation, filled by [`LuaState::get_stack`] and
/// [`LuaState::get_info`]. Fields not requested by `get_info` read as empty.
pub struct ActivationRecord {
    raw: ffi::lua_Debug,
}

impl ActivationRecord {
    fn empty() -> Self {
        // Plain integers and pointers; all-zero is the C initial state.
        ActivationRecord {
            raw: unsafe { std::mem::zeroed() },
        }
    }

    /// `n`: name of the function as seen by its caller.
    pub fn name(&self) -> Option<String> {
        opt_str(self.raw.name)
    }

    /// `n`: "global", "local", "method", "field", "upvalue" or "".
    pub fn name_what(&self) -> Option<String> {
        opt_str(self.raw.namewhat)
    }

    /// `S`: "Lua", "C" or "main".
    pub fn what(&self) -> Option<String> {
        opt_str(self.raw.what)
    }

    pub fn source(&self) -> Option<String> {
        if self.raw.source.is_null() {
            return None;
        }
        let bytes = unsafe {
            std::slice::from_raw_parts(self.raw.source.cast::<u8>(), self.raw.srclen)
        };
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn short_src(&self) -> String {
        unsafe { CStr::from_ptr(self.raw.short_src.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    /// `l`: current line, or -1 when unavailable.
    pub fn current_line(&self) -> i32 {
        self.raw.currentline
    }

    pub fn line_defined(&self) -> i32 {
        self.raw.linedefined
    }

    pub fn last_line_defined(&self) -> i32 {
        self.raw.lastlinedefined
    }

    /// `u`: number of upvalues.
    pub fn nups(&self) -> u8 {
        self.raw.nups as u8
    }

    pub fn nparams(&self) -> u8 {
        self.raw.nparams as u8
    }

    pub fn is_vararg(&self) -> bool {
        self.raw.isvararg != 0
    }

    /// `t`: this activation is a tail call.
    pub fn is_tail_call(&self) -> bool {
        self.raw.istailcall != 0
    }
}

impl std::fmt::Debug for ActivationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationRecord")
            .field("name", &self.name())
            .field("what", &self.what())
            .field("short_src", &self.short_src())
            .field("current_line", &self.current_line())
            .finish()
    }
}

impl LuaState {
    /// Activation record of the function running at `level` (0 = current).
    pub fn get_stack(&self, level: i32) -> Option<ActivationRecord> {
        let mut ar = ActivationRecord::empty();
        let found = unsafe { ffi::lua_getstack(self.as_ptr(), level, &mut ar.raw) != 0 };
        found.then_some(ar)
    }

    /// Fill the fields of `ar` selected by `what` (e.g. `"nSl"`).
    ///
    /// With a leading `>` the function is popped from the stack instead of
    /// taken from `ar`; `f` and `L` push extra values.
    pub fn get_info(&self, what: &str, ar: &mut ActivationRecord) -> bool {
        if what.starts_with('>') {
            debug_assert!(self.get_top() > 0, "get_info('>') without a function");
        }
        self.reserve(2);
        let what = c_name(what);
        unsafe { ffi::lua_getinfo(self.as_ptr(), what.as_ptr(), &mut ar.raw) != 0 }
    }

    /// Info about the function on top of the stack, which is popped.
    pub fn function_info(&self, what: &str) -> ActivationRecord {
        let mut ar = ActivationRecord::empty();
        let mut options = String::with_capacity(what.len() + 1);
        options.push('>');
        options.push_str(what);
        self.get_info(&options, &mut ar);
        ar
    }

    /// Push upvalue `n` of the closure at `funcindex`; returns its name.
    /// Nothing is pushed when the index is out of range.
    pub fn get_upvalue(&self, funcindex: i32, n: i32) -> Option<String> {
        self.check_index(funcindex);
        self.reserve(1);
        let name = unsafe { ffi::lua_getupvalue(self.as_ptr(), funcindex, n) };
        opt_str(name)
    }

    /// Pop the top value into upvalue `n` of the closure at `funcindex`.
    /// Nothing is popped when the index is out of range.
    pub fn set_upvalue(&self, funcindex: i32, n: i32) -> Option<String> {
        self.check_index(funcindex);
        let name = unsafe { ffi::lua_setupvalue(self.as_ptr(), funcindex, n) };
        opt_str(name)
    }
}

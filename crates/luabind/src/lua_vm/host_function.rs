// Host functions
// Plain Rust functions exposed to scripts through one shared C trampoline
use std::any::Any;
use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use super::{LuaState, LuaType, upvalue_index};
use crate::ffi;

/// A function callable from scripts.
///
/// Arguments are at stack indices `1..=get_top()`; the function pushes its
/// results and returns how many there are.
pub type HostFunction = fn(LuaState) -> i32;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "host function panicked"
    }
}

fn push_panic(state: LuaState, payload: Box<dyn Any + Send>) {
    let msg = panic_message(payload.as_ref());
    log::warn!("host function panicked: {msg}");
    state.push_string(msg);
}

/// Run host code for a C entry point, turning a panic into a Lua error.
///
/// Unwinding must not cross into the interpreter, and `lua_error` must not
/// jump over live destructors, so the payload is consumed before raising.
pub(crate) unsafe fn guarded<F>(l: *mut ffi::lua_State, f: F) -> c_int
where
    F: FnOnce(LuaState) -> i32,
{
    let state = unsafe { LuaState::from_raw(l) };
    match panic::catch_unwind(AssertUnwindSafe(move || f(state))) {
        Ok(nresults) => nresults,
        Err(payload) => {
            push_panic(state, payload);
            state.error()
        }
    }
}

unsafe extern "C-unwind" fn host_trampoline(l: *mut ffi::lua_State) -> c_int {
    unsafe {
        let p = ffi::lua_touserdata(l, upvalue_index(1));
        debug_assert!(!p.is_null(), "host trampoline without its function upvalue");
        let f = std::mem::transmute::<*mut c_void, HostFunction>(p);
        guarded(l, f)
    }
}

impl LuaState {
    /// Push `f` as a Lua function.
    pub fn push_function(&self, f: HostFunction) {
        self.push_light_userdata(f as *mut c_void);
        self.push_c_closure(host_trampoline, 1);
    }

    /// `t[name] = f` for the table at `idx`.
    pub fn set_function(&self, idx: i32, name: &str, f: HostFunction) {
        let t = self.abs_index(idx);
        self.push_function(f);
        self.set_field(t, name);
    }

    /// Expose `f` as the global `name`.
    pub fn register(&self, name: &str, f: HostFunction) {
        self.push_function(f);
        self.set_global(name);
    }

    /// Push a new table holding `funcs`.
    pub fn new_lib(&self, funcs: &[(&str, HostFunction)]) {
        self.create_table(0, funcs.len());
        for &(name, f) in funcs {
            self.set_function(-1, name, f);
        }
    }

    /// Install `opener` in `package.preload`, so that `require(name)` calls
    /// it and caches what it returns.
    ///
    /// Returns false if the package library is not open.
    pub fn preload(&self, name: &str, opener: HostFunction) -> bool {
        if self.get_global("package") != LuaType::Table {
            self.pop(1);
            return false;
        }
        if self.get_field(-1, "preload") != LuaType::Table {
            self.pop(2);
            return false;
        }
        self.set_function(-1, name, opener);
        self.pop(2);
        true
    }

    // ===== Argument checks (raise on failure) =====

    /// Push `msg` prefixed with the position of the running function.
    pub(crate) fn push_located(&self, msg: &str) {
        self.reserve(2);
        unsafe { ffi::luaL_where(self.as_ptr(), 1) };
        self.push_string(msg);
        self.concat(2);
    }

    pub(crate) fn push_arg_error(&self, arg: i32, extra: &str) {
        let fname = self.get_stack(0).and_then(|mut ar| {
            self.get_info("n", &mut ar);
            ar.name()
        });
        let msg = match fname {
            Some(fname) => format!("bad argument #{arg} to '{fname}' ({extra})"),
            None => format!("bad argument #{arg} ({extra})"),
        };
        self.push_located(&msg);
    }

    /// Raise the standard "bad argument" error for argument `arg`.
    pub fn arg_error(&self, arg: i32, extra: &str) -> ! {
        self.push_arg_error(arg, extra);
        self.error()
    }

    fn push_type_error(&self, arg: i32, expected: LuaType) {
        let msg = format!("{expected} expected, got {}", self.type_name(arg));
        self.push_arg_error(arg, &msg);
    }

    fn type_error(&self, arg: i32, expected: LuaType) -> ! {
        self.push_type_error(arg, expected);
        self.error()
    }

    /// String argument (numbers are converted).
    pub fn check_string(&self, arg: i32) -> String {
        match self.type_of(arg) {
            LuaType::String | LuaType::Number => self.to_string(arg).unwrap_or_default(),
            _ => self.type_error(arg, LuaType::String),
        }
    }

    pub fn check_integer(&self, arg: i32) -> i64 {
        if let Some(n) = self.to_integer(arg) {
            return n;
        }
        if self.type_of(arg) == LuaType::Number {
            self.arg_error(arg, "number has no integer representation")
        }
        self.type_error(arg, LuaType::Number)
    }

    pub fn check_number(&self, arg: i32) -> f64 {
        match self.to_number(arg) {
            Some(n) => n,
            None => self.type_error(arg, LuaType::Number),
        }
    }

    /// Any value, including nil, but the argument must be present.
    pub fn check_any(&self, arg: i32) {
        if self.type_of(arg) == LuaType::None {
            self.arg_error(arg, "value expected")
        }
    }
}

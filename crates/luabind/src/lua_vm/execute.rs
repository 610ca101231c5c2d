// Execution: loading chunks, calls, coroutines and non-local exits
use std::ffi::c_int;
use std::ptr;

use super::host_function::guarded;
use super::table_ops::c_name;
use super::{LuaError, LuaResult, LuaState, LuaType, MULTRET, ThreadStatus};
use crate::ffi;

/// Host-side continuation of a function that yielded (or protected-called
/// something that yielded).
///
/// When the coroutine is resumed, the interpreter cannot return into the
/// suspended host frame. It calls `resume` instead, with the stack as the
/// host function left it plus the resumed values, and the `ctx` that was
/// handed to [`LuaState::yield_k`] or [`LuaState::pcallk`].
///
/// The return value is the number of results, exactly as for a host function.
pub trait Continuation {
    fn resume(state: LuaState, status: ThreadStatus, ctx: isize) -> i32;
}

unsafe extern "C-unwind" fn continuation_trampoline<K: Continuation>(
    l: *mut ffi::lua_State,
    status: c_int,
    ctx: ffi::lua_KContext,
) -> c_int {
    unsafe {
        guarded(l, |state| {
            K::resume(state, ThreadStatus::from_raw(status), ctx as isize)
        })
    }
}

impl LuaState {
    /// Load a chunk without running it; the compiled function is pushed on success,
    /// the error message otherwise.
    pub fn load_buffer(&self, chunk: &[u8], name: &str) -> ThreadStatus {
        self.load_bufferx(chunk, name, None)
    }

    /// Like [`load_buffer`](Self::load_buffer) with a mode: `"t"` text only,
    /// `"b"` binary only, `"bt"` both.
    pub fn load_bufferx(&self, chunk: &[u8], name: &str, mode: Option<&str>) -> ThreadStatus {
        self.reserve(1);
        let name = c_name(name);
        let mode = mode.map(c_name);
        let status = unsafe {
            ffi::luaL_loadbufferx(
                self.as_ptr(),
                chunk.as_ptr().cast(),
                chunk.len(),
                name.as_ptr(),
                mode.as_ref().map_or(ptr::null(), |m| m.as_ptr()),
            )
        };
        ThreadStatus::from_raw(status)
    }

    /// Load and run `code`, leaving all of its results (or the error object) on the stack.
    pub fn do_string(&self, code: &str) -> ThreadStatus {
        let status = self.load_buffer(code.as_bytes(), code);
        if status != ThreadStatus::Ok {
            return status;
        }
        self.pcall(0, MULTRET, 0)
    }

    /// Protected call of the function below the top `nargs` arguments.
    ///
    /// On error the error object (after passing through the handler at
    /// `msgh`, if non-zero) is left on the stack.
    pub fn pcall(&self, nargs: i32, nresults: i32, msgh: i32) -> ThreadStatus {
        debug_assert!(self.get_top() > nargs, "pcall without a function");
        let status = unsafe {
            ffi::lua_pcallk(self.as_ptr(), nargs, nresults, msgh, 0, None)
        };
        ThreadStatus::from_raw(status)
    }

    /// Protected call that may yield.
    ///
    /// If the callee yields, this call never returns: `K::resume` runs after
    /// the coroutine is resumed. Otherwise the status is returned and a host
    /// function normally finishes with `K::resume(state, status, ctx)`.
    pub fn pcallk<K: Continuation>(
        &self,
        nargs: i32,
        nresults: i32,
        msgh: i32,
        ctx: isize,
    ) -> ThreadStatus {
        debug_assert!(self.get_top() > nargs, "pcallk without a function");
        let status = unsafe {
            ffi::lua_pcallk(
                self.as_ptr(),
                nargs,
                nresults,
                msgh,
                ctx as ffi::lua_KContext,
                Some(continuation_trampoline::<K>),
            )
        };
        ThreadStatus::from_raw(status)
    }

    /// Unprotected call; an error propagates to the enclosing protected call.
    pub fn call(&self, nargs: i32, nresults: i32) {
        debug_assert!(self.get_top() > nargs, "call without a function");
        unsafe { ffi::lua_callk(self.as_ptr(), nargs, nresults, 0, None) }
    }

    // ===== Coroutines =====

    /// Start or continue this coroutine with `nargs` values from its stack.
    ///
    /// Returns the status and the number of values yielded or returned, which
    /// are left on top of this thread's stack.
    pub fn resume(&self, from: Option<LuaState>, nargs: i32) -> (ThreadStatus, i32) {
        let mut nres: c_int = 0;
        let from = from.map_or(ptr::null_mut(), |f| f.as_ptr());
        let status = unsafe { ffi::lua_resume(self.as_ptr(), from, nargs, &mut nres) };
        (ThreadStatus::from_raw(status), nres)
    }

    /// `Ok` for a thread that can be resumed or is running, `Yield` for a
    /// suspended one, an error status for a dead one.
    pub fn status(&self) -> ThreadStatus {
        ThreadStatus::from_raw(unsafe { ffi::lua_status(self.as_ptr()) })
    }

    pub fn is_yieldable(&self) -> bool {
        unsafe { ffi::lua_isyieldable(self.as_ptr()) != 0 }
    }

    /// Yield the top `nresults` values from a host function.
    ///
    /// Control goes back to the resumer and never comes back here; on resume
    /// the coroutine returns the resumed values to the caller of the host
    /// function. The calling frame must hold nothing that needs dropping.
    #[allow(unreachable_code)]
    pub fn yield_values(&self, nresults: i32) -> ! {
        unsafe {
            ffi::lua_yieldk(self.as_ptr(), nresults, 0, None);
        }
        unreachable!("lua_yieldk returned outside a hook")
    }

    /// Yield with a continuation: on resume, `K::resume` runs with `ctx`.
    ///
    /// The calling frame must hold nothing that needs dropping.
    #[allow(unreachable_code)]
    pub fn yield_k<K: Continuation>(&self, nresults: i32, ctx: isize) -> ! {
        unsafe {
            ffi::lua_yieldk(
                self.as_ptr(),
                nresults,
                ctx as ffi::lua_KContext,
                Some(continuation_trampoline::<K>),
            );
        }
        unreachable!("lua_yieldk returned outside a hook")
    }

    /// Yield from inside a line/count hook, where the call does return.
    pub fn yield_in_hook(&self, nresults: i32) -> i32 {
        unsafe { ffi::lua_yieldk(self.as_ptr(), nresults, 0, None) }
    }

    // ===== Errors =====

    /// Raise the value on top as an error. Never returns.
    ///
    /// The calling frame must hold nothing that needs dropping.
    #[allow(unreachable_code)]
    pub fn error(&self) -> ! {
        debug_assert!(self.get_top() > 0, "error without an error object");
        unsafe {
            ffi::lua_error(self.as_ptr());
        }
        unreachable!("lua_error returned")
    }

    /// Raise `msg`, prefixed with the current chunk and line, as an error.
    pub fn raise(&self, msg: &str) -> ! {
        self.push_located(msg);
        self.error()
    }

    /// Turn a failing status into a `LuaError`, copying the error object's
    /// message. The stack is left unchanged.
    pub fn check_status(&self, status: ThreadStatus) -> LuaResult<()> {
        if !status.is_error() {
            return Ok(());
        }
        let message = match self.type_of(-1) {
            LuaType::String => self.to_string(-1).unwrap_or_default(),
            LuaType::None => String::new(),
            other => format!("(error object is a {other} value)"),
        };
        match LuaError::from_status(status, message) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Push a traceback of `of`, optionally headed by `msg`, starting at `level`.
    pub fn traceback(&self, of: LuaState, msg: Option<&str>, level: i32) {
        self.reserve(1);
        let msg = msg.map(c_name);
        unsafe {
            ffi::luaL_traceback(
                self.as_ptr(),
                of.as_ptr(),
                msg.as_ref().map_or(ptr::null(), |m| m.as_ptr()),
                level,
            )
        }
    }
}

// Garbage collector control
// Each call is a request to the interpreter's collector
use std::ffi::c_int;

use super::LuaState;
use crate::ffi;

impl LuaState {
    pub fn gc_stop(&self) {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCSTOP) };
    }

    pub fn gc_restart(&self) {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCRESTART) };
    }

    /// Full collection cycle; finalizers of unreachable userdata run here.
    pub fn gc_collect(&self) {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCCOLLECT) };
    }

    /// Incremental step of `kbytes` KiB of work (0 for one basic step).
    /// True if the step finished a cycle.
    pub fn gc_step(&self, kbytes: i32) -> bool {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCSTEP, kbytes as c_int) != 0 }
    }

    /// Memory in use, in KiB.
    pub fn gc_count(&self) -> i32 {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCCOUNT) }
    }

    /// Remainder of memory in use in bytes, below [`gc_count`](Self::gc_count).
    pub fn gc_count_b(&self) -> i32 {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCCOUNTB) }
    }

    /// Total memory in use, in bytes.
    pub fn gc_bytes(&self) -> usize {
        self.gc_count().max(0) as usize * 1024 + self.gc_count_b().max(0) as usize
    }

    /// Set the collector pause (percent); returns the previous value.
    ///
    /// The interpreter stores the pause in steps of 4, so the value read
    /// back is rounded down to a multiple of 4.
    pub fn gc_set_pause(&self, pause: i32) -> i32 {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCSETPAUSE, pause as c_int) }
    }

    /// Set the step multiplier (percent); returns the previous value.
    pub fn gc_set_step_multiplier(&self, mul: i32) -> i32 {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCSETSTEPMUL, mul as c_int) }
    }

    pub fn gc_is_running(&self) -> bool {
        unsafe { ffi::lua_gc(self.as_ptr(), ffi::LUA_GCISRUNNING) != 0 }
    }
}

// Lua Virtual Machine handle
// Every operation of the binding goes through a `LuaState` capability
mod debug_info;
mod execute;
mod gc;
mod host_function;
mod lua_error;
mod lua_ref;
mod lua_type;
mod stack;
mod table_ops;

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::ffi;

pub use debug_info::ActivationRecord;
pub use execute::Continuation;
pub use host_function::HostFunction;
pub(crate) use host_function::guarded;
pub use lua_error::{LuaError, LuaResult};
pub use lua_ref::{NO_REF, REF_NIL, RefId};
pub use lua_type::{CompareOp, LuaType, ThreadStatus};

/// Option for multiple returns in `pcall`, `call` and `resume`.
pub const MULTRET: i32 = ffi::LUA_MULTRET;

/// Pseudo-index of the registry table.
pub const REGISTRY_INDEX: i32 = ffi::LUA_REGISTRYINDEX;

/// Number of stack slots a host function may use without calling `check_stack`.
pub const MIN_STACK: i32 = ffi::LUA_MINSTACK;

/// Registry slot holding the main thread.
pub const RIDX_MAINTHREAD: i64 = 1;

/// Registry slot holding the global table.
pub const RIDX_GLOBALS: i64 = 2;

/// Size of the raw memory area the interpreter reserves in front of every thread.
pub const EXTRA_SPACE: usize = std::mem::size_of::<*mut c_void>();

/// Registry field holding the liveness flag of a VM opened by [`LuaVM`].
const ALIVE_KEY: &str = "luabind.alive";

/// Pseudo-index of the `i`-th upvalue of the running C function.
#[inline]
pub const fn upvalue_index(i: i32) -> i32 {
    REGISTRY_INDEX - i
}

/// Capability handle for one interpreter thread (the main state or a coroutine).
///
/// The handle is `Copy`: it owns no values, it only names the stack that an
/// operation addresses. A coroutine is itself a `LuaState`, sharing the global
/// section with its parent but owning a separate value stack.
///
/// `!Send + !Sync`: the interpreter is single-threaded and this layer
/// provides no synchronization.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LuaState {
    raw: NonNull<ffi::lua_State>,
}

impl LuaState {
    /// Wrap a raw interpreter pointer, e.g. the one handed to a C function.
    ///
    /// # Safety
    /// `raw` must be a live `lua_State` that outlives every use of the handle.
    #[inline(always)]
    pub unsafe fn from_raw(raw: *mut ffi::lua_State) -> Self {
        debug_assert!(!raw.is_null(), "null lua_State");
        LuaState {
            raw: unsafe { NonNull::new_unchecked(raw) },
        }
    }

    /// The raw interpreter pointer, for calling into `ffi` directly.
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut ffi::lua_State {
        self.raw.as_ptr()
    }

    /// Opens every standard library into the global table.
    pub fn open_libs(&self) {
        unsafe { ffi::luaL_openlibs(self.as_ptr()) }
    }

    /// Creates a new coroutine, pushes it on this stack and returns its handle.
    ///
    /// The thread is kept alive only by the pushed value (or a registry ref to it).
    pub fn new_thread(&self) -> LuaState {
        self.reserve(1);
        unsafe { LuaState::from_raw(ffi::lua_newthread(self.as_ptr())) }
    }

    /// Handle of the main thread of the VM this state belongs to.
    pub fn main_thread(&self) -> LuaState {
        self.raw_get_i(REGISTRY_INDEX, RIDX_MAINTHREAD);
        let main = self.to_thread(-1);
        self.pop(1);
        main.unwrap_or(*self)
    }

    /// Raw memory area associated with this thread; the interpreter never touches it.
    ///
    /// New threads start with a copy of the main thread's area.
    pub fn extra_space(&self) -> *mut c_void {
        unsafe { self.as_ptr().cast::<u8>().sub(EXTRA_SPACE).cast::<c_void>() }
    }

    /// Flag that turns false once the owning [`LuaVM`] is closed; `None`
    /// for states this crate did not open.
    pub(crate) fn liveness(&self) -> Option<Rc<Cell<bool>>> {
        self.get_field(REGISTRY_INDEX, ALIVE_KEY);
        let p = self.to_light_userdata(-1);
        self.pop(1);
        let p = p?.cast::<Cell<bool>>().cast_const();
        // the registry holds one strong count until the VM is dropped
        unsafe {
            Rc::increment_strong_count(p);
            Some(Rc::from_raw(p))
        }
    }
}

impl std::fmt::Debug for LuaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LuaState({:p})", self.raw)
    }
}

/// Owner of one interpreter instance.
///
/// Closing happens exactly once: either through [`close`](Self::close), which
/// consumes the VM, or on drop. Closing runs every pending finalizer,
/// including the `__gc` hooks of host-bound userdata.
///
/// Registry wrappers (`LuaRef`, `LuaValue`, …) hold a `LuaState` copy and
/// must not be used after the VM that created them is closed. Dropping them
/// afterwards is fine: the release is skipped.
pub struct LuaVM {
    state: LuaState,
    alive: Rc<Cell<bool>>,
}

impl LuaVM {
    /// Create a fresh interpreter with an empty global table.
    pub fn new() -> LuaResult<Self> {
        let raw = unsafe { ffi::luaL_newstate() };
        if raw.is_null() {
            return Err(LuaError::Memory);
        }
        log::debug!("opened lua state {:p}", raw);
        let state = unsafe { LuaState::from_raw(raw) };
        let alive = Rc::new(Cell::new(true));
        state.push_light_userdata(Rc::into_raw(alive.clone()).cast_mut().cast::<c_void>());
        state.set_field(REGISTRY_INDEX, ALIVE_KEY);
        Ok(LuaVM { state, alive })
    }

    /// Create an interpreter and open the standard libraries.
    pub fn with_stdlib() -> LuaResult<Self> {
        let vm = Self::new()?;
        vm.open_libs();
        Ok(vm)
    }

    /// The main-thread capability handle.
    #[inline(always)]
    pub fn state(&self) -> LuaState {
        self.state
    }

    /// Close the interpreter, running all pending finalizers.
    pub fn close(self) {
        // Drop does the work; consuming `self` makes a second close impossible.
        drop(self);
    }
}

impl std::ops::Deref for LuaVM {
    type Target = LuaState;

    #[inline(always)]
    fn deref(&self) -> &LuaState {
        &self.state
    }
}

impl Drop for LuaVM {
    fn drop(&mut self) {
        log::debug!("closing lua state {:p}", self.state.as_ptr());
        self.alive.set(false);
        unsafe { ffi::lua_close(self.state.as_ptr()) }
        // release the registry's share of the flag
        unsafe { drop(Rc::from_raw(Rc::as_ptr(&self.alive))) };
    }
}

impl std::fmt::Debug for LuaVM {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LuaVM({:?})", self.state)
    }
}

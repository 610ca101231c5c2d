// Shared userdata metatable and its C trampolines
use std::ffi::c_int;
use std::ptr::NonNull;

use super::block::{BlockHeader, UserDataBlock};
use super::{MetaMethod, UserData};
use crate::ffi;
use crate::lua_vm::{LuaState, guarded};

/// Registry name of the metatable carried by every bound userdata.
pub const USERDATA_METATABLE: &str = "luabind.UserData";

/// First live bound block among the operands (argument 1, then 2).
fn find_block(state: LuaState) -> Option<*mut u8> {
    let top = state.get_top().min(2);
    (1..=top)
        .filter_map(|i| state.test_userdata(i, USERDATA_METATABLE))
        .map(|p| p.as_ptr().cast::<u8>())
        .find(|&p| unsafe { BlockHeader::from_ptr(p) }.alive.get())
}

/// Result for a block that was already finalized (or an operand that is
/// not one of ours).
fn no_block(state: LuaState, method: MetaMethod) -> i32 {
    if method != MetaMethod::ToString {
        return 0;
    }
    let text = if state.get_top() >= 1 {
        format!("{}: {:p}", state.type_name(1), state.to_pointer(1))
    } else {
        String::from("userdata")
    };
    state.push_string(&text);
    1
}

unsafe fn invoke(l: *mut ffi::lua_State, method: MetaMethod) -> c_int {
    unsafe {
        guarded(l, |state| match find_block(state) {
            Some(p) => (BlockHeader::from_ptr(p).tag.dispatch)(p, method, state),
            None => no_block(state, method),
        })
    }
}

unsafe extern "C-unwind" fn gc_trampoline(l: *mut ffi::lua_State) -> c_int {
    unsafe {
        guarded(l, |state| {
            if let Some(p) = state.test_userdata(1, USERDATA_METATABLE) {
                let p = p.as_ptr().cast::<u8>();
                (BlockHeader::from_ptr(p).tag.finalize)(p, state);
            }
            0
        })
    }
}

macro_rules! meta_trampolines {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            unsafe extern "C-unwind" fn $name(l: *mut ffi::lua_State) -> c_int {
                unsafe { invoke(l, MetaMethod::$method) }
            }
        )*

        fn trampoline_for(method: MetaMethod) -> ffi::lua_CFunction {
            match method {
                $(MetaMethod::$method => $name,)*
                MetaMethod::Gc => gc_trampoline,
            }
        }
    };
}

meta_trampolines! {
    add_trampoline => Add,
    sub_trampoline => Sub,
    mul_trampoline => Mul,
    div_trampoline => Div,
    mod_trampoline => Mod,
    pow_trampoline => Pow,
    unm_trampoline => Unm,
    idiv_trampoline => IDiv,
    band_trampoline => BAnd,
    bor_trampoline => BOr,
    bxor_trampoline => BXor,
    bnot_trampoline => BNot,
    shl_trampoline => Shl,
    shr_trampoline => Shr,
    concat_trampoline => Concat,
    len_trampoline => Len,
    eq_trampoline => Eq,
    lt_trampoline => Lt,
    le_trampoline => Le,
    index_trampoline => Index,
    newindex_trampoline => NewIndex,
    call_trampoline => Call,
    tostring_trampoline => ToString,
    close_trampoline => Close,
}

/// Push the shared metatable, filling it on first use.
fn push_shared_metatable(state: LuaState) {
    if state.new_metatable(USERDATA_METATABLE) {
        for method in MetaMethod::ALL {
            state.push_c_function(trampoline_for(method));
            state.set_field(-2, method.name());
        }
        log::debug!("created shared userdata metatable {USERDATA_METATABLE}");
    }
}

impl LuaState {
    /// Move `value` into a new full userdata and push it.
    ///
    /// The returned pointer stays valid while the userdata is reachable from
    /// the VM; after collection it dangles.
    ///
    /// The interpreter only aligns userdata blocks to 8 bytes, so a `T`
    /// with a larger alignment (e.g. one holding a `u128`) is rejected at
    /// compile time.
    pub fn push_userdata<T: UserData>(&self, value: T) -> NonNull<T> {
        self.push_userdata_uv(value, 0)
    }

    /// Like [`push_userdata`](Self::push_userdata), with `nuv` user value
    /// slots (see [`get_user_value`](Self::get_user_value)).
    pub fn push_userdata_uv<T: UserData>(&self, value: T, nuv: i32) -> NonNull<T> {
        const { assert!(std::mem::align_of::<UserDataBlock<T>>() <= 8) };
        let size = std::mem::size_of::<UserDataBlock<T>>();
        self.reserve(2);
        let p = unsafe { ffi::lua_newuserdatauv(self.as_ptr(), size, nuv) }.cast::<u8>();
        // the block must be complete before __gc can ever see it
        unsafe { p.cast::<UserDataBlock<T>>().write(UserDataBlock::new(value)) };
        push_shared_metatable(*self);
        self.set_metatable(-2);
        let value = unsafe { UserDataBlock::<T>::value_ptr(p) };
        // non-null: lua_newuserdatauv raises on allocation failure
        unsafe { NonNull::new_unchecked(value) }
    }

    /// The host value inside the userdata at `idx`, if it is a live `T`
    /// pushed by [`push_userdata`](Self::push_userdata).
    pub fn to_userdata<T: UserData>(&self, idx: i32) -> Option<NonNull<T>> {
        let p = self.test_userdata(idx, USERDATA_METATABLE)?.as_ptr().cast::<u8>();
        if !unsafe { BlockHeader::from_ptr(p) }.holds::<T>() {
            return None;
        }
        NonNull::new(unsafe { UserDataBlock::<T>::value_ptr(p) })
    }
}

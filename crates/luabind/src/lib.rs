// Lua Bindings
// Ownership-checked access to the C Lua 5.4 interpreter: stack machine,
// registry references, table copy-out and host-bound userdata

// Lets `#[derive(LuaUserData)]` expand to `luabind::...` paths inside this crate too.
extern crate self as luabind;

#[cfg(test)]
mod test;

pub mod lua_value;
pub mod lua_vm;
pub mod userdata;

/// Raw C API of the interpreter.
pub use mlua_sys as ffi;

pub use lua_value::{
    Key, LuaFunctionRef, LuaNumber, LuaRef, LuaStringRef, LuaTableRef, LuaThreadRef,
    LuaUserDataRef, LuaValue, Table, TableKey, UnsafeLuaRef, UnsafeLuaValue, Value,
};
pub use lua_vm::{
    ActivationRecord, CompareOp, Continuation, HostFunction, LuaError, LuaResult, LuaState,
    LuaType, LuaVM, NO_REF, REF_NIL, RefId, ThreadStatus,
};
pub use userdata::{MetaMethod, USERDATA_METATABLE, UserData};

#[cfg(feature = "derive")]
pub use luabind_derive::LuaUserData;

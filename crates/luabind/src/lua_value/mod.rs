// Values crossing the host/VM boundary
// Host-native copies (`Value`, `Table`) and registry-backed handles
// (`UnsafeLuaValue` with manual release, `LuaValue` with release on drop)
mod lua_number;
mod lua_table;
mod lua_value;
mod table_bridge;
mod unsafe_value;
mod value;

pub use lua_number::LuaNumber;
pub use lua_table::{FloatKey, Key, Table, TableKey};
pub use lua_value::{
    LuaFunctionRef, LuaRef, LuaStringRef, LuaTableRef, LuaThreadRef, LuaUserDataRef, LuaValue,
};
pub use unsafe_value::{UnsafeLuaRef, UnsafeLuaValue};
pub use value::Value;

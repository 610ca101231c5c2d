use std::ffi::c_int;

use crate::ffi;

/// Dynamic type of a stack slot.
///
/// `None` is an invalid (non-existent) index, `Nil` is a nil value actually
/// stored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaType {
    None,
    Nil,
    Boolean,
    LightUserData,
    Number,
    String,
    Table,
    Function,
    UserData,
    Thread,
}

impl LuaType {
    pub(crate) fn from_raw(t: c_int) -> Self {
        match t {
            ffi::LUA_TNIL => LuaType::Nil,
            ffi::LUA_TBOOLEAN => LuaType::Boolean,
            ffi::LUA_TLIGHTUSERDATA => LuaType::LightUserData,
            ffi::LUA_TNUMBER => LuaType::Number,
            ffi::LUA_TSTRING => LuaType::String,
            ffi::LUA_TTABLE => LuaType::Table,
            ffi::LUA_TFUNCTION => LuaType::Function,
            ffi::LUA_TUSERDATA => LuaType::UserData,
            ffi::LUA_TTHREAD => LuaType::Thread,
            _ => LuaType::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LuaType::None => "no value",
            LuaType::Nil => "nil",
            LuaType::Boolean => "boolean",
            LuaType::LightUserData | LuaType::UserData => "userdata",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Table => "table",
            LuaType::Function => "function",
            LuaType::Thread => "thread",
        }
    }

    /// Types whose values live in the registry when detached from the stack.
    #[inline]
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            LuaType::String
                | LuaType::Table
                | LuaType::Function
                | LuaType::UserData
                | LuaType::Thread
        )
    }
}

impl std::fmt::Display for LuaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Status returned by load, protected call and resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadStatus {
    Ok,
    Yield,
    ErrRun,
    ErrSyntax,
    ErrMem,
    ErrErr,
    ErrFile,
}

impl ThreadStatus {
    pub(crate) fn from_raw(status: c_int) -> Self {
        match status {
            ffi::LUA_OK => ThreadStatus::Ok,
            ffi::LUA_YIELD => ThreadStatus::Yield,
            ffi::LUA_ERRRUN => ThreadStatus::ErrRun,
            ffi::LUA_ERRSYNTAX => ThreadStatus::ErrSyntax,
            ffi::LUA_ERRMEM => ThreadStatus::ErrMem,
            ffi::LUA_ERRERR => ThreadStatus::ErrErr,
            _ => ThreadStatus::ErrFile,
        }
    }

    pub(crate) fn to_raw(self) -> c_int {
        match self {
            ThreadStatus::Ok => ffi::LUA_OK,
            ThreadStatus::Yield => ffi::LUA_YIELD,
            ThreadStatus::ErrRun => ffi::LUA_ERRRUN,
            ThreadStatus::ErrSyntax => ffi::LUA_ERRSYNTAX,
            ThreadStatus::ErrMem => ffi::LUA_ERRMEM,
            ThreadStatus::ErrErr => ffi::LUA_ERRERR,
            ThreadStatus::ErrFile => ffi::LUA_ERRFILE,
        }
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == ThreadStatus::Ok
    }

    /// Any status other than `Ok` and `Yield`.
    #[inline]
    pub fn is_error(self) -> bool {
        !matches!(self, ThreadStatus::Ok | ThreadStatus::Yield)
    }
}

/// Comparison performed by [`LuaState::compare`](super::LuaState::compare).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
}

impl CompareOp {
    pub(crate) fn to_raw(self) -> c_int {
        match self {
            CompareOp::Eq => ffi::LUA_OPEQ,
            CompareOp::Lt => ffi::LUA_OPLT,
            CompareOp::Le => ffi::LUA_OPLE,
        }
    }
}

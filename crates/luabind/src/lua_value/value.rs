use std::ffi::c_void;
use std::fmt;

use super::{LuaNumber, Table};

/// Host-native copy of a Lua value. Holds no reference into any VM.
///
/// Functions, full userdata and threads have no host-native form; they stay
/// in the VM behind registry handles ([`LuaValue`](super::LuaValue)).
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(LuaNumber),
    String(String),
    Table(Table),
    LightUserData(*mut c_void),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::LightUserData(_) => "userdata",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<LuaNumber> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.as_number().and_then(LuaNumber::as_i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Shallow equality: two tables are never equal, even to themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::LightUserData(a), Value::LightUserData(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(LuaNumber::Int(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(LuaNumber::Int(i as i64))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(LuaNumber::Float(f))
    }
}

impl From<LuaNumber> for Value {
    fn from(n: LuaNumber) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Table(t) => write!(f, "table({} array, {} map)", t.narr(), t.nrec()),
            Value::LightUserData(p) => write!(f, "userdata: {p:p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_never_equal() {
        let t = Value::Table(Table::new());
        assert_ne!(t, t.clone());
        assert_ne!(Value::Table(Table::new()), Value::Nil);
    }

    #[test]
    fn test_primitive_equality() {
        assert_eq!(Value::from(3), Value::Number(LuaNumber::Int(3)));
        assert_ne!(Value::from(3), Value::from(3.0));
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_eq!(Value::Nil, Value::default());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(12).to_string(), "12");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "nil");
    }
}

use std::fmt;

/// A Lua number: the interpreter keeps integers and floats as distinct subtypes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LuaNumber {
    Int(i64),
    Float(f64),
}

impl LuaNumber {
    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, LuaNumber::Int(_))
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            LuaNumber::Int(i) => i as f64,
            LuaNumber::Float(f) => f,
        }
    }

    /// Integer value, if the number has an exact integer representation.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            LuaNumber::Int(i) => Some(i),
            LuaNumber::Float(f) => {
                if f.fract() == 0.0 && f >= -(2f64.powi(63)) && f < 2f64.powi(63) {
                    Some(f as i64)
                } else {
                    None
                }
            }
        }
    }
}

impl From<i64> for LuaNumber {
    fn from(i: i64) -> Self {
        LuaNumber::Int(i)
    }
}

impl From<i32> for LuaNumber {
    fn from(i: i32) -> Self {
        LuaNumber::Int(i as i64)
    }
}

impl From<f64> for LuaNumber {
    fn from(f: f64) -> Self {
        LuaNumber::Float(f)
    }
}

impl fmt::Display for LuaNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LuaNumber::Int(i) => f.write_str(itoa::Buffer::new().format(i)),
            LuaNumber::Float(n) if n.is_nan() => {
                f.write_str(if n.is_sign_negative() { "-nan" } else { "nan" })
            }
            LuaNumber::Float(n) if n.is_infinite() => {
                f.write_str(if n < 0.0 { "-inf" } else { "inf" })
            }
            // Integral floats keep a ".0" so they read back as floats
            LuaNumber::Float(n) if n.fract() == 0.0 && n.abs() < 1e16 => write!(f, "{n:.1}"),
            LuaNumber::Float(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LuaNumber;

    #[test]
    fn test_display() {
        assert_eq!(LuaNumber::Int(-42).to_string(), "-42");
        assert_eq!(LuaNumber::Float(1.0).to_string(), "1.0");
        assert_eq!(LuaNumber::Float(0.5).to_string(), "0.5");
        assert_eq!(LuaNumber::Float(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(LuaNumber::Float(3.0).as_i64(), Some(3));
        assert_eq!(LuaNumber::Float(3.5).as_i64(), None);
        assert_eq!(LuaNumber::Int(7).as_i64(), Some(7));
        assert!(!LuaNumber::Float(2.0).is_integer());
    }
}

// Host-native table: hole-free array part plus a hashed map part
use std::hash::{Hash, Hasher};

use ahash::AHashMap;
use smol_str::SmolStr;

use super::{LuaNumber, Value};

/// Float map key, hashed by value. `-0.0` and `0.0` are the same key; NaN is
/// not a valid key.
#[derive(Debug, Clone, Copy)]
pub struct FloatKey(f64);

impl FloatKey {
    pub fn new(f: f64) -> Option<Self> {
        if f.is_nan() {
            return None;
        }
        Some(FloatKey(if f == 0.0 { 0.0 } else { f }))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatKey {}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Key as stored in the map part.
///
/// `Integer` only holds positive integers detached from the array part (the
/// array is shorter than `k - 1`); every other number is a `Number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Bool(bool),
    String(SmolStr),
    Integer(i64),
    Number(FloatKey),
}

impl TableKey {
    /// The key as a host value.
    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Bool(b) => Value::Bool(*b),
            TableKey::String(s) => Value::String(s.to_string()),
            TableKey::Integer(i) => Value::Number(LuaNumber::Int(*i)),
            TableKey::Number(f) => Value::Number(LuaNumber::Float(f.get())),
        }
    }
}

/// Key as given by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Bool(bool),
    String(SmolStr),
    Integer(i64),
    Float(f64),
}

impl Key {
    /// Convert a host value into a key; nil, NaN and tables are not keys.
    pub fn from_value(v: &Value) -> Option<Key> {
        match v {
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::String(s) => Some(Key::String(SmolStr::new(s))),
            Value::Number(LuaNumber::Int(i)) => Some(Key::Integer(*i)),
            Value::Number(LuaNumber::Float(f)) if !f.is_nan() => Some(Key::Float(*f)),
            _ => None,
        }
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(SmolStr::new(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(SmolStr::from(s))
    }
}

impl From<SmolStr> for Key {
    fn from(s: SmolStr) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Integer(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Integer(i as i64)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Integer(i as i64)
    }
}

impl From<f64> for Key {
    fn from(f: f64) -> Self {
        Key::Float(f)
    }
}

/// Where a key lives.
enum Slot {
    /// 0-based position inside the array part.
    Array(usize),
    /// One past the end of the array part.
    Append,
    Map(TableKey),
}

/// Host copy of a Lua table.
///
/// The array part holds keys `1..=narr()` with no holes and no nils. Every
/// positive integer key up to `narr() + 1` resolves through the array; a
/// larger one waits in the map until the keys below it are filled, then
/// moves into the array.
#[derive(Debug, Clone, Default)]
pub struct Table {
    array: Vec<Value>,
    map: AHashMap<TableKey, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(narr: usize, nrec: usize) -> Self {
        Table {
            array: Vec::with_capacity(narr),
            map: AHashMap::with_capacity(nrec),
        }
    }

    fn slot(&self, key: Key) -> Option<Slot> {
        Some(match key {
            Key::Integer(k) if k >= 1 => {
                let len = self.array.len() as i64;
                if k <= len {
                    Slot::Array((k - 1) as usize)
                } else if k == len + 1 {
                    Slot::Append
                } else {
                    Slot::Map(TableKey::Integer(k))
                }
            }
            Key::Integer(k) => Slot::Map(TableKey::Number(FloatKey::new(k as f64)?)),
            Key::Float(f) => Slot::Map(TableKey::Number(FloatKey::new(f)?)),
            Key::Bool(b) => Slot::Map(TableKey::Bool(b)),
            Key::String(s) => Slot::Map(TableKey::String(s)),
        })
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        match self.slot(key.into())? {
            Slot::Array(i) => self.array.get(i),
            Slot::Append => None,
            Slot::Map(k) => self.map.get(&k),
        }
    }

    /// `t[key] = value`. Assigning nil removes the entry; NaN keys are ignored.
    pub fn set(&mut self, key: impl Into<Key>, value: Value) {
        let Some(slot) = self.slot(key.into()) else {
            return;
        };
        match (slot, value) {
            (Slot::Array(i), Value::Nil) => self.truncate(i),
            (Slot::Array(i), value) => self.array[i] = value,
            (Slot::Append, Value::Nil) => {}
            (Slot::Append, value) => {
                self.array.push(value);
                self.absorb();
            }
            (Slot::Map(k), Value::Nil) => {
                self.map.remove(&k);
            }
            (Slot::Map(k), value) => {
                self.map.insert(k, value);
            }
        }
    }

    /// Append at `narr() + 1`. Pushing nil does nothing.
    pub fn push(&mut self, value: Value) {
        let next = self.array.len() + 1;
        self.set(next, value);
    }

    /// Cut the array at 0-based `i` (dropping that element) and move the
    /// tail into the map so no hole is left in the array.
    fn truncate(&mut self, i: usize) {
        let tail = self.array.split_off(i);
        for (offset, v) in tail.into_iter().enumerate().skip(1) {
            let k = (i + offset + 1) as i64;
            self.map.insert(TableKey::Integer(k), v);
        }
    }

    /// Pull detached integer keys that became contiguous into the array.
    fn absorb(&mut self) {
        if self.map.is_empty() {
            return;
        }
        loop {
            let next = TableKey::Integer(self.array.len() as i64 + 1);
            match self.map.remove(&next) {
                Some(v) => self.array.push(v),
                None => break,
            }
        }
    }

    /// The array part, keys `1..=narr()` in order.
    #[inline]
    pub fn array(&self) -> &[Value] {
        &self.array
    }

    /// Map entries, in no particular order.
    pub fn iter_map(&self) -> impl Iterator<Item = (&TableKey, &Value)> {
        self.map.iter()
    }

    #[inline]
    pub fn narr(&self) -> usize {
        self.array.len()
    }

    #[inline]
    pub fn nrec(&self) -> usize {
        self.map.len()
    }

    /// Border of the array part, as `#t` would report it.
    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.map.is_empty()
    }
}

impl FromIterator<Value> for Table {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut t = Table::new();
        for v in iter {
            t.push(v);
        }
        t
    }
}

impl<K: Into<Key>> FromIterator<(K, Value)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut t = Table::new();
        for (k, v) in iter {
            t.set(k, v);
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_keys_fill_array() {
        let mut t = Table::new();
        for i in 1..=4i64 {
            t.set(i, Value::from(i * 10));
        }
        assert_eq!(t.narr(), 4);
        assert_eq!(t.nrec(), 0);
        assert_eq!(t.get(3), Some(&Value::from(30)));
    }

    #[test]
    fn test_sparse_key_waits_in_map() {
        let mut t = Table::new();
        t.set(5, Value::from("five"));
        assert_eq!(t.narr(), 0);
        assert!(t.iter_map().any(|(k, _)| *k == TableKey::Integer(5)));

        for i in 1..=3i64 {
            t.set(i, Value::from(i));
            assert_eq!(t.nrec(), 1);
        }
        t.set(4, Value::from(4));
        assert_eq!(t.narr(), 5);
        assert_eq!(t.nrec(), 0);
        assert_eq!(t.array()[4], Value::from("five"));
    }

    #[test]
    fn test_zero_keys_collapse() {
        let mut t = Table::new();
        t.set(0, Value::from("int"));
        t.set(0.0, Value::from("float"));
        t.set(-0.0, Value::from("negzero"));
        assert_eq!(t.nrec(), 1);
        assert_eq!(t.get(0), Some(&Value::from("negzero")));
    }

    #[test]
    fn test_one_and_one_float_stay_apart() {
        let mut t = Table::new();
        t.set(1, Value::from("array"));
        t.set(1.0, Value::from("map"));
        assert_eq!(t.narr(), 1);
        assert_eq!(t.nrec(), 1);
        assert_eq!(t.get(1), Some(&Value::from("array")));
        assert_eq!(t.get(1.0), Some(&Value::from("map")));
    }

    #[test]
    fn test_nil_inside_array_moves_tail_to_map() {
        let mut t: Table = (1..=5i64).map(Value::from).collect();
        t.set(2, Value::Nil);
        assert_eq!(t.narr(), 1);
        assert_eq!(t.nrec(), 3);
        assert_eq!(t.get(2), None);
        assert_eq!(t.get(5), Some(&Value::from(5)));

        t.set(2, Value::from(20));
        assert_eq!(t.narr(), 5);
        assert_eq!(t.nrec(), 0);
    }

    #[test]
    fn test_map_keys_and_removal() {
        let mut t: Table = vec![
            (Key::from("name"), Value::from("lua")),
            (Key::from(true), Value::from(1)),
            (Key::from(-3), Value::from(2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(t.nrec(), 3);
        assert_eq!(t.get(-3.0), Some(&Value::from(2)));
        t.set("name", Value::Nil);
        assert_eq!(t.get("name"), None);
        assert_eq!(t.nrec(), 2);
    }

    #[test]
    fn test_nan_key_ignored() {
        let mut t = Table::new();
        t.set(f64::NAN, Value::from(1));
        assert!(t.is_empty());
        assert_eq!(t.get(f64::NAN), None);
    }
}

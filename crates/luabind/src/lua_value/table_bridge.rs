// Table Bridge
// Copy VM tables out into host `Table`s, and push host values back in
use std::ffi::c_void;

use ahash::AHashSet;

use super::{Key, LuaNumber, Table, TableKey, Value};
use crate::lua_vm::{LuaState, LuaType};

/// Tables on the current copy path, by identity.
type CopyPath = AHashSet<*const c_void>;

impl LuaState {
    /// Recursive host copy of the value at `idx`; the stack is unchanged.
    ///
    /// Functions, full userdata, threads and invalid indices have no host
    /// form and copy to `None`.
    pub fn to_host(&self, idx: i32) -> Option<Value> {
        let mut path = CopyPath::default();
        self.copy_value(idx, &mut path)
    }

    /// Host copy of the table at `idx`; the stack is unchanged.
    ///
    /// Entries whose key or value has no host form are skipped. A table that
    /// (directly or not) contains itself is copied once; the back-reference
    /// is skipped.
    pub fn copy_table(&self, idx: i32) -> Table {
        assert_eq!(
            self.type_of(idx),
            LuaType::Table,
            "copy_table on a {} value",
            self.type_name(idx)
        );
        let mut path = CopyPath::default();
        self.copy_table_at(self.abs_index(idx), &mut path)
    }

    fn copy_value(&self, idx: i32, path: &mut CopyPath) -> Option<Value> {
        Some(match self.type_of(idx) {
            LuaType::Nil => Value::Nil,
            LuaType::Boolean => Value::Bool(self.to_boolean(idx)),
            LuaType::Number => Value::Number(self.copy_number(idx)),
            LuaType::String => Value::String(self.to_string(idx)?),
            LuaType::LightUserData => Value::LightUserData(self.to_userdata_ptr(idx)),
            LuaType::Table => {
                if path.contains(&self.to_pointer(idx)) {
                    log::debug!("cycle at table {:p}, skipping back-reference", self.to_pointer(idx));
                    return None;
                }
                Value::Table(self.copy_table_at(self.abs_index(idx), path))
            }
            LuaType::None | LuaType::Function | LuaType::UserData | LuaType::Thread => {
                return None;
            }
        })
    }

    fn copy_number(&self, idx: i32) -> LuaNumber {
        if self.is_integer(idx) {
            LuaNumber::Int(self.to_integer(idx).unwrap_or_default())
        } else {
            LuaNumber::Float(self.to_number(idx).unwrap_or_default())
        }
    }

    /// Read a traversal key. Only real strings are read as strings: a
    /// numeric key must never be converted in place while `next` needs it.
    fn copy_key(&self, idx: i32) -> Option<Key> {
        match self.type_of(idx) {
            LuaType::Boolean => Some(Key::Bool(self.to_boolean(idx))),
            LuaType::String => self.to_string(idx).map(Key::from),
            LuaType::Number => match self.copy_number(idx) {
                LuaNumber::Int(i) => Some(Key::Integer(i)),
                LuaNumber::Float(f) => Some(Key::Float(f)),
            },
            other => {
                log::warn!("skipping {other} key during table copy");
                None
            }
        }
    }

    /// `t` must be an absolute index.
    fn copy_table_at(&self, t: i32, path: &mut CopyPath) -> Table {
        let id = self.to_pointer(t);
        path.insert(id);

        let mut table = Table::new();
        self.push_nil();
        while self.next(t) {
            // key at -2, value at -1
            if let Some(key) = self.copy_key(-2) {
                match self.copy_value(-1, path) {
                    Some(value) => table.set(key, value),
                    None => log::trace!("skipping {} value during table copy", self.type_of(-1)),
                }
            }
            self.pop(1);
        }

        path.remove(&id);
        table
    }

    /// Push a host value.
    pub fn push_host(&self, value: &Value) {
        match value {
            Value::Nil => self.push_nil(),
            Value::Bool(b) => self.push_boolean(*b),
            Value::Number(LuaNumber::Int(i)) => self.push_integer(*i),
            Value::Number(LuaNumber::Float(f)) => self.push_number(*f),
            Value::String(s) => self.push_string(s),
            Value::Table(t) => self.push_table(t),
            Value::LightUserData(p) => self.push_light_userdata(*p),
        }
    }

    /// Push a new VM table with the contents of `table`.
    pub fn push_table(&self, table: &Table) {
        self.create_table(table.narr(), table.nrec());
        for (i, v) in table.array().iter().enumerate() {
            self.push_host(v);
            self.set_i(-2, i as i64 + 1);
        }
        for (k, v) in table.iter_map() {
            match k {
                TableKey::String(s) => {
                    self.push_host(v);
                    self.set_field(-2, s);
                }
                TableKey::Integer(i) => {
                    self.push_host(v);
                    self.set_i(-2, *i);
                }
                TableKey::Bool(b) => {
                    self.push_boolean(*b);
                    self.push_host(v);
                    self.set_table(-3);
                }
                TableKey::Number(f) => {
                    self.push_number(f.get());
                    self.push_host(v);
                    self.set_table(-3);
                }
            }
        }
    }
}

//! Procedural macros for luabind userdata.
//!
//! Provides `#[derive(LuaUserData)]` to generate a `luabind::UserData`
//! implementation for Rust structs, exposing public fields to Lua through
//! `__index`.
//!
//! # Attributes
//!
//! - `#[lua(skip)]` on a field: exclude it from Lua access
//! - `#[lua(name = "...")]` on a field: use a custom Lua-visible name
//!
//! Fields are read-only from Lua: hooks only see `&self`.
//!
//! # Trait-backed metamethods
//!
//! Use `#[lua_impl(...)]` on the struct to map Rust traits to metamethods:
//! - `Display` → `__tostring`
//! - `PartialEq` → `__eq`
//! - `PartialOrd` → `__lt`, `__le`
//!
//! # Example
//!
//! ```ignore
//! use luabind::LuaUserData;
//!
//! #[derive(LuaUserData, PartialEq, PartialOrd)]
//! #[lua_impl(PartialEq, PartialOrd)]
//! struct Point {
//!     pub x: f64,
//!     pub y: f64,
//!     #[lua(skip)]
//!     pub cache_id: u32,
//! }
//! ```

mod derive_userdata;
mod type_utils;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derive `luabind::UserData` for a struct.
///
/// # Supported field types
/// - `i8` … `i64`, `isize`, `u8` … `u64`, `usize` → integer
/// - `f32`, `f64` → float
/// - `bool` → boolean
/// - `String` → string
/// - anything else convertible with `luabind::Value::from`
#[proc_macro_derive(LuaUserData, attributes(lua, lua_impl))]
pub fn derive_lua_userdata(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_userdata::derive_lua_userdata_impl(input)
}

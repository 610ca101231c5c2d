//! Mapping from Rust field types to the stack push that exposes them.

use quote::quote;

/// Normalize a `syn::Type` to a simple string for matching.
///
/// Strips whitespace so `Option < i64 >` becomes `Option<i64>`.
pub fn normalize_type(ty: &syn::Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

/// Generate code pushing the field at `accessor` on `state`.
pub fn push_field(ty: &syn::Type, accessor: proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    match normalize_type(ty).as_str() {
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { state.push_integer(#accessor as i64) }
        }
        "f32" | "f64" => {
            quote! { state.push_number(#accessor as f64) }
        }
        "bool" => {
            quote! { state.push_boolean(#accessor) }
        }
        "String" => {
            quote! { state.push_string(&#accessor) }
        }
        // Fallback: anything with `From<_> for Value`
        _ => {
            quote! { state.push_host(&luabind::Value::from(#accessor.clone())) }
        }
    }
}

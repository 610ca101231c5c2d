//! `#[derive(LuaUserData)]`: generate `luabind::UserData` for Rust structs.
//!
//! Public named fields are readable from Lua via `__index`; tuple and unit
//! structs get an impl without field access.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, Meta};

use crate::type_utils::push_field;

/// Internal field metadata collected during parsing.
struct FieldInfo {
    ident: Ident,
    ty: syn::Type,
    lua_name: String,
}

/// Entry point for `#[derive(LuaUserData)]`.
pub fn derive_lua_userdata_impl(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    let trait_impls = parse_lua_impl_attrs(&input);

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => collect_fields(&fields.named),
            // tuple or unit struct: no field export
            _ => Ok(Vec::new()),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "LuaUserData can only be derived for structs",
        )),
    };
    let fields = match fields {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let index_impl = gen_index(&fields);
    let metamethods = gen_metamethods(&trait_impls);

    let type_name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics luabind::UserData for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name_str
            }

            #index_impl
            #metamethods
        }
    };

    expanded.into()
}

fn collect_fields(
    fields: &syn::punctuated::Punctuated<syn::Field, syn::token::Comma>,
) -> syn::Result<Vec<FieldInfo>> {
    let mut infos = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let is_pub = matches!(field.vis, syn::Visibility::Public(_));

        let mut skip = false;
        let mut lua_name: Option<String> = None;
        for attr in &field.attrs {
            if !attr.path().is_ident("lua") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    let lit: syn::LitStr = meta.value()?.parse()?;
                    lua_name = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `skip` or `name = \"...\"`"))
                }
            })?;
        }

        if skip || !is_pub {
            continue;
        }

        infos.push(FieldInfo {
            ident: ident.clone(),
            ty: field.ty.clone(),
            lua_name: lua_name.unwrap_or_else(|| ident.to_string()),
        });
    }
    Ok(infos)
}

// ==================== Attribute parsing ====================

/// Parse `#[lua_impl(Display, PartialEq, PartialOrd, ...)]` attributes
fn parse_lua_impl_attrs(input: &DeriveInput) -> Vec<String> {
    let mut impls = Vec::new();
    for attr in &input.attrs {
        if attr.path().is_ident("lua_impl") {
            if let Meta::List(list) = &attr.meta {
                let _ = list.parse_nested_meta(|meta| {
                    if let Some(ident) = meta.path.get_ident() {
                        impls.push(ident.to_string());
                    }
                    Ok(())
                });
            }
        }
    }
    impls
}

// ==================== Code generation ====================

/// `__index`: string key at argument 2 matched against exported fields.
fn gen_index(fields: &[FieldInfo]) -> TokenStream2 {
    if fields.is_empty() {
        return quote! {};
    }
    let arms = fields.iter().map(|f| {
        let ident = &f.ident;
        let lua_name = &f.lua_name;
        let push = push_field(&f.ty, quote!(self.#ident));
        quote! {
            #lua_name => {
                #push;
                1
            }
        }
    });

    quote! {
        fn lua_index(&self, state: luabind::LuaState) -> i32 {
            if state.type_of(2) != luabind::LuaType::String {
                return 0;
            }
            let Some(key) = state.to_string(2) else {
                return 0;
            };
            match key.as_str() {
                #(#arms)*
                _ => 0,
            }
        }
    }
}

/// Metamethods backed by the traits named in `#[lua_impl(...)]`.
fn gen_metamethods(trait_impls: &[String]) -> TokenStream2 {
    let has = |t: &str| trait_impls.iter().any(|i| i == t);

    let tostring_impl = if has("Display") {
        quote! {
            fn lua_tostring(&self, state: luabind::LuaState) -> i32 {
                state.push_string(&self.to_string());
                1
            }
        }
    } else {
        quote! {}
    };

    let eq_impl = if has("PartialEq") {
        quote! {
            fn lua_eq(&self, state: luabind::LuaState) -> i32 {
                let equal = match (state.to_userdata::<Self>(1), state.to_userdata::<Self>(2)) {
                    (Some(a), Some(b)) => unsafe { a.as_ref() == b.as_ref() },
                    _ => false,
                };
                state.push_boolean(equal);
                1
            }
        }
    } else {
        quote! {}
    };

    let ord_impl = if has("PartialOrd") {
        quote! {
            fn lua_lt(&self, state: luabind::LuaState) -> i32 {
                let less = match (state.to_userdata::<Self>(1), state.to_userdata::<Self>(2)) {
                    (Some(a), Some(b)) => unsafe { a.as_ref() < b.as_ref() },
                    _ => false,
                };
                state.push_boolean(less);
                1
            }

            fn lua_le(&self, state: luabind::LuaState) -> i32 {
                let less_eq = match (state.to_userdata::<Self>(1), state.to_userdata::<Self>(2)) {
                    (Some(a), Some(b)) => unsafe { a.as_ref() <= b.as_ref() },
                    _ => false,
                };
                state.push_boolean(less_eq);
                1
            }
        }
    } else {
        quote! {}
    };

    quote! {
        #tostring_impl
        #eq_impl
        #ord_impl
    }
}

//! Record derive macro implementation

use crate::attrs::{field_attr, struct_attr};
use crate::common::syn_types::option_inner;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let attr = struct_attr(&input.attrs)?;
    let table = attr.table.unwrap_or_default();
    let soft_delete = match &attr.soft_delete {
        Some(column) => quote! { ::core::option::Option::Some(#column) },
        None => quote! { ::core::option::Option::None },
    };

    let mut accessors = Vec::new();
    let mut embeds = Vec::new();
    let mut bindings = Vec::new();

    for field in fields {
        let field_attr = field_attr(field)?;
        if field_attr.skip {
            continue;
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let field_name = ident.unraw().to_string();
        let get = format_ident!("__pgmodel_get_{}", field_name);
        let get_mut = format_ident!("__pgmodel_get_{}_mut", field_name);

        accessors.push(quote! {
            fn #get(record: &#name) -> &#ty {
                &record.#ident
            }
            fn #get_mut(record: &mut #name) -> &mut #ty {
                &mut record.#ident
            }
        });

        if field_attr.flatten {
            embeds.push(quote! {
                .embed::<#ty>(<#ty as ::pgmodel::Record>::schema(), #get, #get_mut)
            });
            continue;
        }

        let column = field_attr
            .column
            .map(|column| quote! { .column(#column) });
        let def = match option_inner(ty) {
            Some(inner) => quote! {
                ::pgmodel::FieldDef::<#name>::optional::<#inner>(#field_name, #get, #get_mut)
            },
            None => quote! {
                ::pgmodel::FieldDef::<#name>::required::<#ty>(#field_name, #get, #get_mut)
            },
        };
        bindings.push(quote! { .field(#def #column) });
    }

    let hooks = if attr.hooks {
        quote! {}
    } else {
        quote! {
            impl ::pgmodel::Hooks for #name {}
        }
    };

    Ok(quote! {
        impl ::pgmodel::Record for #name {
            const TABLE: &'static str = #table;
            const SOFT_DELETE_COLUMN: ::core::option::Option<&'static str> = #soft_delete;

            fn schema() -> &'static ::pgmodel::Schema<Self> {
                static SCHEMA: ::std::sync::OnceLock<::pgmodel::Schema<#name>> =
                    ::std::sync::OnceLock::new();

                #(#accessors)*

                SCHEMA.get_or_init(|| {
                    ::pgmodel::Schema::<#name>::new()
                        #(#embeds)*
                        #(#bindings)*
                })
            }
        }

        #hooks
    })
}

//! Attribute parsing for the Record derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use syn::{Attribute, Result};

/// Struct-level options.
#[derive(Default)]
pub(crate) struct StructAttr {
    pub table: Option<String>,
    pub soft_delete: Option<String>,
    pub hooks: bool,
}

/// Field-level options.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub column: Option<String>,
    pub skip: bool,
    pub flatten: bool,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = StructAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "hooks" {
                attr.hooks = true;
            } else {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if ident == "table" {
                    attr.table = Some(value.value());
                } else if ident == "soft_delete" {
                    attr.soft_delete = Some(value.value());
                } else {
                    return Err(syn::Error::new_spanned(
                        ident,
                        "unknown attribute, expected `table`, `soft_delete` or `hooks`",
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                attr.skip = true;
            } else if ident == "flatten" {
                attr.flatten = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "unknown attribute, expected `column`, `flatten` or `skip`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

fn merge<T: syn::parse::Parse>(attrs: &[Attribute], mut apply: impl FnMut(T)) -> Result<()> {
    for attr in attrs {
        if attr.path().is_ident("orm") {
            apply(attr.parse_args::<T>()?);
        }
    }
    Ok(())
}

/// Collect every `#[orm(...)]` on the struct.
pub(crate) fn struct_attr(attrs: &[Attribute]) -> Result<StructAttr> {
    let mut out = StructAttr::default();
    merge(attrs, |attr: StructAttr| {
        out.table = attr.table.or(out.table.take());
        out.soft_delete = attr.soft_delete.or(out.soft_delete.take());
        out.hooks |= attr.hooks;
    })?;
    Ok(out)
}

/// Collect every `#[orm(...)]` on a field.
pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    merge(&field.attrs, |attr: FieldAttr| {
        out.column = attr.column.or(out.column.take());
        out.skip |= attr.skip;
        out.flatten |= attr.flatten;
    })?;

    if out.flatten && (out.skip || out.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "`flatten` cannot be combined with `skip` or `column`",
        ));
    }
    Ok(out)
}

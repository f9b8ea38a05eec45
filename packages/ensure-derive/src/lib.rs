//! Procedural macros for `ensure-defined`
//!
//! This crate provides:
//! - `#[derive(Record)]` - Implements `Record` and `EnsureAll` for structs with
//!   named fields, along with a key enum, a narrowed companion struct and
//!   per-field accessors on `Ensured`

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Field, Fields, GenericArgument,
    Ident, LitStr, Path, PathArguments, Token, Type, TypePath, Visibility, WherePredicate,
};

const ATTR: &str = "ensure";

// ============================================================================
// Main Macro Entry Point
// ============================================================================

/// Derive macro for flat records
///
/// Generates, for a struct `Name` with named fields:
///
/// 1. `NameKey` - one variant per field, naming the fields that `ensure` may check
/// 2. `impl Record for Name` - fields enumerate in declaration order
/// 3. `NameDefined` - the struct with every presence field unwrapped
/// 4. `impl EnsureAll for Name` - converts into `NameDefined`
/// 5. `NameEnsured` - a trait on `Ensured<Name>` with one `<field>_defined`
///    accessor per presence field, returning the unwrapped value
///
/// Fields typed `Option<_>` are presence fields. Any other field type that
/// implements `Presence` becomes one with `#[ensure(presence)]`. Derives for
/// the companion struct go in `#[ensure(derive(...))]` on the struct.
///
/// # Example
///
/// ```ignore
/// use ensure_defined::Record;
///
/// #[derive(Clone, Record)]
/// #[ensure(derive(Debug, PartialEq))]
/// pub struct SomeDto {
///     pub id: Option<String>,
///     #[ensure(presence)]
///     pub payload: serde_json::Value,
///     pub kind: u8,
/// }
///
/// // Generated:
/// // pub enum SomeDtoKey { Id, Payload, Kind }
/// // pub struct SomeDtoDefined { pub id: String, pub payload: serde_json::Value, pub kind: u8 }
/// // pub trait SomeDtoEnsured { fn id_defined(&self) -> Result<&String>; fn payload_defined(&self) -> Result<&Value>; }
/// ```
#[proc_macro_derive(Record, attributes(ensure))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match RecordInput::from_derive(&input) {
        Ok(record) => record.expand().into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// How a field takes part in presence checks
enum FieldKind<'a> {
    /// `Option<T>`; narrows to `T`
    Optional(&'a Type),
    /// Marked `#[ensure(presence)]`; narrows to `<T as Presence>::Present`
    Presence,
    /// Always present
    Plain,
}

struct RecordField<'a> {
    field: &'a Field,
    ident: &'a Ident,
    /// The field name as callers see it, without any raw identifier prefix
    name: String,
    variant: Ident,
    kind: FieldKind<'a>,
}

struct RecordInput<'a> {
    input: &'a DeriveInput,
    derives: Vec<Path>,
    fields: Vec<RecordField<'a>>,
}

impl<'a> RecordInput<'a> {
    fn from_derive(input: &'a DeriveInput) -> syn::Result<Self> {
        let named = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named,
                Fields::Unnamed(_) | Fields::Unit => {
                    return Err(syn::Error::new_spanned(
                        &input.ident,
                        "Record can only be derived for structs with named fields",
                    ))
                }
            },
            Data::Enum(_) | Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Record can only be derived for structs",
                ))
            }
        };

        let derives = parse_struct_attrs(&input.attrs)?;
        let fields = named
            .named
            .iter()
            .map(RecordField::from_field)
            .collect::<syn::Result<Vec<_>>>()?;

        check_unique_variants(&fields)?;

        Ok(Self {
            input,
            derives,
            fields,
        })
    }
}

impl<'a> RecordField<'a> {
    fn from_field(field: &'a Field) -> syn::Result<Self> {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

        let presence = parse_field_attrs(&field.attrs)?;
        let kind = match option_inner(&field.ty) {
            Some(inner) => FieldKind::Optional(inner),
            None if presence => FieldKind::Presence,
            None => FieldKind::Plain,
        };

        let name = ident.unraw().to_string();
        let variant = upper_camel_case(&name);
        if variant.is_empty() {
            return Err(syn::Error::new_spanned(
                ident,
                "field name must contain a character other than `_`",
            ));
        }
        let variant = Ident::new(&variant, ident.span());

        Ok(Self {
            field,
            ident,
            name,
            variant,
            kind,
        })
    }
}

/// Parses `#[ensure(derive(...))]` on the struct
fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<Vec<Path>> {
    let mut derives = Vec::new();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident(ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("derive") {
                let content;
                syn::parenthesized!(content in meta.input);
                let paths = content.parse_terminated(Path::parse_mod_style, Token![,])?;
                derives.extend(paths);
                Ok(())
            } else {
                Err(meta.error("unsupported attribute on struct, expected `derive(...)`"))
            }
        })?;
    }

    Ok(derives)
}

/// Parses `#[ensure(presence)]` on a field
fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut presence = false;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident(ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("presence") {
                presence = true;
                Ok(())
            } else {
                Err(meta.error("unsupported attribute on field, expected `presence`"))
            }
        })?;
    }

    Ok(presence)
}

/// Returns `T` if `ty` is spelled `Option<T>` (by any path ending in `Option`)
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }

    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn upper_camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}

fn check_unique_variants(fields: &[RecordField<'_>]) -> syn::Result<()> {
    let mut seen = HashSet::new();

    for field in fields {
        if !seen.insert(field.variant.to_string()) {
            return Err(syn::Error::new_spanned(
                field.ident,
                format!(
                    "field `{}` maps to the key variant `{}` which is already taken by another field",
                    field.name, field.variant
                ),
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Code Generation
// ============================================================================

impl RecordInput<'_> {
    fn key_ident(&self) -> Ident {
        format_ident!("{}Key", self.input.ident)
    }

    fn defined_ident(&self) -> Ident {
        format_ident!("{}Defined", self.input.ident)
    }

    fn ensured_ident(&self) -> Ident {
        format_ident!("{}Ensured", self.input.ident)
    }

    /// Bounds every generated impl and the companion struct need
    fn extra_predicates(&self) -> Vec<WherePredicate> {
        self.fields
            .iter()
            .filter(|field| matches!(field.kind, FieldKind::Presence))
            .map(|field| {
                let ty = &field.field.ty;
                parse_quote!(#ty: ::ensure_defined::Presence)
            })
            .collect()
    }

    /// The input's own where clause extended with the generated bounds
    fn where_clause(&self, require_clone: bool) -> TokenStream2 {
        let mut predicates: Vec<WherePredicate> = self
            .input
            .generics
            .where_clause
            .iter()
            .flat_map(|clause| clause.predicates.iter().cloned())
            .collect();
        predicates.extend(self.extra_predicates());
        if require_clone {
            predicates.push(parse_quote!(Self: ::core::clone::Clone));
        }

        if predicates.is_empty() {
            TokenStream2::new()
        } else {
            quote!(where #(#predicates),*)
        }
    }

    fn expand(&self) -> TokenStream2 {
        let key_enum = self.expand_key_enum();
        let record_impl = self.expand_record_impl();
        let defined_struct = self.expand_defined_struct();
        let ensure_all_impl = self.expand_ensure_all_impl();
        let accessors = self.expand_accessors();

        quote! {
            #key_enum
            #record_impl
            #defined_struct
            #ensure_all_impl
            #accessors
        }
    }

    fn expand_key_enum(&self) -> TokenStream2 {
        let vis = &self.input.vis;
        let ident = &self.input.ident;
        let key_ident = self.key_ident();
        let count = self.fields.len();
        let variants: Vec<_> = self.fields.iter().map(|field| &field.variant).collect();
        let names: Vec<_> = self
            .fields
            .iter()
            .map(|field| LitStr::new(&field.name, Span::call_site()))
            .collect();

        let doc = format!("Field names of [`{ident}`], in declaration order.");
        let variant_docs = names.iter().map(|name| format!("The `{}` field.", name.value()));

        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            #vis enum #key_ident {
                #(
                    #[doc = #variant_docs]
                    #variants,
                )*
            }

            impl #key_ident {
                /// Every field, in declaration order.
                pub const ALL: [Self; #count] = [#(Self::#variants),*];

                /// The literal field name.
                #[must_use]
                pub const fn as_str(self) -> &'static str {
                    match self {
                        #(Self::#variants => #names,)*
                    }
                }
            }

            impl ::core::convert::AsRef<str> for #key_ident {
                fn as_ref(&self) -> &str {
                    self.as_str()
                }
            }

            impl ::core::fmt::Display for #key_ident {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        }
    }

    fn expand_record_impl(&self) -> TokenStream2 {
        let ident = &self.input.ident;
        let key_ident = self.key_ident();
        let (impl_generics, ty_generics, _) = self.input.generics.split_for_impl();
        let where_clause = self.where_clause(true);

        let arms = self.fields.iter().map(|field| {
            let variant = &field.variant;
            let field_ident = field.ident;
            let check = match field.kind {
                FieldKind::Optional(_) | FieldKind::Presence => quote! {
                    ::ensure_defined::Presence::is_present(&self.#field_ident)
                },
                FieldKind::Plain => quote!(true),
            };
            quote!(#key_ident::#variant => #check,)
        });

        quote! {
            impl #impl_generics ::ensure_defined::Record for #ident #ty_generics #where_clause {
                type Key<'__ensure> = #key_ident where Self: '__ensure;

                fn keys(&self) -> ::std::vec::Vec<#key_ident> {
                    ::std::vec::Vec::from(#key_ident::ALL)
                }

                fn is_member_defined(&self, key: &#key_ident) -> bool {
                    match *key {
                        #(#arms)*
                    }
                }
            }
        }
    }

    fn expand_defined_struct(&self) -> TokenStream2 {
        let vis = &self.input.vis;
        let ident = &self.input.ident;
        let defined_ident = self.defined_ident();
        let generics = &self.input.generics;
        let where_clause = self.where_clause(false);
        let derives = &self.derives;

        let derive_attr = (!derives.is_empty()).then(|| quote!(#[derive(#(#derives),*)]));
        let doc = format!("[`{ident}`] with every optional field checked and unwrapped.");

        let fields = self.fields.iter().map(|field| {
            let field_vis: &Visibility = &field.field.vis;
            let field_ident = field.ident;
            let docs = field.field.attrs.iter().filter(|attr| attr.path().is_ident("doc"));
            let ty = match field.kind {
                FieldKind::Optional(inner) => quote!(#inner),
                FieldKind::Presence => {
                    let ty = &field.field.ty;
                    quote!(<#ty as ::ensure_defined::Presence>::Present)
                }
                FieldKind::Plain => {
                    let ty = &field.field.ty;
                    quote!(#ty)
                }
            };
            quote! {
                #(#docs)*
                #field_vis #field_ident: #ty,
            }
        });

        quote! {
            #[doc = #doc]
            #derive_attr
            #vis struct #defined_ident #generics #where_clause {
                #(#fields)*
            }
        }
    }

    fn expand_ensure_all_impl(&self) -> TokenStream2 {
        let ident = &self.input.ident;
        let defined_ident = self.defined_ident();
        let (impl_generics, ty_generics, _) = self.input.generics.split_for_impl();
        let where_clause = self.where_clause(true);

        let conversions = self.fields.iter().map(|field| {
            let field_ident = field.ident;
            let name = LitStr::new(&field.name, Span::call_site());
            match field.kind {
                FieldKind::Optional(_) | FieldKind::Presence => quote! {
                    #field_ident: ::ensure_defined::Presence::into_present(self.#field_ident)
                        .ok_or_else(|| ::ensure_defined::EnsureError::member_not_defined(#name))?,
                },
                FieldKind::Plain => quote!(#field_ident: self.#field_ident,),
            }
        });

        quote! {
            impl #impl_generics ::ensure_defined::EnsureAll for #ident #ty_generics #where_clause {
                type Defined = #defined_ident #ty_generics;

                fn into_defined(self) -> ::ensure_defined::Result<Self::Defined> {
                    ::core::result::Result::Ok(#defined_ident {
                        #(#conversions)*
                    })
                }
            }
        }
    }

    /// Borrowing accessors for the presence fields of an `Ensured` copy.
    ///
    /// `Ensured` lives in another crate, so the accessors hang off a
    /// generated trait rather than an inherent impl.
    fn expand_accessors(&self) -> TokenStream2 {
        let presence_fields: Vec<_> = self
            .fields
            .iter()
            .filter(|field| !matches!(field.kind, FieldKind::Plain))
            .collect();
        if presence_fields.is_empty() {
            return TokenStream2::new();
        }

        let vis = &self.input.vis;
        let ident = &self.input.ident;
        let ensured_ident = self.ensured_ident();
        let generics = &self.input.generics;
        let (impl_generics, ty_generics, _) = generics.split_for_impl();
        let where_clause = self.where_clause(false);

        let doc = format!("Accessors for the presence fields of an `Ensured<{ident}>`.");

        let (signatures, bodies): (Vec<_>, Vec<_>) = presence_fields
            .iter()
            .map(|field| {
                let field_ident = field.ident;
                let method = format_ident!("{}_defined", field.name);
                let name = LitStr::new(&field.name, Span::call_site());
                let ty = match field.kind {
                    FieldKind::Optional(inner) => quote!(#inner),
                    FieldKind::Presence | FieldKind::Plain => {
                        let ty = &field.field.ty;
                        quote!(<#ty as ::ensure_defined::Presence>::Present)
                    }
                };
                let method_doc = format!("The `{}` field, unwrapped.", field.name);

                let signature = quote! {
                    #[doc = #method_doc]
                    ///
                    /// # Errors
                    /// Returns `EnsureError::MemberNotDefined` if the field is absent,
                    /// which cannot happen once it has been checked.
                    fn #method(&self) -> ::ensure_defined::Result<&#ty>
                };
                let body = quote! {
                    fn #method(&self) -> ::ensure_defined::Result<&#ty> {
                        ::ensure_defined::Presence::as_present(&self.#field_ident)
                            .ok_or_else(|| ::ensure_defined::EnsureError::member_not_defined(#name))
                    }
                };
                (signature, body)
            })
            .unzip();

        quote! {
            #[doc = #doc]
            #vis trait #ensured_ident #generics #where_clause {
                #(#signatures;)*
            }

            impl #impl_generics #ensured_ident #ty_generics
                for ::ensure_defined::Ensured<#ident #ty_generics> #where_clause
            {
                #(#bodies)*
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_camel_case() {
        assert_eq!(upper_camel_case("fizz"), "Fizz");
        assert_eq!(upper_camel_case("client_id"), "ClientId");
        assert_eq!(upper_camel_case("_leading"), "Leading");
        assert_eq!(upper_camel_case("a__b"), "AB");
    }

    #[test]
    fn test_option_inner() {
        let ty: Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());

        let ty: Type = parse_quote!(::core::option::Option<u8>);
        assert!(option_inner(&ty).is_some());

        let ty: Type = parse_quote!(Vec<u8>);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn test_rejects_tuple_struct() {
        let input: DeriveInput = parse_quote!(
            struct Pair(Option<u8>, u8);
        );
        assert!(RecordInput::from_derive(&input).is_err());
    }

    #[test]
    fn test_rejects_enum() {
        let input: DeriveInput = parse_quote!(
            enum Either {
                Left,
                Right,
            }
        );
        assert!(RecordInput::from_derive(&input).is_err());
    }

    #[test]
    fn test_rejects_unknown_attribute() {
        let input: DeriveInput = parse_quote!(
            struct Dto {
                #[ensure(deep)]
                id: Option<u8>,
            }
        );
        assert!(RecordInput::from_derive(&input).is_err());
    }

    #[test]
    fn test_rejects_colliding_variants() {
        let input: DeriveInput = parse_quote!(
            struct Dto {
                foo_bar: Option<u8>,
                foo__bar: Option<u8>,
            }
        );
        assert!(RecordInput::from_derive(&input).is_err());
    }

    #[test]
    fn test_field_kinds() {
        let input: DeriveInput = parse_quote!(
            #[ensure(derive(Debug, PartialEq))]
            struct Dto {
                id: Option<String>,
                #[ensure(presence)]
                payload: Value,
                r#type: u8,
            }
        );
        let record = RecordInput::from_derive(&input).unwrap();

        assert_eq!(record.derives.len(), 2);
        assert!(matches!(record.fields[0].kind, FieldKind::Optional(_)));
        assert!(matches!(record.fields[1].kind, FieldKind::Presence));
        assert!(matches!(record.fields[2].kind, FieldKind::Plain));
        assert_eq!(record.fields[2].name, "type");
        assert_eq!(record.fields[2].variant, "Type");
    }

    #[test]
    fn test_expand_names_generated_items() {
        let input: DeriveInput = parse_quote!(
            pub struct Dto {
                pub id: Option<String>,
            }
        );
        let expanded = RecordInput::from_derive(&input).unwrap().expand().to_string();

        assert!(expanded.contains("enum DtoKey"));
        assert!(expanded.contains("struct DtoDefined"));
        assert!(expanded.contains("member_not_defined"));
        assert!(expanded.contains("\"id\""));
        assert!(expanded.contains("trait DtoEnsured"));
        assert!(expanded.contains("fn id_defined"));
        assert!(expanded.contains("std :: vec :: Vec < DtoKey >"));
        assert!(!expanded.contains("__private"));
    }

    #[test]
    fn test_expand_skips_accessors_without_presence_fields() {
        let input: DeriveInput = parse_quote!(
            struct Totals {
                count: u32,
            }
        );
        let expanded = RecordInput::from_derive(&input).unwrap().expand().to_string();

        assert!(!expanded.contains("TotalsEnsured"));
    }

    #[test]
    fn test_expand_accessor_for_raw_identifier() {
        let input: DeriveInput = parse_quote!(
            struct Event {
                r#type: Option<String>,
                #[ensure(presence)]
                payload: Value,
            }
        );
        let expanded = RecordInput::from_derive(&input).unwrap().expand().to_string();

        assert!(expanded.contains("fn type_defined"));
        assert!(expanded.contains("fn payload_defined"));
        assert!(expanded.contains("< Value as :: ensure_defined :: Presence > :: Present"));
    }
}

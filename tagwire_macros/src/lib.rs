use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Result as SynResult, Type};

/// How a field's annotations were written.
enum TagInput {
    /// `#[field(query = "name", validate = "required")]`
    Pairs(Vec<(String, String)>),
    /// `#[field(tag = r#"query:"name" validate:"required""#)]`
    Raw(String),
}

struct FieldDef {
    ident: Ident,
    ty: Type,
    tags: TagInput,
    embed: bool,
}

fn parse_field_attr(field: &syn::Field) -> SynResult<Option<FieldDef>> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new_spanned(field, "Model fields must be named"));
    };
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut raw: Option<String> = None;
    let mut seen = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("field")) {
        seen = true;
        attr.parse_nested_meta(|meta| {
            let key = meta
                .path
                .get_ident()
                .map(|i| i.to_string())
                .ok_or_else(|| meta.error("expected a tag key"))?;
            if meta.input.peek(syn::Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                if key == "tag" {
                    raw = Some(lit.value());
                } else {
                    pairs.push((key, lit.value()));
                }
            } else {
                // Marker keys such as `embed` carry no value.
                pairs.push((key, String::new()));
            }
            Ok(())
        })?;
    }

    if !seen {
        return Ok(None);
    }

    let tags = match raw {
        Some(raw) if pairs.is_empty() => TagInput::Raw(raw),
        Some(_) => {
            return Err(syn::Error::new_spanned(
                &ident,
                "`tag = \"...\"` cannot be combined with individual tag keys",
            ))
        }
        None => TagInput::Pairs(pairs),
    };
    let embed = match &tags {
        TagInput::Pairs(p) => p.iter().any(|(k, _)| k == "embed"),
        TagInput::Raw(r) => r.contains("embed:\""),
    };

    Ok(Some(FieldDef {
        ident,
        ty: field.ty.clone(),
        tags,
        embed,
    }))
}

fn tag_tokens(tags: &TagInput) -> TokenStream2 {
    match tags {
        TagInput::Pairs(pairs) => {
            let items = pairs.iter().map(|(k, v)| quote! { (#k, #v) });
            quote! { ::tagwire::tags::TagSource::Pairs(&[#(#items),*]) }
        }
        TagInput::Raw(raw) => quote! { ::tagwire::tags::TagSource::Raw(#raw) },
    }
}

fn expand(input: DeriveInput) -> SynResult<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "Model can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(name, "Model requires named fields"));
    };

    let mut defs = Vec::new();
    for field in &named.named {
        if let Some(def) = parse_field_attr(field)? {
            defs.push(def);
        }
    }

    let decls = defs.iter().map(|f| {
        let ident = f.ident.to_string();
        let ty = &f.ty;
        let tags = tag_tokens(&f.tags);
        // Embedded models are never serialized whole; their fields carry zeros.
        let zero = if f.embed {
            quote! { || ::tagwire::__private::Value::Null }
        } else {
            quote! { ::tagwire::model::zero_value::<#ty> }
        };
        quote! {
            ::tagwire::model::FieldDecl {
                ident: #ident,
                tags: #tags,
                shape: <#ty as ::tagwire::model::Describe>::shape(),
                zero: #zero,
            }
        }
    });

    let assign_arms = defs.iter().map(|f| {
        let ident = &f.ident;
        let key = ident.to_string();
        if f.embed {
            quote! { #key => ::tagwire::model::Model::assign(&mut self.#ident, rest, value), }
        } else {
            quote! {
                #key if rest.is_empty() => {
                    self.#ident = ::tagwire::__private::from_value(value)?;
                    ::std::result::Result::Ok(true)
                }
            }
        }
    });

    let read_arms = defs.iter().map(|f| {
        let ident = &f.ident;
        let key = ident.to_string();
        if f.embed {
            quote! { #key => ::tagwire::model::Model::read(&self.#ident, rest), }
        } else {
            quote! { #key if rest.is_empty() => ::tagwire::__private::to_value(&self.#ident).ok(), }
        }
    });

    Ok(quote! {
        impl #impl_generics ::tagwire::model::Model for #name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::tagwire::model::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn assign(
                &mut self,
                path: &[&str],
                value: ::tagwire::__private::Value,
            ) -> ::std::result::Result<bool, ::tagwire::__private::JsonError> {
                let (head, rest) = match path.split_first() {
                    ::std::option::Option::Some(split) => split,
                    ::std::option::Option::None => return ::std::result::Result::Ok(false),
                };
                let _ = &value;
                match *head {
                    #(#assign_arms)*
                    _ => ::std::result::Result::Ok(false),
                }
            }

            fn read(&self, path: &[&str]) -> ::std::option::Option<::tagwire::__private::Value> {
                let (head, rest) = path.split_first()?;
                let _ = rest;
                match *head {
                    #(#read_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl #impl_generics ::tagwire::model::Describe for #name #ty_generics #where_clause {
            fn shape() -> ::tagwire::model::TypeShape {
                ::tagwire::model::TypeShape::Model(::tagwire::model::ModelRef::of::<Self>())
            }
        }
    })
}

/// Derive the static field declaration a model needs for binding and schema
/// synthesis.
///
/// Fields take part only when they carry a `#[field(...)]` attribute:
///
/// ```rust,ignore
/// #[derive(Debug, Default, Model)]
/// pub struct GetItem {
///     #[field(embed)]
///     pub auth: TokenHeader,
///     #[field(uri = "id", validate = "required", json = "id")]
///     pub id: i64,
///     #[field(tag = r#"query:"verbose" json:"verbose""#)]
///     pub verbose: bool,
/// }
/// ```
///
/// Every annotated field type must implement `Default`, `serde::Serialize`,
/// `serde::de::DeserializeOwned` and `tagwire::model::Describe`. `embed`
/// fields only need to be models themselves.
///
/// A field holding another model is decoded and encoded by serde, so the
/// nested model's serde names must match its `form`/`json` tags (add
/// `#[serde(rename = "...")]` where they differ). Descriptor construction
/// fails with `ConfigError::NameMismatch` otherwise.
#[proc_macro_derive(Model, attributes(field))]
pub fn derive_model(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match expand(input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

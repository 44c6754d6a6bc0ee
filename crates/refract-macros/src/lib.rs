//! `#[derive(Reflect)]` for refract.
//!
//! The derive implements `refract::Reflect` for structs with named or tuple
//! fields. Field tags and embedding are declared with the `refract`
//! attribute:
//!
//! ```ignore
//! use refract::Reflect;
//!
//! #[derive(Reflect)]
//! struct User {
//!     #[refract(tag = r#"json:"id,string" db:"user_id""#)]
//!     pub id: u64,
//!     #[refract(embed)]
//!     pub audit: Audit,
//!     password: String,
//! }
//! ```
//!
//! Container options:
//!
//! - `#[refract(crate = "path")]` changes the path the generated code uses to
//!   reach the refract API. Defaults to `::refract`.
//!
//! Field options:
//!
//! - `#[refract(tag = "...")]` attaches a raw tag string. Repeated tag
//!   attributes are joined with a space.
//! - `#[refract(embed)]` marks the field as embedded.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericParam, Index, LitStr, Path, parse_macro_input, parse_quote,
    spanned::Spanned,
};

#[proc_macro_derive(Reflect, attributes(refract))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(output) => output.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ============================================================================
// Attribute Parsing
// ============================================================================

fn crate_path(input: &DeriveInput) -> syn::Result<Path> {
    let mut krate: Path = parse_quote!(::refract);
    for attr in &input.attrs {
        if !attr.path().is_ident("refract") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let lit: LitStr = meta.value()?.parse()?;
                krate = lit.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported refract container attribute"))
            }
        })?;
    }
    Ok(krate)
}

#[derive(Default)]
struct FieldAttrs {
    tags: Vec<String>,
    embed: bool,
}

fn field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("refract") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.tags.push(lit.value());
                Ok(())
            } else if meta.path.is_ident("embed") {
                attrs.embed = true;
                Ok(())
            } else {
                Err(meta.error("unsupported refract field attribute"))
            }
        })?;
    }
    Ok(attrs)
}

fn visibility(vis: &syn::Visibility, krate: &Path) -> TokenStream2 {
    match vis {
        syn::Visibility::Public(_) => quote!(#krate::Visibility::Public),
        syn::Visibility::Restricted(restricted) if restricted.path.is_ident("crate") => {
            quote!(#krate::Visibility::Crate)
        }
        syn::Visibility::Restricted(restricted) => {
            let path = restricted
                .path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            quote!(#krate::Visibility::Restricted { path: ::std::string::String::from(#path) })
        }
        syn::Visibility::Inherited => quote!(#krate::Visibility::Private),
    }
}

// ============================================================================
// Expansion
// ============================================================================

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    let krate = crate_path(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => data.fields.clone(),
        Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span(),
                "Reflect can only be derived for structs",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "Reflect can only be derived for structs",
            ));
        }
    };

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Reflect cannot be derived for structs with lifetime parameters",
        ));
    }

    for param in input.generics.params.iter_mut() {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(#krate::Reflect));
        }
    }

    let ident = &input.ident;
    let name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut decls = Vec::new();
    let mut zeroed = Vec::new();
    let mut refs = Vec::new();
    let mut muts = Vec::new();

    for (i, field) in fields.iter().enumerate() {
        let attrs = field_attrs(field)?;
        let ty = &field.ty;
        let member = match &field.ident {
            Some(ident) => quote!(#ident),
            None => {
                let index = Index::from(i);
                quote!(#index)
            }
        };
        let field_name = match &field.ident {
            Some(ident) => ident.to_string(),
            None => i.to_string(),
        };
        let tag = attrs.tags.join(" ");
        let vis = visibility(&field.vis, &krate);
        let embed = attrs.embed.then(|| quote!(.embedded()));

        decls.push(quote! {
            #krate::FieldDecl::new(#field_name, <#ty as #krate::Reflect>::type_of(), #i)
                .with_tag(#tag)
                .with_visibility(#vis)
                #embed
        });
        zeroed.push(match &field.ident {
            Some(ident) => quote!(#ident: <#ty as #krate::Reflect>::zeroed()),
            None => quote!(<#ty as #krate::Reflect>::zeroed()),
        });
        refs.push(quote! {
            #i => ::core::option::Option::Some(&self.#member as &dyn #krate::Reflect)
        });
        muts.push(quote! {
            #i => ::core::option::Option::Some(&mut self.#member as &mut dyn #krate::Reflect)
        });
    }

    let zeroed = match &fields {
        Fields::Named(_) => quote!(Self { #(#zeroed),* }),
        Fields::Unnamed(_) => quote!(Self(#(#zeroed),*)),
        Fields::Unit => quote!(Self),
    };

    Ok(quote! {
        impl #impl_generics #krate::Reflect for #ident #ty_generics #where_clause {
            fn type_of() -> #krate::TypeRef {
                #krate::TypeDescriptor::new::<Self>(#krate::Kind::Struct)
                    .named(#name, ::core::module_path!())
                    .with_fields(|| ::std::vec![#(#decls),*])
                    .into_ref()
            }

            fn static_kind() -> #krate::Kind {
                #krate::Kind::Struct
            }

            fn zeroed() -> Self {
                #zeroed
            }

            fn type_ref(&self) -> #krate::TypeRef {
                <Self as #krate::Reflect>::type_of()
            }

            fn kind(&self) -> #krate::Kind {
                #krate::Kind::Struct
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            fn as_reflect(&self) -> &dyn #krate::Reflect {
                self
            }

            fn as_reflect_mut(&mut self) -> &mut dyn #krate::Reflect {
                self
            }

            fn value(&self) -> #krate::Value<'_> {
                #krate::Value::Ref(self)
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn #krate::Reflect> {
                match index {
                    #(#refs,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn #krate::Reflect> {
                match index {
                    #(#muts,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Index, LitStr, Member,
    Result as SynResult,
};

/// How a single field takes part in injection.
enum FieldMode {
    /// Resolve the field's declared type, optionally under a provider name.
    Resolve(Option<LitStr>),
    /// Recurse into an embedded struct that is itself `Injectable`.
    Embed,
}

fn field_mode(field: &syn::Field) -> SynResult<Option<FieldMode>> {
    let mut mode = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }
        match &attr.meta {
            syn::Meta::Path(_) => mode = Some(FieldMode::Resolve(None)),
            syn::Meta::List(_) => {
                let mut name = None;
                let mut embed = false;
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("embed") {
                        embed = true;
                        Ok(())
                    } else if meta.path.is_ident("name") {
                        name = Some(meta.value()?.parse::<LitStr>()?);
                        Ok(())
                    } else {
                        Err(meta.error("expected `embed` or `name = \"...\"`"))
                    }
                })?;
                if embed && name.is_some() {
                    return Err(syn::Error::new(
                        attr.span(),
                        "an embedded field cannot carry a provider name",
                    ));
                }
                mode = Some(if embed {
                    FieldMode::Embed
                } else {
                    FieldMode::Resolve(name)
                });
            }
            syn::Meta::NameValue(nv) => {
                return Err(syn::Error::new(
                    nv.span(),
                    "use #[inject] or #[inject(name = \"...\")]",
                ))
            }
        }
    }
    Ok(mode)
}

fn expand(input: DeriveInput) -> SynResult<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Injectable can only be derived for structs",
            ))
        }
    };

    let members: Vec<(Member, &syn::Field)> = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| f.ident.clone().map(|i| (Member::Named(i), f)))
            .collect(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| (Member::Unnamed(Index::from(i)), f))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let mut stmts = Vec::new();
    for (member, field) in members {
        match field_mode(field)? {
            None => {}
            Some(FieldMode::Embed) => stmts.push(quote! {
                ::strip::inject::Injectable::inject_fields(&mut self.#member, resolver)?;
            }),
            Some(FieldMode::Resolve(provider)) => {
                let provider = match provider {
                    Some(lit) => quote! { ::std::option::Option::Some(#lit) },
                    None => quote! { ::std::option::Option::None },
                };
                stmts.push(quote! {
                    self.#member = ::strip::inject::InjectField::resolve_field(resolver, #provider)?;
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::strip::inject::Injectable for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn inject_fields(
                &mut self,
                resolver: &::strip::inject::Resolver<'_>,
            ) -> ::std::result::Result<(), ::strip::inject::ResolveError> {
                #(#stmts)*
                ::std::result::Result::Ok(())
            }
        }
    })
}

/// Derive `strip::inject::Injectable`.
///
/// Fields marked `#[inject]` are resolved by their declared type (`Option<Arc<T>>`
/// or `Arc<T>`), `#[inject(name = "post")]` resolves a named provider, and
/// `#[inject(embed)]` recurses into an embedded `Injectable` (including `Box<T>`
/// and `Option<Box<T>>`). Fields are visited in declaration order.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

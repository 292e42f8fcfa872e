use convert_case::{Case, Casing};
use darling::{FromMeta, ast::NestedMeta, util::IdentString};
use proc_macro::TokenStream;
use quote::quote;
use syn::{Ident, ItemStruct, parse::Parser, punctuated::Punctuated, token::Comma};

use crate::util::{catch, has_attribute, is_option};

#[derive(Debug, FromMeta, Default)]
#[darling(default)]
struct SchemaArgs {
    database: Option<String>,
    collection: Option<String>,
    id_alias: Option<String>,
    builder_name: Option<IdentString>,
}

pub(crate) enum Kind {
    Model,
    Embedded,
}

pub(crate) fn generate_schema(_args: TokenStream, _input: TokenStream, kind: Kind) -> TokenStream {
    let attr_args = catch!(NestedMeta::parse_meta_list(_args.into()));
    let args = catch!(SchemaArgs::from_list(&attr_args));

    let input = syn::parse_macro_input!(_input as ItemStruct);
    let syn::Fields::Named(fields) = input.fields else {
        return TokenStream::from(
            darling::Error::unsupported_shape("The provided struct must have named fields.")
                .with_span(&input.ident)
                .write_errors(),
        );
    };
    if !input.generics.params.is_empty() {
        return TokenStream::from(
            darling::Error::custom("Models cannot be generic.")
                .with_span(&input.generics)
                .write_errors(),
        );
    }
    if matches!(kind, Kind::Embedded) && (args.database.is_some() || args.collection.is_some()) {
        return TokenStream::from(
            darling::Error::custom("`database` and `collection` are only valid on #[model].")
                .with_span(&input.ident)
                .write_errors(),
        );
    }

    let schema_name = input.ident.clone();
    let builder_name = args
        .builder_name
        .map(|n| n.as_str().to_string())
        .unwrap_or(format!("{}Builder", schema_name));
    let id_alias: Ident = catch!(syn::parse_str(&args.id_alias.unwrap_or(String::from("id"))));
    let collection_name = args
        .collection
        .unwrap_or(schema_name.to_string().to_case(Case::Snake));

    let mut new_fields: Punctuated<syn::Field, Comma> = Punctuated::new();
    new_fields.push(catch!(
        syn::Field::parse_named.parse(
            quote! {
                #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
                #[builder(default, setter(strip_option))]
                pub #id_alias: Option<mantle::bson::oid::ObjectId>
            }
            .into()
        )
    ));

    for field in fields.named {
        if field.ident.as_ref() == Some(&id_alias) {
            return TokenStream::from(
                darling::Error::custom(format!(
                    "`{id_alias}` is added by this attribute and must not be declared."
                ))
                .with_span(&field)
                .write_errors(),
            );
        }
        let mut new_field = field;
        if is_option(&new_field.ty) && !has_attribute(&new_field.attrs, "builder") {
            new_field.attrs.push(syn::parse_quote!(#[builder(default)]));
        }
        new_fields.push(new_field);
    }

    new_fields.push(catch!(
        syn::Field::parse_named.parse(
            quote! {
                #[serde(skip)]
                #[builder(setter(skip))]
                __snapshot: Option<mantle::bson::Document>
            }
            .into()
        )
    ));

    let attrs = input.attrs;
    let vis = input.vis;

    let model_impl = match kind {
        Kind::Embedded => quote! {},
        Kind::Model => {
            let database = match args.database {
                Some(database) => quote! { Some(#database) },
                None => quote! { None },
            };
            quote! {
                impl mantle::Model for #schema_name {
                    fn database_alias() -> Option<&'static str> {
                        #database
                    }
                    fn collection_name() -> Option<&'static str> {
                        Some(#collection_name)
                    }
                }
            }
        }
    };

    quote! {
        #(#attrs)*
        #[derive(Clone, Debug, mantle::serde::Serialize, mantle::serde::Deserialize, mantle::derive_builder::Builder)]
        #[serde(crate = "mantle::serde")]
        #[builder(name = #builder_name, crate = "mantle::derive_builder", setter(into))]
        #vis struct #schema_name {
            #new_fields
        }

        impl mantle::Embedded for #schema_name {
            fn id(&self) -> Option<mantle::bson::oid::ObjectId> {
                self.#id_alias
            }
            fn set_id(&mut self, id: Option<mantle::bson::oid::ObjectId>) {
                self.#id_alias = id;
            }
            fn snapshot(&self) -> Option<&mantle::bson::Document> {
                self.__snapshot.as_ref()
            }
            fn set_snapshot(&mut self, snapshot: Option<mantle::bson::Document>) {
                self.__snapshot = snapshot;
            }
        }

        #model_impl
    }
    .into()
}

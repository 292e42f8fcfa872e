use proc_macro::TokenStream;

mod schema;
mod util;

/// Turns a struct with named fields into a stored model.
///
/// ```ignore
/// #[model(database = "default", collection = "users")]
/// pub struct User {
///     pub username: String,
/// }
/// ```
///
/// Arguments (all optional): `database` (manager alias), `collection`
/// (defaults to the snake_case struct name), `id_alias` (name of the injected
/// id field, `id` by default) and `builder_name`.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
    schema::generate_schema(args, input, schema::Kind::Model)
}

/// Like `#[model]`, for models that are only stored nested inside other models.
#[proc_macro_attribute]
pub fn embedded(args: TokenStream, input: TokenStream) -> TokenStream {
    schema::generate_schema(args, input, schema::Kind::Embedded)
}

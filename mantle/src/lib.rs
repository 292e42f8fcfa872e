//! A small async ODM for MongoDB built on serde.
//!
//! ```ignore
//! use mantle::{Model, model};
//!
//! #[model(database = "default", collection = "users")]
//! pub struct User {
//!     pub username: String,
//!     pub age: Option<i32>,
//! }
//!
//! mantle::Manager::init_connections(settings).await?;
//! let mut user = User::create(&mantle::bson::doc! { "username": "test" }).await?;
//! user.update(&mantle::bson::doc! { "age": 30 }).await?;
//! ```

pub use mantle_common::{
    async_trait,
    bson,
    client::Client,
    collection::{Collection, ModelCursor},
    decoders::{self, BaseDecoder, Decoder},
    derive_builder,
    encoders::{self, BaseEncoder, Encoder},
    error::{Error, MResult, ValidationError},
    manager::{Manager, get_db_manager},
    model::{EncodeOptions, Embedded, Model},
    mongodb,
    serde,
    settings::{ConnectionSettings, DatabaseSettings},
    types::{self, DateTimeRange, ObjectIdStr},
};
pub use mantle_macros::{embedded, model};

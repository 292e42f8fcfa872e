pub mod client;
pub mod collection;
pub mod decoders;
pub mod encoders;
pub mod error;
pub mod manager;
pub mod model;
pub mod settings;
pub mod types;

pub use async_trait;
pub use bson;
pub use derive_builder;
pub use mongodb;
pub use serde;

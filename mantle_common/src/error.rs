use thiserror::Error;

/// Field-level validation failures raised by the types in [crate::types].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Make sure the borders do not cross")]
    RangeBorderCrossing,

    #[error("Make sure the borders do not cross")]
    DatetimeBorderCrossing,

    #[error("Not a valid ObjectId: {0:?}")]
    InvalidObjectId(String),
}

impl ValidationError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::RangeBorderCrossing => "range.border_crossing",
            Self::DatetimeBorderCrossing => "datetime_range.border_crossing",
            Self::InvalidObjectId(_) => "object_id.invalid",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Deserialization failed: {0:?}")]
    Deserialization(bson::de::Error),

    #[error("Serialization failed: {0:?}")]
    Serialization(bson::ser::Error),

    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid connection URI {0:?}: {1}")]
    InvalidUri(String, mongodb::error::Error),

    #[error("Failed to create client: {0}")]
    ClientFailure(mongodb::error::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Could not read settings from {path}: {source}")]
    SettingsIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Not found database configurations in the connection manager")]
    NoDatabaseSettings,

    #[error("The connection manager has not been initialized")]
    ManagerNotInitialized,

    #[error("Collection or db_name is not configured for model {0}")]
    NotConfigured(&'static str),

    #[error("{0:?} is not found in the connection manager databases")]
    UnknownDatabase(String),

    #[error("Not found id in current model instance")]
    MissingId,

    #[error("Expected an ObjectId as the inserted id, got {0}")]
    UnexpectedId(bson::Bson),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<bson::de::Error> for Error {
    fn from(value: bson::de::Error) -> Self {
        Self::Deserialization(value)
    }
}

impl From<bson::ser::Error> for Error {
    fn from(value: bson::ser::Error) -> Self {
        Self::Serialization(value)
    }
}

pub type MResult<T> = Result<T, Error>;

use crate::{
    collection::Collection,
    error::{Error, MResult},
    model::Model,
    settings::ConnectionSettings,
};

/// A mantle client instance, wrapping the MongoDB client and a single database name.
#[derive(Clone, Debug)]
pub struct Client {
    client: mongodb::Client,
    database: String,
}

impl Client {
    /// Returns the underlying Mongo database
    pub fn database(&self) -> mongodb::Database {
        self.client.database(&self.database)
    }

    /// Returns the database name this client is bound to
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Returns the underlying Mongo client
    pub fn inner(&self) -> &mongodb::Client {
        &self.client
    }

    /// Returns a typed [Collection] from a model type
    pub fn collection<M: Model>(&self, name: &str) -> Collection<M> {
        Collection::new(self.database().collection(name), self.clone())
    }

    /// Creates a client from a MongoDB connection string
    pub async fn connect_with_uri(uri: impl Into<String>, database: impl Into<String>) -> MResult<Self> {
        let converted = uri.into();
        let connection_str = mongodb::options::ConnectionString::parse(&converted)
            .map_err(|e| Error::InvalidUri(converted.clone(), e))?;
        let options = mongodb::options::ClientOptions::parse(connection_str)
            .await
            .map_err(|e| Error::InvalidUri(converted.clone(), e))?;
        Self::connect_with_options(options, database).await
    }

    /// Creates a client from MongoDB client options
    pub async fn connect_with_options(
        options: mongodb::options::ClientOptions,
        database: impl Into<String>,
    ) -> MResult<Self> {
        Ok(Self {
            client: mongodb::Client::with_options(options).map_err(Error::ClientFailure)?,
            database: database.into(),
        })
    }

    /// Creates a client for one configured alias
    pub async fn connect_with_settings(alias: &str, settings: &ConnectionSettings) -> MResult<Self> {
        let options = settings.client_options().await?;
        let database = settings.database_name(alias);
        tracing::info!(
            alias,
            database = %database,
            hosts = ?options.hosts,
            "configuring MongoDB connection"
        );
        Self::connect_with_options(options, database).await
    }

    /// Creates a client from an existing MongoDB client instance
    pub fn connect_with_client(client: mongodb::Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }
}

/// Allows a [Client] to be constructed from a [mongodb::Database]
impl From<mongodb::Database> for Client {
    fn from(value: mongodb::Database) -> Self {
        Self {
            client: value.client().clone(),
            database: value.name().to_string(),
        }
    }
}

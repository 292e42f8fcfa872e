//! Connection settings for the [crate::manager::Manager].
//!
//! Settings are keyed by connection alias. Every key is optional:
//!
//! ```json
//! {
//!     "default": {
//!         "NAME": "mongo-db-name",
//!         "HOST": "mongodb://localhost",
//!         "PORT": 27017,
//!         "USERNAME": "mongo_user",
//!         "PASSWORD": "mongo_password",
//!         "AUTH_SOURCE": "admin",
//!         "AUTH_MECHANISM": "SCRAM-SHA-256",
//!         "OPTIONAL_PARAMETERS": { "appName": "mantle" }
//!     },
//!     "minimal": {}
//! }
//! ```
//!
//! `minimal` connects to `mongodb://localhost:27017` and uses a database named
//! after its alias.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use mongodb::options::{AuthMechanism, ClientOptions, ConnectionString, Credential, ServerAddress};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, MResult};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;

/// Settings for a single connection alias
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ConnectionSettings {
    /// Database name; the alias is used when unset
    pub name: Option<String>,
    /// Host name, or a full `mongodb://` / `mongodb+srv://` URI
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "AUTHENTICATION_SOURCE")]
    pub auth_source: Option<String>,
    #[serde(alias = "AUTH-MECHANISM")]
    pub auth_mechanism: Option<String>,
    /// Extra connection string options, e.g. `{"replicaSet": "rs0"}`
    pub optional_parameters: BTreeMap<String, Value>,
}

impl ConnectionSettings {
    /// The database this alias points at
    pub fn database_name(&self, alias: &str) -> String {
        self.name.clone().unwrap_or_else(|| alias.to_string())
    }

    /// Renders the connection string without credentials
    pub fn connection_uri(&self) -> String {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let mut uri = if host.starts_with("mongodb://") || host.starts_with("mongodb+srv://") {
            host.to_string()
        } else {
            format!("mongodb://{host}")
        };

        let options = self
            .optional_parameters
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => format!("{key}={text}"),
                other => format!("{key}={other}"),
            })
            .collect::<Vec<_>>();
        if !options.is_empty() {
            if !uri.contains('?') {
                let after_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or("");
                if !after_scheme.contains('/') {
                    uri.push('/');
                }
                uri.push('?');
            } else if !uri.ends_with('?') && !uri.ends_with('&') {
                uri.push('&');
            }
            uri.push_str(&options.join("&"));
        }
        uri
    }

    /// Builds driver options for this alias
    pub async fn client_options(&self) -> MResult<ClientOptions> {
        let uri = self.connection_uri();
        let connection_str =
            ConnectionString::parse(&uri).map_err(|e| Error::InvalidUri(uri.clone(), e))?;
        let mut options = ClientOptions::parse(connection_str)
            .await
            .map_err(|e| Error::InvalidUri(uri.clone(), e))?;

        let port = self.port.unwrap_or(DEFAULT_PORT);
        for address in options.hosts.iter_mut() {
            if let ServerAddress::Tcp { port: host_port, .. } = address {
                host_port.get_or_insert(port);
            }
        }

        if let Some(credential) = self.credential()? {
            options.credential = Some(credential);
        }
        Ok(options)
    }

    fn credential(&self) -> MResult<Option<Credential>> {
        let Some(username) = self.username.clone() else {
            return Ok(None);
        };
        let mechanism = self
            .auth_mechanism
            .as_deref()
            .map(AuthMechanism::from_str)
            .transpose()
            .map_err(|e| Error::InvalidSettings(format!("unknown auth mechanism: {e}")))?;
        let mut credential = Credential::default();
        credential.username = Some(username);
        credential.password = self.password.clone();
        credential.source = self.auth_source.clone().filter(|source| !source.is_empty());
        credential.mechanism = mechanism;
        Ok(Some(credential))
    }
}

/// All configured aliases, in a stable order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseSettings(BTreeMap<String, ConnectionSettings>);

impl DatabaseSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an alias
    pub fn with(mut self, alias: impl Into<String>, settings: ConnectionSettings) -> Self {
        self.0.insert(alias.into(), settings);
        self
    }

    pub fn from_json_str(json: &str) -> MResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::SettingsIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Reads JSON settings from an environment variable, if it is set
    pub fn from_env(variable: &str) -> MResult<Option<Self>> {
        match std::env::var(variable) {
            Ok(raw) => Self::from_json_str(&raw).map(Some),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(Error::InvalidSettings(format!("{variable}: {e}"))),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&ConnectionSettings> {
        self.0.get(alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConnectionSettings)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<A: Into<String>> FromIterator<(A, ConnectionSettings)> for DatabaseSettings {
    fn from_iter<T: IntoIterator<Item = (A, ConnectionSettings)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(alias, settings)| (alias.into(), settings)).collect())
    }
}

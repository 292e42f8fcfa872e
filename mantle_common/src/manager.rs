//! Process-wide registry of MongoDB connections, keyed by alias.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;

use crate::{
    client::Client,
    error::{Error, MResult},
    settings::DatabaseSettings,
};

/// Global instance of the [Manager], stored in a [OnceCell]
pub(crate) static MANAGER: OnceCell<Manager> = OnceCell::new();

/// Holds one [Client] per configured alias.
///
/// Call [Manager::init_connections] once at startup; models then look their
/// database up by alias through [Manager::global].
#[derive(Clone, Debug)]
pub struct Manager {
    settings: DatabaseSettings,
    clients: BTreeMap<String, Client>,
}

impl Manager {
    /// Builds a manager that is not registered globally
    pub async fn connect(settings: DatabaseSettings) -> MResult<Self> {
        if settings.is_empty() {
            return Err(Error::NoDatabaseSettings);
        }

        let mut clients = BTreeMap::new();
        for (alias, configuration) in settings.iter() {
            let client = Client::connect_with_settings(alias, configuration).await?;
            clients.insert(alias.clone(), client);
        }

        Ok(Self { settings, clients })
    }

    /// Initializes the global manager and returns it.
    ///
    /// Only the first successful call connects; later calls return the existing
    /// instance and ignore their settings.
    pub async fn init_connections(settings: DatabaseSettings) -> MResult<&'static Manager> {
        if let Some(existing) = MANAGER.get() {
            tracing::debug!("connection manager already initialized");
            return Ok(existing);
        }

        let manager = Self::connect(settings).await?;
        if MANAGER.set(manager).is_err() {
            tracing::debug!("connection manager initialized concurrently, keeping the first instance");
        }
        MANAGER.get().ok_or(Error::ManagerNotInitialized)
    }

    /// Returns the global instance, if initialized.
    pub fn global() -> Option<&'static Manager> {
        MANAGER.get()
    }

    /// Returns the global instance or [Error::ManagerNotInitialized]
    pub fn try_global() -> MResult<&'static Manager> {
        Self::global().ok_or(Error::ManagerNotInitialized)
    }

    /// Returns the client configured under `alias`
    pub fn get(&self, alias: &str) -> Option<&Client> {
        self.clients.get(alias)
    }

    /// Returns the database configured under `alias`
    pub fn database(&self, alias: &str) -> Option<mongodb::Database> {
        self.get(alias).map(Client::database)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Returns the initialized global manager, if any
pub fn get_db_manager() -> Option<&'static Manager> {
    Manager::global()
}

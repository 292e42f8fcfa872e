use chrono::{DateTime, Utc};
use mantle::{
    ConnectionSettings, DatabaseSettings, Embedded, MResult, Manager, Model, bson::doc, embedded,
    model,
};
use tracing_subscriber::EnvFilter;

#[embedded]
pub struct Tag {
    pub name: String,
}

#[model(database = "default", collection = "sessions")]
pub struct Session {
    pub username: String,
    #[serde(with = "mantle::types::datetime")]
    pub started: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub expires_in: Option<i64>,
}

fn settings() -> MResult<DatabaseSettings> {
    Ok(DatabaseSettings::from_env("MANTLE_DATABASES")?.unwrap_or_else(|| {
        DatabaseSettings::new().with(
            "default",
            ConnectionSettings {
                name: Some("mantle_testing".to_string()),
                ..Default::default()
            },
        )
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let manager = Manager::init_connections(settings()?).await?;
    tracing::info!(aliases = ?manager.aliases().collect::<Vec<_>>(), "connected");

    let mut session = SessionBuilder::default()
        .username("dax")
        .started(Utc::now())
        .tags(vec![TagBuilder::default().name("demo").build()?])
        .build()?;
    session.save().await?;
    tracing::info!(id = ?session.id(), "created session");

    session.expires_in = Some(3600);
    session.save().await?;
    session.reload().await?;
    tracing::info!(json = %session.to_json()?, "reloaded session");

    let count = Session::count(Some(doc! { "username": "dax" })).await?;
    tracing::info!(count, "sessions for user");

    let deleted = session.delete().await?;
    tracing::info!(deleted, "deleted session");
    Ok(())
}

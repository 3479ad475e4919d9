use crate::entities::{file_access_logs, shared_files};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema, Statement,
};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    info!("📂 Database: {}", redact_url(&db_url));

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(50)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Create tables and indexes from the entities if they are missing.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🔄 Running SeaORM schema sync...");
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let stmts = vec![
        schema
            .create_table_from_entity(shared_files::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(file_access_logs::Entity)
            .if_not_exists()
            .to_owned(),
    ];

    for stmt in stmts {
        db.execute(builder.build(&stmt)).await?;
    }

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_shared_files_sweep ON shared_files(is_expired, expires_at);",
        "CREATE INDEX IF NOT EXISTS idx_shared_files_owner ON shared_files(owner_id);",
        "CREATE INDEX IF NOT EXISTS idx_file_access_logs_file ON file_access_logs(file_id);",
    ] {
        db.execute(Statement::from_string(builder, index.to_string()))
            .await?;
    }

    Ok(())
}

/// Hide credentials in a connection string before logging it.
fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

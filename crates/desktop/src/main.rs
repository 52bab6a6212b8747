//! `expenseshare` entry point: open (or create) the configured database.

use anyhow::Context;

use expenseshare_desktop::{AppConfig, ExpenseShare};
use expenseshare_infra::{AccountStore, EventStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    expenseshare_observability::init_with(config.log_format);

    let store = SqliteStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;
    let app = ExpenseShare::new(store);

    let users = app.store().list_users().await?.len();
    let groups = app.store().list_streams().await?.len();
    tracing::info!(
        db_path = %config.db_path.display(),
        default_currency = %config.default_currency,
        users,
        groups,
        "expenseshare database ready"
    );

    app.store().close().await;
    Ok(())
}

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod notify;
mod rates;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "gruzzolo={level},server={level},engine={level},scheduler={level}",
            level = settings.app.level
        ))
        .init();

    let mut batch_jobs = None;
    if let Some(server) = settings.server {
        let db = parse_database(&server.database).await?;

        let mut builder = engine::Engine::builder().database(db.clone());
        if let Some(rates) = settings.rates {
            builder = builder.rates(Arc::new(rates::ExchangeRateApi::new(
                rates.api_key,
                rates.base_url,
            )));
        }
        if let Some(notifier) = settings.notifier {
            builder = builder.notifier(Arc::new(notify::WebhookNotifier::new(
                notifier.webhook_url,
            )));
        }
        let engine = Arc::new(builder.build());

        let scheduler_enabled = settings
            .scheduler
            .map(|scheduler| scheduler.enabled)
            .unwrap_or(true);
        if scheduler_enabled {
            tracing::info!("Starting scheduler...");
            batch_jobs = Some(scheduler::Scheduler::spawn(engine.clone()));
        }

        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(engine, db, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }
    if let Some(scheduler) = batch_jobs {
        scheduler.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use stockhouse_auth::Actor;
use stockhouse_infra::LedgerService;
use stockhouse_infra::store::{InMemoryLedgerStore, PostgresLedgerStore, StoreError};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct AppServices {
    ledger: Arc<LedgerService>,
}

impl AppServices {
    pub fn in_memory() -> Self {
        Self {
            ledger: Arc::new(LedgerService::new(Arc::new(InMemoryLedgerStore::new()))),
        }
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }
}

/// Pick the store from configuration: Postgres (migrated on startup) or in-memory.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let Some(db) = &config.database else {
        tracing::info!("using in-memory ledger store");
        return Ok(AppServices::in_memory());
    };

    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&db.url)
        .await?;
    let store = PostgresLedgerStore::new(pool);
    store.migrate().await?;
    tracing::info!(max_connections = db.max_connections, "using postgres ledger store");

    Ok(AppServices {
        ledger: Arc::new(LedgerService::new(Arc::new(store))),
    })
}

/// Server-sent events for the committed changes relevant to `actor`.
pub fn actor_sse_stream(
    services: Arc<AppServices>,
    actor: Actor,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.ledger().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(notice) if notice.concerns(&actor) => {
            let data = serde_json::to_string(&notice).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(notice.topic()).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

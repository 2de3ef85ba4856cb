// Entry point of the marketplace moderation service.
//
// **Architecture Overview:**
// - `core/` = Business logic (offers, sales, reviews, disputes, metrics)
// - `infra/` = Implementations of core ports (storage, WhatsApp, identity)
// - `dashboard/` = HTTP adapter the admin dashboard and the site call
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the notification worker
// 4. Serve the HTTP API until shutdown

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "dashboard/dashboard_layer.rs"]
mod dashboard;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, StoreBackend};
use crate::core::identity::IdentityProvider;
use crate::core::moderation::ModerationConfig;
use crate::core::notifications::{DeliverySettings, NotificationGateway, Notifier};
use crate::core::store::{Entities, EntityStore};
use crate::dashboard::AppState;
use crate::infra::identity::JwtIdentityProvider;
use crate::infra::store::{InMemoryEntityStore, SqliteEntityStore};
use crate::infra::whatsapp::{DisabledGateway, EvolutionClient};

const RECENT_SALES_WINDOW: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let store: Arc<dyn EntityStore> = match config.store_backend {
        StoreBackend::Sqlite => {
            // Keep runtime databases in a dedicated folder so the repo root stays tidy.
            if let Some(dir) = Path::new(&config.database_path).parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
            }
            Arc::new(
                SqliteEntityStore::new(&config.database_path)
                    .await
                    .context("Failed to initialize SQLite store")?,
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(InMemoryEntityStore::new())
        }
    };
    let entities = Entities::new(store);

    let gateway: Arc<dyn NotificationGateway> = match &config.whatsapp {
        Some(whatsapp) => Arc::new(
            EvolutionClient::new(&whatsapp.api_url, &whatsapp.api_key, &whatsapp.instance)
                .context("Failed to create WhatsApp client")?,
        ),
        None => {
            tracing::warn!("WhatsApp gateway not configured; notifications will be dropped");
            Arc::new(DisabledGateway)
        }
    };
    if config.admin_contact.is_none() {
        tracing::warn!("ADMIN_WHATSAPP not set; administrator notices will be dropped");
    }

    let (notifier, delivery) = Notifier::spawn(
        gateway,
        DeliverySettings {
            admin_contact: config.admin_contact.clone(),
            currency_symbol: config.currency_symbol.clone(),
        },
    );

    let identity: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(
        &config.jwt_secret,
        &config.jwt_audience,
        entities.clone(),
    ));

    let state = AppState::new(
        entities,
        notifier,
        ModerationConfig::default(),
        RECENT_SALES_WINDOW,
        identity,
    );

    // ========================================================================
    // HTTP SERVER
    // ========================================================================

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Marketplace moderation API listening");

    axum::serve(listener, dashboard::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // The router (and with it every Notifier) is gone; let the queue drain.
    if let Err(e) = delivery.await {
        tracing::error!("Notification worker panicked: {}", e);
    }
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

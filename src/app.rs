//! Process bootstrap: connect storage, register modules, initialize schema, serve.

use anyhow::Context;
use axum::Router;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules;

/// A fully initialized service, ready to serve requests.
///
/// Any failure while building it is a startup error: the listener is never
/// bound for a half-initialized service.
pub struct Application {
    settings: Settings,
    pool: SqlitePool,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the configured database and initialize every module
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookstore_db::connect(&settings.database).await?;
        Self::with_pool(settings, pool).await
    }

    /// Initialize every module against an already open pool
    pub async fn with_pool(settings: Settings, pool: SqlitePool) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &pool);

        let applied = bookstore_db::apply_migrations(&pool, &registry.collect_migrations())
            .await
            .context("schema initialization failed")?;
        tracing::info!(applied, "schema initialized");

        let ctx = InitCtx {
            settings: &settings,
        };
        registry.init_modules(&ctx).await?;

        Ok(Self {
            settings,
            pool,
            registry,
        })
    }

    /// Apply pending migrations and return how many ran
    pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
        let pool = bookstore_db::connect(&settings.database).await?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &pool);

        let applied = bookstore_db::apply_migrations(&pool, &registry.collect_migrations()).await?;
        pool.close().await;
        Ok(applied)
    }

    /// The assembled HTTP router, without binding a listener
    pub async fn router(&self) -> anyhow::Result<Router> {
        bookstore_http::build_router(&self.registry, &self.settings).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start modules, serve until shutdown, then stop modules and close the pool
    pub async fn run(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.start_modules(&ctx).await?;

        let served = bookstore_http::start_server(&self.registry, &self.settings).await;

        self.registry.stop_modules().await?;
        self.pool.close().await;

        tracing::info!("bookstore shut down");
        served
    }
}

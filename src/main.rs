use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use psp_onboarding::accounts::{AccountService, HttpAccountService, InMemoryAccountService};
use psp_onboarding::config::PortalConfig;
use psp_onboarding::onboarding::{AppState, TaskRegistry, onboarding_routes};
use psp_onboarding::provider::{HttpPspProvider, PspProvider};
use psp_onboarding::store::{LibSqlBackend, SessionStore, spawn_purge_loop};

/// Account seeded into the in-memory account service.
const DEV_ACCOUNT_ID: &str = "dev";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PortalConfig::from_env().context("loading configuration")?;

    eprintln!("PSP onboarding portal v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening: http://0.0.0.0:{}", config.port);
    eprintln!("   PSP API: {}", config.psp_api_url);

    // ── Session store ───────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = if config.db_path == ":memory:" {
        Arc::new(LibSqlBackend::new_memory().await?)
    } else {
        Arc::new(
            LibSqlBackend::new_local(Path::new(&config.db_path))
                .await
                .with_context(|| format!("opening session store at {}", config.db_path))?,
        )
    };
    eprintln!("   Sessions: {}", config.db_path);
    spawn_purge_loop(Arc::clone(&store), config.draft_max_age);

    // ── Account service ─────────────────────────────────────────────────
    let accounts: Arc<dyn AccountService> = match &config.accounts_url {
        Some(url) => {
            eprintln!("   Accounts: {url}");
            Arc::new(HttpAccountService::new(url.as_str(), config.request_timeout)?)
        }
        None => {
            tracing::warn!("ACCOUNTS_URL not set, using in-memory account service");
            let memory = InMemoryAccountService::new();
            memory.insert_account(DEV_ACCOUNT_ID).await;
            memory
                .start_onboarding(DEV_ACCOUNT_ID, TaskRegistry::standard())
                .await;
            eprintln!("   Accounts: in-memory (account '{DEV_ACCOUNT_ID}')");
            memory
        }
    };

    let provider: Arc<dyn PspProvider> = Arc::new(HttpPspProvider::new(
        config.psp_api_url.as_str(),
        config.psp_api_key.clone(),
        config.request_timeout,
    )?);

    let app = onboarding_routes(AppState::new(store, accounts, provider));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    tracing::info!(port = config.port, "Onboarding portal started");
    axum::serve(listener, app).await?;

    Ok(())
}

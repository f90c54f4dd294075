use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

use token_steward::acquisition::coordinator::{AcquisitionConfig, TokenCoordinator};
use token_steward::acquisition::region::Region;
use token_steward::config::loader::load_config;
use token_steward::credentials::cipher::FallbackEncryptor;
use token_steward::credentials::set::CredentialSet;
use token_steward::credentials::store::CredentialStore;
use token_steward::renewal::manager::{RenewalManager, RenewalSettings};
use token_steward::server;
use token_steward::status::spawn_status_poller;
use token_steward::utils::logging;
use token_steward::utils::logging::LogLevel;
use token_steward::validator::{TokenValidator, ValidatorConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-steward.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = load_config(&args.config)?;
    logging::run(&service_config, args.log_level)?;

    let settings = &service_config.settings;

    // -------------------------------
    // 2. Credential store (session-scoped encryption)
    // -------------------------------

    let store = Arc::new(CredentialStore::new(Arc::new(
        FallbackEncryptor::with_session_cipher(),
    )));

    if let Some(creds) = &service_config.credentials {
        let set = CredentialSet::new(
            creds.client_id.clone(),
            creds.client_secret.clone(),
            creds.tenant_id.clone(),
            Region::parse(&creds.region),
        )?;
        store.save(&set).await?;
        info!("credentials bootstrapped from config");
    } else {
        warn!("no credentials configured, direct exchange will be unavailable until saved");
    }

    // -------------------------------
    // 3. Acquisition coordinator
    // -------------------------------

    let client = Client::new();

    let validator = TokenValidator::new(ValidatorConfig {
        expected_issuer: settings.issuer.clone(),
        expected_audience: settings.audience.clone(),
        clock_tolerance_seconds: settings.clock_tolerance_seconds.unwrap_or(0),
    });

    let acquisition = AcquisitionConfig {
        safety_buffer_seconds: settings.safety_buffer_seconds.unwrap_or(300),
        max_age_seconds: settings.max_token_age_seconds.unwrap_or(3600),
        assumed_lifetime_seconds: settings.assumed_lifetime_seconds.unwrap_or(3600) as i64,
        exchange_timeout: Duration::from_secs(settings.exchange_timeout_seconds.unwrap_or(30)),
        broker_url: settings.broker_url.clone(),
        direct_token_url: None,
    };

    let coordinator = TokenCoordinator::new(client, Arc::clone(&store), validator, acquisition);

    // -------------------------------
    // 4. Proactive renewal manager
    // -------------------------------

    let renewal_timing = settings.renewal.clone();
    let renewal_settings = RenewalSettings {
        check_interval: Duration::from_secs(
            renewal_timing
                .as_ref()
                .and_then(|r| r.check_interval_seconds)
                .unwrap_or(300),
        ),
        renewal_buffer_seconds: renewal_timing
            .as_ref()
            .and_then(|r| r.renewal_buffer_seconds)
            .unwrap_or(900) as i64,
        retry_delay: Duration::from_secs(
            renewal_timing
                .as_ref()
                .and_then(|r| r.retry_delay_seconds)
                .unwrap_or(60),
        ),
    };

    let manager = RenewalManager::new(coordinator.clone(), renewal_settings);
    let renewal_loop = manager.spawn();

    // -------------------------------
    // 5. Status projection for displays/telemetry
    // -------------------------------

    let status_rx = spawn_status_poller(Arc::clone(&manager), Duration::from_secs(30)).await;
    info!(initial_status = ?status_rx.borrow().status, "status projection running");

    // -------------------------------
    // 6. Status/metrics HTTP server
    // -------------------------------

    info!("service starting ...");
    let http_server = server::routes::start(settings, Arc::clone(&manager));

    tokio::select! {
        result = http_server => result?,
        _ = renewal_loop => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    Ok(())
}

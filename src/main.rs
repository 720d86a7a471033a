//! MATCHDAY: daily football matches digest
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the providers and channels, then runs one
//! aggregate→compose→dispatch pass for the local day.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use matchday::config::{self, ChannelSettings, ProviderSettings, Settings};
use matchday::engine::aggregator::Aggregator;
use matchday::http::{HttpClient, Transport};
use matchday::notify::composer::MessageComposer;
use matchday::notify::discord::DiscordNotifier;
use matchday::notify::telegram::TelegramNotifier;
use matchday::notify::{Dispatcher, Notifier};
use matchday::providers::football_data::{FootballDataProvider, AUTH_HEADER};
use matchday::providers::uol::UolProvider;
use matchday::providers::MatchProvider;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("MATCHDAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    let settings = cfg.validate().context("Invalid configuration")?;
    info!(
        config = %config_path,
        providers = settings.providers.len(),
        channels = settings.channels.len(),
        competitions = settings.competitions.len(),
        concurrency = settings.concurrency,
        failure_policy = ?settings.failure_policy,
        "MATCHDAY starting up"
    );

    // -- Initialise components -------------------------------------------

    let aggregator = build_aggregator(&settings)?;
    let dispatcher = build_dispatcher(&settings)?;
    let composer = MessageComposer::new(settings.local_offset);

    let today = Utc::now().with_timezone(&settings.local_offset).date_naive();

    // -- Run one pass ----------------------------------------------------

    match run_pass(&aggregator, &dispatcher, &composer, &settings, today).await {
        Ok(()) => {
            info!(date = %today, "Digest delivered");
            Ok(())
        }
        Err(e) => {
            let detail = format!("{e:#}");
            error!(date = %today, error = %detail, "Digest pass failed");
            if let Err(notice_err) = dispatcher.dispatch(&composer.failure(&detail)).await {
                warn!(error = %notice_err, "Failure notice could not be delivered");
            }
            Err(e)
        }
    }
}

async fn run_pass(
    aggregator: &Aggregator,
    dispatcher: &Dispatcher,
    composer: &MessageComposer,
    settings: &Settings,
    today: NaiveDate,
) -> Result<()> {
    let aggregation = aggregator.aggregate(today).await;
    let unavailable = aggregation.failed_competitions();
    let matches = aggregation
        .into_result(settings.failure_policy)
        .context("Failed to aggregate matches")?;

    let message = composer.compose(today, &matches, &unavailable);
    dispatcher
        .dispatch(&message)
        .await
        .context("Failed to send digest")?;
    Ok(())
}

fn build_aggregator(settings: &Settings) -> Result<Aggregator> {
    let mut providers: Vec<Arc<dyn MatchProvider>> = Vec::with_capacity(settings.providers.len());

    for provider in &settings.providers {
        match provider {
            ProviderSettings::Uol { base_url } => {
                let transport: Arc<dyn Transport> =
                    Arc::new(HttpClient::with_timeout(base_url.as_str(), settings.http_timeout)?);
                providers.push(Arc::new(UolProvider::new(transport, settings.local_offset)));
            }
            ProviderSettings::FootballData {
                base_url,
                auth_token,
                competitions,
            } => {
                let transport: Arc<dyn Transport> = Arc::new(
                    HttpClient::with_timeout(base_url.as_str(), settings.http_timeout)?
                        .with_header(AUTH_HEADER, auth_token)?,
                );
                let mut fd = FootballDataProvider::new(transport);
                if !competitions.is_empty() {
                    fd = fd.with_competitions(competitions);
                }
                providers.push(Arc::new(fd));
            }
        }
    }

    let mut aggregator = Aggregator::new(providers)
        .with_registry(settings.competitions.clone())
        .with_concurrency(settings.concurrency);
    if let Some(deadline) = settings.task_timeout {
        aggregator = aggregator.with_deadline(deadline);
    }
    Ok(aggregator)
}

fn build_dispatcher(settings: &Settings) -> Result<Dispatcher> {
    let mut channels: Vec<Arc<dyn Notifier>> = Vec::with_capacity(settings.channels.len());

    for channel in &settings.channels {
        match channel {
            ChannelSettings::Discord { webhook_url } => {
                let transport: Arc<dyn Transport> =
                    Arc::new(HttpClient::with_secret_url(webhook_url, settings.http_timeout)?);
                channels.push(Arc::new(DiscordNotifier::new(transport)));
            }
            ChannelSettings::Telegram { bot_token, chat_id } => {
                let endpoint = TelegramNotifier::endpoint(bot_token);
                let transport: Arc<dyn Transport> =
                    Arc::new(HttpClient::with_secret_url(&endpoint, settings.http_timeout)?);
                channels.push(Arc::new(TelegramNotifier::new(transport, chat_id.clone())));
            }
        }
    }

    let mut dispatcher = Dispatcher::new(channels);
    if let Some(deadline) = settings.task_timeout {
        dispatcher = dispatcher.with_deadline(deadline);
    }
    Ok(dispatcher)
}

/// Initialise tracing subscriber with env filter.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("matchday=info"));

    let json_logging = std::env::var("MATCHDAY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

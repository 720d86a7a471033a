//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (tokens, webhook URLs) are referenced by env-var name in the
//! config and resolved once at startup by [`AppConfig::validate`].

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::aggregator::{FailurePolicy, DEFAULT_CONCURRENCY};
use crate::providers::{football_data, uol};
use crate::types::Competition;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub notifiers: NotifiersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Offset of the local day the digest covers (Brasília is -3).
    pub utc_offset_hours: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { utc_offset_hours: -3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AggregatorConfig {
    pub concurrency: usize,
    /// Deadline for one competition (all providers). Zero disables it.
    pub task_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    /// Registry subset to query; empty means every competition.
    pub competitions: Vec<Competition>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            task_timeout_secs: 120,
            failure_policy: FailurePolicy::default(),
            competitions: Vec::new(),
        }
    }
}

/// Provider identifiers usable in `providers.priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Uol,
    FootballData,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Highest priority first. Disabled providers are skipped.
    pub priority: Vec<ProviderKind>,
    pub uol: UolConfig,
    pub football_data: FootballDataConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            priority: vec![ProviderKind::Uol, ProviderKind::FootballData],
            uol: UolConfig::default(),
            football_data: FootballDataConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UolConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for UolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: uol::BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FootballDataConfig {
    pub enabled: bool,
    pub base_url: String,
    pub auth_token_env: String,
    /// Restrict to these competitions; empty means all it covers.
    pub competitions: Vec<Competition>,
}

impl Default for FootballDataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: football_data::BASE_URL.to_string(),
            auth_token_env: "AUTH_TOKEN".to_string(),
            competitions: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifiersConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook_url_env: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url_env: "DISCORD_WEBHOOK_URL".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token_env: String,
    pub chat_id_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated settings
// ---------------------------------------------------------------------------

/// A provider ready to be built, in priority order.
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Uol {
        base_url: String,
    },
    FootballData {
        base_url: String,
        auth_token: SecretString,
        competitions: Vec<Competition>,
    },
}

/// A notification channel ready to be built.
#[derive(Debug, Clone)]
pub enum ChannelSettings {
    Discord { webhook_url: SecretString },
    Telegram { bot_token: SecretString, chat_id: SecretString },
}

/// Everything `main` needs, checked and with secrets resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub local_offset: FixedOffset,
    pub http_timeout: Duration,
    pub concurrency: usize,
    pub task_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
    pub competitions: Vec<Competition>,
    pub providers: Vec<ProviderSettings>,
    pub channels: Vec<ChannelSettings>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    fn resolve_secret(env_name: &str) -> Result<SecretString> {
        Self::resolve_env(env_name).map(SecretString::new)
    }

    /// Check the configuration and resolve every secret it references.
    pub fn validate(&self) -> Result<Settings> {
        self.validate_with(Self::resolve_secret)
    }

    /// `validate` with a custom secret lookup (tests).
    pub fn validate_with<F>(&self, resolve: F) -> Result<Settings>
    where
        F: Fn(&str) -> Result<SecretString>,
    {
        if self.aggregator.concurrency == 0 {
            bail!("aggregator.concurrency must be at least 1");
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be at least 1");
        }

        let local_offset = self
            .schedule
            .utc_offset_hours
            .checked_mul(3600)
            .filter(|_| self.schedule.utc_offset_hours.abs() <= 14)
            .and_then(FixedOffset::east_opt)
            .with_context(|| {
                format!(
                    "schedule.utc_offset_hours out of range: {}",
                    self.schedule.utc_offset_hours
                )
            })?;

        let mut providers = Vec::new();
        for kind in &self.providers.priority {
            let settings = match kind {
                ProviderKind::Uol if self.providers.uol.enabled => ProviderSettings::Uol {
                    base_url: self.providers.uol.base_url.clone(),
                },
                ProviderKind::FootballData if self.providers.football_data.enabled => {
                    let fd = &self.providers.football_data;
                    ProviderSettings::FootballData {
                        base_url: fd.base_url.clone(),
                        auth_token: resolve(&fd.auth_token_env)
                            .context("football-data.org auth token")?,
                        competitions: fd.competitions.clone(),
                    }
                }
                _ => continue,
            };
            if providers.iter().any(|p| same_provider(p, &settings)) {
                bail!("providers.priority lists {kind:?} more than once");
            }
            providers.push(settings);
        }
        if providers.is_empty() {
            bail!("no match provider enabled");
        }

        let mut channels = Vec::new();
        let discord = &self.notifiers.discord;
        if discord.enabled {
            channels.push(ChannelSettings::Discord {
                webhook_url: resolve(&discord.webhook_url_env).context("Discord webhook URL")?,
            });
        }
        let telegram = &self.notifiers.telegram;
        if telegram.enabled {
            channels.push(ChannelSettings::Telegram {
                bot_token: resolve(&telegram.bot_token_env).context("Telegram bot token")?,
                chat_id: resolve(&telegram.chat_id_env).context("Telegram chat id")?,
            });
        }
        if channels.is_empty() {
            bail!("no notification channel enabled");
        }

        let competitions = if self.aggregator.competitions.is_empty() {
            Competition::ALL.to_vec()
        } else {
            let mut chosen = self.aggregator.competitions.clone();
            chosen.sort();
            chosen.dedup();
            chosen
        };

        Ok(Settings {
            local_offset,
            http_timeout: Duration::from_secs(self.http.timeout_secs),
            concurrency: self.aggregator.concurrency,
            task_timeout: (self.aggregator.task_timeout_secs > 0)
                .then(|| Duration::from_secs(self.aggregator.task_timeout_secs)),
            failure_policy: self.aggregator.failure_policy,
            competitions,
            providers,
            channels,
        })
    }
}

fn same_provider(a: &ProviderSettings, b: &ProviderSettings) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

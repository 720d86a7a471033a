//! Multi-provider match aggregator.
//!
//! For every competition in the registry, asks the providers in priority
//! order and keeps the first non-empty answer. Competitions are resolved
//! concurrently through [`FanOut`]; a provider error moves on to the next
//! provider instead of abandoning the competition.

use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::fanout::{CompositeError, FanOut, TaskError};
use crate::providers::MatchProvider;
use crate::types::{ApiError, Competition, Match, ResultSet};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Competitions resolved at the same time. Keeps the providers from
/// receiving one request per competition in a single burst.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// What a pass with failed competitions turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep what was found; fail only when nothing was found and
    /// something failed.
    #[default]
    Partial,
    /// Any failed competition fails the whole pass.
    AllOrNothing,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One provider's failure for one competition.
#[derive(Debug, thiserror::Error)]
#[error("{provider}: {error}")]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ApiError,
}

/// A competition for which no provider produced matches and at least one
/// provider failed.
#[derive(Debug, thiserror::Error)]
#[error("list matches to {competition}: {cause}")]
pub struct CategoryError {
    pub competition: Competition,
    pub cause: TaskError<CompositeError<ProviderFailure>>,
}

pub type AggregationError = CompositeError<CategoryError>;

// ---------------------------------------------------------------------------
// Aggregation result
// ---------------------------------------------------------------------------

/// Everything one pass produced: the matches found and the competitions
/// that failed. Both can be non-empty.
#[derive(Debug)]
pub struct Aggregation {
    pub matches: ResultSet,
    pub failures: Vec<CategoryError>,
}

impl Aggregation {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Competitions that could not be fetched, in registry order.
    pub fn failed_competitions(&self) -> Vec<Competition> {
        self.failures.iter().map(|f| f.competition).collect()
    }

    /// Apply `policy` to decide whether this pass is usable.
    pub fn into_result(self, policy: FailurePolicy) -> Result<ResultSet, AggregationError> {
        let fatal = match policy {
            FailurePolicy::AllOrNothing => !self.failures.is_empty(),
            FailurePolicy::Partial => self.matches.is_empty() && !self.failures.is_empty(),
        };

        if fatal {
            return match CompositeError::from_errors(self.failures) {
                Some(composite) => Err(composite),
                None => Ok(self.matches),
            };
        }

        for failure in &self.failures {
            warn!(
                competition = %failure.competition,
                error = %failure.cause,
                "Competition unavailable, continuing with partial results"
            );
        }
        Ok(self.matches)
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct Aggregator {
    /// Highest priority first.
    providers: Arc<[Arc<dyn MatchProvider>]>,
    registry: Vec<Competition>,
    fan_out: FanOut,
}

impl Aggregator {
    /// Aggregate the full registry with the default concurrency.
    pub fn new(providers: Vec<Arc<dyn MatchProvider>>) -> Self {
        Self {
            providers: providers.into(),
            registry: Competition::ALL.to_vec(),
            fan_out: FanOut::new(DEFAULT_CONCURRENCY),
        }
    }

    pub fn with_registry(mut self, registry: Vec<Competition>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        let deadline = self.fan_out.deadline();
        self.fan_out = FanOut::new(limit);
        if let Some(deadline) = deadline {
            self.fan_out = self.fan_out.with_deadline(deadline);
        }
        self
    }

    /// Bound the time spent on one competition, all providers included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.fan_out = self.fan_out.with_deadline(deadline);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run one pass over the registry for local day `date`.
    pub async fn aggregate(&self, date: NaiveDate) -> Aggregation {
        info!(
            date = %date,
            competitions = self.registry.len(),
            providers = ?self.provider_names(),
            concurrency = self.fan_out.limit(),
            "Starting aggregation pass"
        );

        let providers = Arc::clone(&self.providers);
        let report = self
            .fan_out
            .run(self.registry.clone(), move |competition| {
                let providers = Arc::clone(&providers);
                async move { resolve_competition(&providers, competition, date).await }
            })
            .await;

        let mut matches = ResultSet::new();
        let mut failures = Vec::new();
        for (competition, slot) in self.registry.iter().copied().zip(report.into_slots()) {
            match slot {
                Ok(found) if !found.is_empty() => {
                    matches.insert(competition, found);
                }
                Ok(_) => {}
                Err(cause) => failures.push(CategoryError { competition, cause }),
            }
        }

        info!(
            competitions_with_matches = matches.len(),
            matches = matches.values().map(Vec::len).sum::<usize>(),
            failed = failures.len(),
            "Aggregation pass complete"
        );

        Aggregation { matches, failures }
    }
}

/// Walk the providers in priority order until one returns matches.
///
/// Unsupported providers are skipped silently. Errors are kept and only
/// reported when no later provider recovers.
async fn resolve_competition(
    providers: &[Arc<dyn MatchProvider>],
    competition: Competition,
    date: NaiveDate,
) -> Result<Vec<Match>, CompositeError<ProviderFailure>> {
    let mut failures = Vec::new();

    for provider in providers {
        if !provider.contains(competition) {
            continue;
        }

        debug!(competition = %competition, provider = provider.name(), "Fetching matches");

        match provider.list_matches(competition, date).await {
            Ok(found) if !found.is_empty() => {
                for failure in &failures {
                    warn!(
                        competition = %competition,
                        recovered_by = provider.name(),
                        error = %failure,
                        "Provider failed, fell back to next provider"
                    );
                }
                return Ok(found);
            }
            Ok(_) => {
                debug!(competition = %competition, provider = provider.name(), "No matches");
            }
            Err(error) => {
                warn!(
                    competition = %competition,
                    provider = provider.name(),
                    error = %error,
                    "Provider failed"
                );
                failures.push(ProviderFailure {
                    provider: provider.name().to_string(),
                    error,
                });
            }
        }
    }

    match CompositeError::from_errors(failures) {
        Some(composite) => Err(composite),
        None => Ok(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

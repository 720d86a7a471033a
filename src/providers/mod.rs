//! Match data providers.
//!
//! Defines the `MatchProvider` trait and the implementations for:
//! - UOL Esporte: one JSON document with every upcoming/recent game
//! - football-data.org: per-competition REST endpoint (auth token)

pub mod football_data;
pub mod uol;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::{ApiError, Competition, Match};

/// A source that can list the matches of some competitions on a given day.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Provider name for logging and error context.
    fn name(&self) -> &str;

    /// Whether this provider knows the competition at all. Pure lookup,
    /// never touches the network.
    fn contains(&self, competition: Competition) -> bool;

    /// Matches of `competition` on local day `date`. An empty list means
    /// the provider has nothing for that day.
    async fn list_matches(
        &self,
        competition: Competition,
        date: NaiveDate,
    ) -> Result<Vec<Match>, ApiError>;
}

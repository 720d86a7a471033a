//! football-data.org v4 integration.
//!
//! API docs: https://docs.football-data.org/general/v4/index.html
//! Base URL: https://api.football-data.org
//! Auth: `x-auth-token` header (set on the injected transport).
//! Free tier: 10 requests/minute, which is why this provider sits behind
//! UOL in the default priority order.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::MatchProvider;
use crate::http::Transport;
use crate::types::{ApiError, Competition, Match};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const BASE_URL: &str = "https://api.football-data.org";
pub const AUTH_HEADER: &str = "x-auth-token";
const PROVIDER_NAME: &str = "FootballData";

/// Placeholder for knockout fixtures whose sides are not decided yet.
const UNDECIDED_TEAM: &str = "A definir";

/// football-data.org competition codes covered by the free tier.
const COMPETITION_CODES: &[(Competition, &str)] = &[
    (Competition::UefaChampionsLeague, "CL"),
    (Competition::Bundesliga, "BL1"),
    (Competition::LaLiga, "PD"),
    (Competition::PremierLeague, "PL"),
    (Competition::Italiano, "SA"),
    (Competition::Ligue1, "FL1"),
    (Competition::LigaPortuguesa, "PPL"),
    (Competition::Brasileirao, "BSA"),
    (Competition::Libertadores, "CLI"),
];

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<FdMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdMatch {
    utc_date: DateTime<Utc>,
    home_team: FdTeam,
    away_team: FdTeam,
    #[serde(default)]
    score: FdScore,
}

#[derive(Debug, Deserialize)]
struct FdTeam {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdScore {
    #[serde(default)]
    full_time: FdFullTime,
}

#[derive(Debug, Default, Deserialize)]
struct FdFullTime {
    #[serde(default)]
    home: Option<u32>,
    #[serde(default)]
    away: Option<u32>,
}

impl FdTeam {
    fn into_name(self) -> String {
        self.name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNDECIDED_TEAM.to_string())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct FootballDataProvider {
    transport: Arc<dyn Transport>,
    /// Subset of `COMPETITION_CODES` this instance answers for.
    codes: Vec<(Competition, &'static str)>,
}

impl FootballDataProvider {
    /// Provider answering for every competition football-data.org covers.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            codes: COMPETITION_CODES.to_vec(),
        }
    }

    /// Restrict the provider to `only`. Competitions the API does not
    /// cover are ignored.
    pub fn with_competitions(mut self, only: &[Competition]) -> Self {
        self.codes.retain(|(competition, _)| only.contains(competition));
        self
    }

    fn code(&self, competition: Competition) -> Option<&'static str> {
        self.codes
            .iter()
            .find(|(known, _)| *known == competition)
            .map(|(_, code)| *code)
    }

    fn matches_path(code: &str, date: NaiveDate) -> String {
        let day = date.format("%Y-%m-%d");
        format!("/v4/competitions/{code}/matches?dateFrom={day}&dateTo={day}")
    }
}

#[async_trait]
impl MatchProvider for FootballDataProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn contains(&self, competition: Competition) -> bool {
        self.code(competition).is_some()
    }

    async fn list_matches(
        &self,
        competition: Competition,
        date: NaiveDate,
    ) -> Result<Vec<Match>, ApiError> {
        let Some(code) = self.code(competition) else {
            return Ok(Vec::new());
        };

        let body = self.transport.get(&Self::matches_path(code, date)).await?;
        let response: MatchesResponse = serde_json::from_slice(&body)
            .map_err(|e| ApiError::decode(format!("unmarshal matches to {competition}"), e))?;

        debug!(
            competition = %competition,
            code,
            count = response.matches.len(),
            "football-data matches fetched"
        );

        Ok(response
            .matches
            .into_iter()
            .map(|m| Match {
                competition,
                start_at: m.utc_date,
                home_team: m.home_team.into_name(),
                away_team: m.away_team.into_name(),
                home_score: m.score.full_time.home,
                away_score: m.score.full_time.away,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Shared types for the matchday digest.
//!
//! The competition registry, the match record every provider produces,
//! and the error type for calls to external HTTP services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Competition registry
// ---------------------------------------------------------------------------

/// A competition whose daily matches are aggregated.
///
/// The variant order is the registry order: aggregation visits
/// competitions in this order and the digest lists them the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Competition {
    Paulistao,
    UefaChampionsLeague,
    Saudita,
    Bundesliga,
    LaLiga,
    PremierLeague,
    Italiano,
    Ligue1,
    LigaPortuguesa,
    Libertadores,
    Brasileirao,
    EliminatoriasEuropeias,
    AmistososSelecaoBrasileira,
}

impl Competition {
    /// Every competition that must be queried on each pass.
    pub const ALL: &'static [Competition] = &[
        Competition::Paulistao,
        Competition::UefaChampionsLeague,
        Competition::Saudita,
        Competition::Bundesliga,
        Competition::LaLiga,
        Competition::PremierLeague,
        Competition::Italiano,
        Competition::Ligue1,
        Competition::LigaPortuguesa,
        Competition::Libertadores,
        Competition::Brasileirao,
        Competition::EliminatoriasEuropeias,
        Competition::AmistososSelecaoBrasileira,
    ];

    /// Human-readable name used in the digest.
    pub fn name(&self) -> &'static str {
        match self {
            Competition::Paulistao => "Campeonato Paulista",
            Competition::UefaChampionsLeague => "UEFA Champions League",
            Competition::Saudita => "Campeonato Saudita",
            Competition::Bundesliga => "Bundesliga",
            Competition::LaLiga => "La Liga",
            Competition::PremierLeague => "Premier League",
            Competition::Italiano => "Serie A Italiana",
            Competition::Ligue1 => "Ligue 1",
            Competition::LigaPortuguesa => "Liga Portuguesa",
            Competition::Libertadores => "Libertadores",
            Competition::Brasileirao => "Brasileirão Serie A",
            Competition::EliminatoriasEuropeias => "Eliminatorias Europeias",
            Competition::AmistososSelecaoBrasileira => "Amistosos Seleção Brasileira",
        }
    }

    /// Configuration key (matches the serde representation).
    pub fn key(&self) -> &'static str {
        match self {
            Competition::Paulistao => "paulistao",
            Competition::UefaChampionsLeague => "uefa_champions_league",
            Competition::Saudita => "saudita",
            Competition::Bundesliga => "bundesliga",
            Competition::LaLiga => "la_liga",
            Competition::PremierLeague => "premier_league",
            Competition::Italiano => "italiano",
            Competition::Ligue1 => "ligue1",
            Competition::LigaPortuguesa => "liga_portuguesa",
            Competition::Libertadores => "libertadores",
            Competition::Brasileirao => "brasileirao",
            Competition::EliminatoriasEuropeias => "eliminatorias_europeias",
            Competition::AmistososSelecaoBrasileira => "amistosos_selecao_brasileira",
        }
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a configuration key or a display name (case-insensitive).
impl std::str::FromStr for Competition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Competition::ALL
            .iter()
            .copied()
            .find(|c| c.key().eq_ignore_ascii_case(needle) || c.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| anyhow::anyhow!("Unknown competition: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A single match scheduled (or played) on the requested day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub competition: Competition,
    pub start_at: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    /// Full-time score, absent until the match has one.
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl Match {
    /// Both sides have a score.
    pub fn score(&self) -> Option<(u32, u32)> {
        self.home_score.zip(self.away_score)
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.score() {
            Some((home, away)) => write!(
                f,
                "[{}] {} {home} x {away} {} @ {}",
                self.competition, self.home_team, self.away_team, self.start_at
            ),
            None => write!(
                f,
                "[{}] {} x {} @ {}",
                self.competition, self.home_team, self.away_team, self.start_at
            ),
        }
    }
}

/// Matches found for each competition, in registry order.
///
/// A competition is present only when some provider returned at least
/// one match for it.
pub type ResultSet = BTreeMap<Competition, Vec<Match>>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Maximum number of response-body bytes kept in a status error.
const MAX_ERROR_BODY: usize = 200;

/// Failure of a call to an external HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Wrap a reqwest error with its URL removed. Webhook URLs and bot
    /// tokens travel in the URL and must not end up in logs or messages.
    pub fn transport(err: reqwest::Error) -> Self {
        ApiError::Transport(err.without_url().to_string())
    }

    pub fn status(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_ERROR_BODY) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        ApiError::Status { status, body }
    }

    pub fn decode(what: impl fmt::Display, err: impl fmt::Display) -> Self {
        ApiError::Decode(format!("{what}: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

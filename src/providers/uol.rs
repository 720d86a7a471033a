//! UOL Esporte scoreboard feed.
//!
//! UOL publishes one JSON document with the recent and upcoming games of
//! every competition it follows. The document is fetched once per provider
//! instance and shared by all competitions; dates and hours in it are local
//! (Brazil) wall-clock values.

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::MatchProvider;
use crate::http::Transport;
use crate::types::{ApiError, Competition, Match};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const BASE_URL: &str = "https://www.uol.com.br/esporte/service/";
const PROVIDER_NAME: &str = "UOL";

/// Query handed to UOL's component loader to open the scoreboard JSON.
const DATASET_QUERY: &str = r#"{"module":"tools","api":"json","method":"open","busca":"commons.uol.com.br/sistemas/esporte/modalidades/futebol/campeonatos/etc/jogos/resultados_e_proximos/dados.json"}"#;

/// Format of `"<data> <horario>"`, e.g. `2024-03-10 16h30`.
const KICKOFF_FORMAT: &str = "%Y-%m-%d %Hh%M";

/// UOL competition ids that map onto the registry.
const COMPETITION_IDS: &[(&str, Competition)] = &[
    ("104", Competition::Paulistao),
    ("83", Competition::UefaChampionsLeague),
    ("178", Competition::Saudita),
    ("12", Competition::Bundesliga),
    ("72", Competition::LaLiga),
    ("79", Competition::PremierLeague),
    ("81", Competition::Italiano),
];

// ---------------------------------------------------------------------------
// API response types (UOL JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UolDataset {
    #[serde(default, rename = "equipes")]
    teams: HashMap<String, UolTeam>,
    #[serde(default, rename = "jogos")]
    games: HashMap<String, UolGame>,
}

#[derive(Debug, Deserialize)]
struct UolTeam {
    #[serde(default, rename = "nome-completo")]
    name: String,
}

/// Games of competitions outside the registry may be incomplete, so every
/// field defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UolGame {
    #[serde(rename = "id-competicao")]
    competition_id: String,
    #[serde(rename = "data")]
    date: String,
    #[serde(rename = "horario")]
    hour: String,
    #[serde(rename = "time1")]
    home_team: String,
    #[serde(rename = "time2")]
    away_team: String,
    #[serde(rename = "placar1")]
    home_score: Option<u32>,
    #[serde(rename = "placar2")]
    away_score: Option<u32>,
}

impl UolDataset {
    fn team_name(&self, id: &str) -> String {
        match self.teams.get(id) {
            Some(team) if !team.name.is_empty() => team.name.clone(),
            _ => id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct UolProvider {
    transport: Arc<dyn Transport>,
    /// Offset of the wall-clock times in the feed.
    local_offset: FixedOffset,
    dataset: OnceCell<UolDataset>,
}

impl UolProvider {
    pub fn new(transport: Arc<dyn Transport>, local_offset: FixedOffset) -> Self {
        Self {
            transport,
            local_offset,
            dataset: OnceCell::new(),
        }
    }

    fn competition_for(id: &str) -> Option<Competition> {
        COMPETITION_IDS
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, competition)| *competition)
    }

    fn dataset_path() -> String {
        format!("?loadComponent=api&data={}", urlencoding::encode(DATASET_QUERY))
    }

    /// The shared dataset, fetched on first use. Concurrent first callers
    /// wait on a single fetch; a failed fetch leaves the cell empty so the
    /// next call tries again.
    async fn dataset(&self) -> Result<&UolDataset, ApiError> {
        self.dataset
            .get_or_try_init(|| async {
                let body = self.transport.get(&Self::dataset_path()).await?;
                let dataset: UolDataset = serde_json::from_slice(&body)
                    .map_err(|e| ApiError::decode("unmarshal UOL dataset", e))?;
                info!(
                    games = dataset.games.len(),
                    teams = dataset.teams.len(),
                    "UOL dataset loaded"
                );
                Ok::<_, ApiError>(dataset)
            })
            .await
    }

    fn to_match(
        &self,
        dataset: &UolDataset,
        game: &UolGame,
        competition: Competition,
        date: NaiveDate,
    ) -> Result<Option<Match>, ApiError> {
        let raw = format!("{} {}", game.date, game.hour);
        let local = NaiveDateTime::parse_from_str(&raw, KICKOFF_FORMAT)
            .map_err(|e| ApiError::decode(format!("parse time {raw:?}"), e))?;
        if local.date() != date {
            return Ok(None);
        }

        let start_at = self
            .local_offset
            .from_local_datetime(&local)
            .single()
            .ok_or_else(|| ApiError::Decode(format!("ambiguous local time {raw:?}")))?
            .with_timezone(&Utc);

        Ok(Some(Match {
            competition,
            start_at,
            home_team: dataset.team_name(&game.home_team),
            away_team: dataset.team_name(&game.away_team),
            home_score: game.home_score,
            away_score: game.away_score,
        }))
    }
}

#[async_trait]
impl MatchProvider for UolProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn contains(&self, competition: Competition) -> bool {
        COMPETITION_IDS.iter().any(|(_, known)| *known == competition)
    }

    async fn list_matches(
        &self,
        competition: Competition,
        date: NaiveDate,
    ) -> Result<Vec<Match>, ApiError> {
        let dataset = self.dataset().await?;

        let mut matches = Vec::new();
        for game in dataset.games.values() {
            if Self::competition_for(&game.competition_id) != Some(competition) {
                continue;
            }
            if let Some(m) = self.to_match(dataset, game, competition, date)? {
                matches.push(m);
            }
        }

        // The feed is a JSON object, so game order is arbitrary.
        matches.sort_by(|a, b| {
            a.start_at
                .cmp(&b.start_at)
                .then_with(|| a.home_team.cmp(&b.home_team))
        });

        debug!(competition = %competition, count = matches.len(), "UOL matches filtered");
        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

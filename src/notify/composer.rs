//! Digest message formatting.
//!
//! Output is Discord-flavoured Markdown; the Telegram channel strips it.

use chrono::{FixedOffset, NaiveDate};
use std::fmt;

use crate::types::{Competition, Match, ResultSet};

const NO_MATCHES: &str = "Não existem jogos para hoje.";

/// Renders the aggregated matches in local time.
#[derive(Debug, Clone, Copy)]
pub struct MessageComposer {
    local_offset: FixedOffset,
}

impl MessageComposer {
    pub fn new(local_offset: FixedOffset) -> Self {
        Self { local_offset }
    }

    /// Digest for `date`. Competitions in `unavailable` could not be
    /// fetched and are listed at the end.
    ///
    /// With no matches and some unavailable competitions the header, the
    /// "no matches" line and the unavailable list are still rendered. The
    /// binary never gets here (both failure policies reject that pass), but
    /// library callers that skip `Aggregation::into_result` can.
    pub fn compose(&self, date: NaiveDate, matches: &ResultSet, unavailable: &[Competition]) -> String {
        let has_matches = matches.values().any(|m| !m.is_empty());
        if !has_matches && unavailable.is_empty() {
            return NO_MATCHES.to_string();
        }

        let mut out = format!("# Jogos de Hoje - {}\n\n", date.format("%d/%m/%Y"));

        if !has_matches {
            out.push_str(&format!("{NO_MATCHES}\n\n"));
        }

        for (competition, games) in matches {
            if games.is_empty() {
                continue;
            }
            out.push_str(&format!("## {competition} \n\n"));
            for game in games {
                out.push_str(&self.line(game));
                out.push_str("\n\n");
            }
        }

        if !unavailable.is_empty() {
            let names: Vec<&str> = unavailable.iter().map(|c| c.name()).collect();
            out.push_str(&format!(
                ":warning: Não foi possível buscar: {}\n",
                names.join(", ")
            ));
        }

        out
    }

    /// Notice sent when the pass failed.
    pub fn failure(&self, error: &dyn fmt::Display) -> String {
        format!("Erro ao buscar os jogos de hoje: {error}")
    }

    fn line(&self, game: &Match) -> String {
        let kickoff = game.start_at.with_timezone(&self.local_offset).format("%H:%M");
        match game.score() {
            Some((home, away)) => format!(
                "**{}** {home} x {away} **{}** - :clock1: {kickoff}",
                game.home_team, game.away_team
            ),
            None => format!(
                "**{}** x **{}** - :clock1: {kickoff}",
                game.home_team, game.away_team
            ),
        }
    }
}

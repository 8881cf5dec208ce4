use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::league_names::standardize_league_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    #[default]
    Scheduled,
    Started,
    Finished,
}

impl FixtureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FixtureStatus::Scheduled => "scheduled",
            FixtureStatus::Started => "started",
            FixtureStatus::Finished => "finished",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(FixtureStatus::Scheduled),
            "started" => Some(FixtureStatus::Started),
            "finished" => Some(FixtureStatus::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_odds() -> f64 {
    1.0
}

/// An upcoming fixture as scraped from the schedule pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMatch {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub start_time: i64,
    #[serde(default)]
    pub match_time_display: Option<String>,
    #[serde(default)]
    pub status: FixtureStatus,
    #[serde(default = "default_odds")]
    pub home_odds: f64,
    #[serde(default = "default_odds")]
    pub draw_odds: f64,
    #[serde(default = "default_odds")]
    pub away_odds: f64,
}

/// Load a JSON array of fixtures, standardizing each league key.
pub fn parse_fixtures_json(raw: &str) -> Result<Vec<ScheduledMatch>> {
    let mut fixtures: Vec<ScheduledMatch> =
        serde_json::from_str(raw.trim()).context("invalid fixtures json")?;
    fixtures.retain(|f| !f.home_team.trim().is_empty() && !f.away_team.trim().is_empty());
    for fixture in &mut fixtures {
        fixture.league = standardize_league_name(&fixture.league);
    }
    Ok(fixtures)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Scheduled,
    /// A completed pairing shown when a league has nothing scheduled.
    Historical,
}

/// One row of a league's fixture list, tagged with whether a prediction can
/// be made for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureListing {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub match_time: String,
    pub status: String,
    pub kind: ListingKind,
    pub can_predict: bool,
}

impl FixtureListing {
    pub fn prediction_note(&self) -> &'static str {
        match (self.kind, self.can_predict) {
            (ListingKind::Historical, _) => "Historical analysis available",
            (ListingKind::Scheduled, true) => "Prediction available",
            (ListingKind::Scheduled, false) => "Insufficient historical data",
        }
    }
}

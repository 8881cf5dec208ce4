use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::league_names::standardize_league_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

impl MatchResult {
    pub fn from_scores(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => MatchResult::Home,
            std::cmp::Ordering::Less => MatchResult::Away,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            MatchResult::Home => "1",
            MatchResult::Draw => "X",
            MatchResult::Away => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(MatchResult::Home),
            "X" | "x" => Some(MatchResult::Draw),
            "2" => Some(MatchResult::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// One completed match, validated. Derived values are computed from the
/// scores so they can never disagree with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub event_id: String,
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub ht_home_score: u32,
    pub ht_away_score: u32,
    pub start_time: i64,
    pub match_status: String,
    pub league: String,
}

impl MatchRecord {
    pub fn new(
        event_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        (home_score, away_score): (u32, u32),
        start_time: i64,
        league: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            game_id: String::new(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_score,
            away_score,
            ht_home_score: 0,
            ht_away_score: 0,
            start_time,
            match_status: "Ended".to_string(),
            league: league.into(),
        }
    }

    pub fn result(&self) -> MatchResult {
        MatchResult::from_scores(self.home_score, self.away_score)
    }

    pub fn total_goals(&self) -> u32 {
        self.home_score + self.away_score
    }

    pub fn ht_total_goals(&self) -> u32 {
        self.ht_home_score + self.ht_away_score
    }

    pub fn both_teams_scored(&self) -> bool {
        self.home_score > 0 && self.away_score > 0
    }

    pub fn over_2_5(&self) -> bool {
        f64::from(self.total_goals()) > 2.5
    }

    pub fn side_of(&self, team: &str) -> Option<Side> {
        if self.home_team == team {
            Some(Side::Home)
        } else if self.away_team == team {
            Some(Side::Away)
        } else {
            None
        }
    }

    /// (scored, conceded) from `side`'s point of view.
    pub fn goals_for_side(&self, side: Side) -> (u32, u32) {
        match side {
            Side::Home => (self.home_score, self.away_score),
            Side::Away => (self.away_score, self.home_score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMatch {
    #[error("event id is empty")]
    MissingEventId,
    #[error("home team name is empty")]
    MissingHomeTeam,
    #[error("away team name is empty")]
    MissingAwayTeam,
    #[error("{0} is listed as both home and away team")]
    SameTeams(String),
    #[error("score is missing")]
    MissingScore,
    #[error("score {0:?} is not of the form H:A")]
    MalformedScore(String),
}

/// A results-feed event as delivered, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    #[serde(deserialize_with = "loose_string")]
    pub event_id: String,
    #[serde(deserialize_with = "loose_string")]
    pub game_id: String,
    pub home_team_name: Option<String>,
    pub away_team_name: Option<String>,
    pub set_score: Option<String>,
    pub game_score: Option<Vec<String>>,
    #[serde(deserialize_with = "loose_i64")]
    pub estimate_start_time: Option<i64>,
    pub match_status: Option<String>,
    pub sport: Option<RawSport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSport {
    pub category: Option<RawCategory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCategory {
    pub name: Option<String>,
}

impl RawEvent {
    pub fn category_name(&self) -> Option<&str> {
        self.sport
            .as_ref()
            .and_then(|s| s.category.as_ref())
            .and_then(|c| c.name.as_deref())
    }

    /// Key used to drop repeats across result pages.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}_{}",
            self.event_id,
            self.estimate_start_time
                .map(|t| t.to_string())
                .unwrap_or_default()
        )
    }
}

pub fn normalize(raw: &RawEvent) -> Result<MatchRecord, InvalidMatch> {
    // The store keys on event_id; blank ids would overwrite each other.
    if raw.event_id.trim().is_empty() {
        return Err(InvalidMatch::MissingEventId);
    }
    let home_team = raw.home_team_name.as_deref().unwrap_or_default().trim();
    if home_team.is_empty() {
        return Err(InvalidMatch::MissingHomeTeam);
    }
    let away_team = raw.away_team_name.as_deref().unwrap_or_default().trim();
    if away_team.is_empty() {
        return Err(InvalidMatch::MissingAwayTeam);
    }
    if home_team == away_team {
        return Err(InvalidMatch::SameTeams(home_team.to_string()));
    }

    let score = raw.set_score.as_deref().ok_or(InvalidMatch::MissingScore)?;
    let (home_score, away_score) =
        parse_score_pair(score).ok_or_else(|| InvalidMatch::MalformedScore(score.to_string()))?;

    let (ht_home_score, ht_away_score) = raw
        .game_score
        .as_ref()
        .and_then(|scores| scores.first())
        .and_then(|s| parse_score_pair(s))
        .unwrap_or((0, 0));

    let record = MatchRecord {
        event_id: raw.event_id.trim().to_string(),
        game_id: raw.game_id.clone(),
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        home_score,
        away_score,
        ht_home_score,
        ht_away_score,
        start_time: raw.estimate_start_time.unwrap_or(0),
        match_status: raw
            .match_status
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        league: standardize_league_name(raw.category_name().unwrap_or("Unknown")),
    };
    debug!(
        event_id = %record.event_id,
        "normalized {} vs {} ({}:{}) in {}",
        record.home_team, record.away_team, record.home_score, record.away_score, record.league
    );
    Ok(record)
}

/// Normalize a batch in order, logging and skipping invalid events.
pub fn normalize_batch<'a>(events: impl IntoIterator<Item = &'a RawEvent>) -> Vec<MatchRecord> {
    let mut out = Vec::new();
    for event in events {
        match normalize(event) {
            Ok(record) => out.push(record),
            Err(err) => warn!(event_id = %event.event_id, "skipping invalid match: {err}"),
        }
    }
    out
}

/// `"H:A"` into two non-negative integers. Anything else is `None`.
pub fn parse_score_pair(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split(':');
    let home = parts.next()?.trim().parse::<u32>().ok()?;
    let away = parts.next()?.trim().parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((home, away))
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn loose_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::match_record::{MatchRecord, MatchResult};

pub const FORM_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    W,
    D,
    L,
}

impl FormResult {
    pub fn as_char(self) -> char {
        match self {
            FormResult::W => 'W',
            FormResult::D => 'D',
            FormResult::L => 'L',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'W' => Some(FormResult::W),
            'D' => Some(FormResult::D),
            'L' => Some(FormResult::L),
            _ => None,
        }
    }
}

impl fmt::Display for FormResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_name: String,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
    pub home_matches: u32,
    pub away_matches: u32,
    pub last_5_results: VecDeque<FormResult>,
    pub position: Option<usize>,
}

impl TeamStanding {
    pub fn new(team_name: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            matches_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference: 0,
            points: 0,
            home_matches: 0,
            away_matches: 0,
            last_5_results: VecDeque::with_capacity(FORM_LEN + 1),
            position: None,
        }
    }

    fn record(&mut self, scored: u32, conceded: u32, form: FormResult) {
        self.matches_played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        self.goal_difference = i64::from(self.goals_for) - i64::from(self.goals_against);
        match form {
            FormResult::W => {
                self.wins += 1;
                self.points += 3;
            }
            FormResult::D => {
                self.draws += 1;
                self.points += 1;
            }
            FormResult::L => self.losses += 1,
        }
        self.last_5_results.push_back(form);
        while self.last_5_results.len() > FORM_LEN {
            self.last_5_results.pop_front();
        }
    }

    fn sort_key(&self) -> (u32, i64, u32) {
        (self.points, self.goal_difference, self.goals_for)
    }

    /// Comma-joined form, oldest first: `"W,D,L"`.
    pub fn form_string(&self) -> String {
        self.last_5_results
            .iter()
            .map(|r| r.as_char().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn parse_form(raw: &str) -> VecDeque<FormResult> {
        raw.split(',')
            .filter_map(|part| part.trim().chars().next())
            .filter_map(FormResult::from_char)
            .collect()
    }
}

/// Folds match records into per-team totals. Teams appear only once a match
/// mentions them; one accumulator per table build.
///
/// There is no dedup here: adding the same record twice counts it twice.
/// Uniqueness of `event_id` is the store's job.
#[derive(Debug, Default)]
pub struct StandingsAccumulator {
    teams: Vec<TeamStanding>,
    index: HashMap<String, usize>,
    skipped: usize,
}

impl StandingsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_match(&mut self, record: &MatchRecord) {
        if record.home_team.is_empty() || record.away_team.is_empty() {
            warn!(event_id = %record.event_id, "skipping match with missing teams");
            self.skipped += 1;
            return;
        }
        if record.home_team == record.away_team {
            warn!(event_id = %record.event_id, team = %record.home_team, "skipping match of a team against itself");
            self.skipped += 1;
            return;
        }

        let (home_form, away_form) = match record.result() {
            MatchResult::Home => (FormResult::W, FormResult::L),
            MatchResult::Away => (FormResult::L, FormResult::W),
            MatchResult::Draw => (FormResult::D, FormResult::D),
        };

        let home = self.slot(&record.home_team);
        self.teams[home].home_matches += 1;
        self.teams[home].record(record.home_score, record.away_score, home_form);

        let away = self.slot(&record.away_team);
        self.teams[away].away_matches += 1;
        self.teams[away].record(record.away_score, record.home_score, away_form);
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a MatchRecord>) {
        for record in records {
            self.add_match(record);
        }
    }

    fn slot(&mut self, team: &str) -> usize {
        if let Some(idx) = self.index.get(team) {
            return *idx;
        }
        let idx = self.teams.len();
        self.teams.push(TeamStanding::new(team));
        self.index.insert(team.to_string(), idx);
        idx
    }

    pub fn team(&self, name: &str) -> Option<&TeamStanding> {
        self.index.get(name).map(|idx| &self.teams[*idx])
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Ranked snapshot by points, goal difference, goals for (all
    /// descending). The sort is stable, so teams level on all three stay in
    /// the order they were first seen. Positions are 1-based and never shared.
    pub fn generate_table(&self) -> Vec<TeamStanding> {
        let mut table = self.teams.clone();
        for team in &mut table {
            team.goal_difference = i64::from(team.goals_for) - i64::from(team.goals_against);
        }
        table.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        for (idx, team) in table.iter_mut().enumerate() {
            team.position = Some(idx + 1);
        }

        if let (Some(min), Some(max)) = (
            table.iter().map(|t| t.matches_played).min(),
            table.iter().map(|t| t.matches_played).max(),
        ) {
            info!(teams = table.len(), "generated table, match count range {min}-{max}");
        }
        table
    }
}

pub fn build_table<'a>(records: impl IntoIterator<Item = &'a MatchRecord>) -> Vec<TeamStanding> {
    let mut acc = StandingsAccumulator::new();
    acc.extend(records);
    acc.generate_table()
}

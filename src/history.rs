use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::fixtures::ScheduledMatch;
use crate::match_record::MatchRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledKickoff {
    pub start_time: DateTime<Utc>,
    pub display: Option<String>,
}

/// Read-only queries over stored match history. Implementations must not
/// mutate on read; concurrent predictions share one instance.
pub trait FormHistory {
    /// Most recent first, team on either side, within `league`.
    fn recent_matches(
        &self,
        team: &str,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>>;

    /// Meetings of the two teams in either orientation, most recent first.
    fn head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>>;

    fn scheduled_kickoff(
        &self,
        home: &str,
        away: &str,
        league: &str,
    ) -> StoreResult<Option<ScheduledKickoff>>;
}

pub fn kickoff_from_millis(ms: i64, display: Option<String>) -> Option<ScheduledKickoff> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|start_time| ScheduledKickoff {
        start_time,
        display,
    })
}

/// History held in memory. Ties on `start_time` keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct MatchLog {
    matches: Vec<MatchRecord>,
    fixtures: Vec<ScheduledMatch>,
}

impl MatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_matches(matches: Vec<MatchRecord>) -> Self {
        Self {
            matches,
            fixtures: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MatchRecord) {
        self.matches.push(record);
    }

    pub fn push_fixture(&mut self, fixture: ScheduledMatch) {
        self.fixtures.push(fixture);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    fn latest_where<F>(&self, limit: usize, keep: F) -> Vec<MatchRecord>
    where
        F: Fn(&MatchRecord) -> bool,
    {
        let mut hits: Vec<&MatchRecord> = self.matches.iter().filter(|m| keep(m)).collect();
        hits.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        hits.into_iter().take(limit).cloned().collect()
    }
}

impl FormHistory for MatchLog {
    fn recent_matches(
        &self,
        team: &str,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        Ok(self.latest_where(limit, |m| {
            m.league == league && (m.home_team == team || m.away_team == team)
        }))
    }

    fn head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        Ok(self.latest_where(limit, |m| {
            m.league == league
                && ((m.home_team == team_a && m.away_team == team_b)
                    || (m.home_team == team_b && m.away_team == team_a))
        }))
    }

    fn scheduled_kickoff(
        &self,
        home: &str,
        away: &str,
        league: &str,
    ) -> StoreResult<Option<ScheduledKickoff>> {
        Ok(self
            .fixtures
            .iter()
            .filter(|f| f.home_team == home && f.away_team == away && f.league == league)
            .max_by_key(|f| f.start_time)
            .and_then(|f| kickoff_from_millis(f.start_time, f.match_time_display.clone())))
    }
}

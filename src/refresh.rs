use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::league_names::standardize_league_name;
use crate::match_record::{RawEvent, normalize_batch};
use crate::standings::{StandingsAccumulator, TeamStanding};
use crate::store::MatchStore;

const FINISHED_FIXTURE_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub league: String,
    pub received: usize,
    pub valid: usize,
    pub stored: usize,
    pub table: Vec<TeamStanding>,
}

impl RefreshSummary {
    pub fn rejected(&self) -> usize {
        self.received - self.valid
    }
}

/// One report cycle for a league: persist the batch, then rebuild the table
/// from every stored match of that league with a fresh accumulator.
pub fn refresh_league(
    store: &mut MatchStore,
    league: &str,
    events: &[RawEvent],
) -> Result<RefreshSummary> {
    let league = standardize_league_name(league);
    let records = normalize_batch(events);

    let foreign = records.iter().filter(|r| r.league != league).count();
    if foreign > 0 {
        warn!(league = %league, foreign, "batch holds matches from other leagues; stored under their own keys");
    }

    let stored = store
        .upsert_matches(&records)
        .with_context(|| format!("store matches for {league}"))?;

    let history = store
        .league_matches(&league)
        .with_context(|| format!("load matches for {league}"))?;
    let mut acc = StandingsAccumulator::new();
    acc.extend(&history);
    let table = acc.generate_table();

    store
        .save_league_table(&league, &table)
        .with_context(|| format!("save table for {league}"))?;

    info!(
        league = %league,
        received = events.len(),
        valid = records.len(),
        stored,
        teams = table.len(),
        "league refreshed"
    );

    Ok(RefreshSummary {
        league,
        received: events.len(),
        valid: records.len(),
        stored,
        table,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub started: usize,
    pub finished: usize,
    pub pruned: usize,
}

/// Advance fixture statuses by kickoff time and drop stale finished ones.
pub fn sweep_fixtures(store: &MatchStore, now: DateTime<Utc>) -> Result<SweepSummary> {
    let now_ms = now.timestamp_millis();
    let finished = store
        .mark_finished_fixtures(now_ms)
        .context("mark finished fixtures")?;
    let started = store
        .mark_started_fixtures(now_ms)
        .context("mark started fixtures")?;
    let cutoff = now - Duration::hours(FINISHED_FIXTURE_RETENTION_HOURS);
    let pruned = store
        .prune_fixtures_before(cutoff.timestamp_millis())
        .context("prune finished fixtures")?;
    Ok(SweepSummary {
        started,
        finished,
        pruned,
    })
}

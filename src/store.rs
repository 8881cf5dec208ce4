use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, error, info};

use crate::error::{StoreError, StoreResult};
use crate::fixtures::{FixtureListing, FixtureStatus, ListingKind, ScheduledMatch};
use crate::history::{FormHistory, ScheduledKickoff, kickoff_from_millis};
use crate::match_record::MatchRecord;
use crate::standings::TeamStanding;

/// Virtual matches run 30 minutes; one more minute of slack before a
/// fixture counts as finished.
pub const MATCH_LENGTH_MS: i64 = 31 * 60 * 1000;

/// Stored matches involving either team needed before a fixture is offered
/// for prediction.
pub const MIN_MATCHES_TO_PREDICT: usize = 2;

/// Completed pairings listed when a league has no scheduled fixtures.
pub const HISTORICAL_LISTING_LIMIT: usize = 20;

const MATCH_COLUMNS: &str = "event_id, game_id, home_team, away_team, home_score, away_score,
    ht_home_score, ht_away_score, start_time, match_status, league";

const FIXTURE_COLUMNS: &str = "event_id, home_team, away_team, league, start_time,
    match_time_display, status, home_odds, draw_odds, away_odds";

pub struct MatchStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MatchStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        info!(path = %path.display(), "opened match store");
        Ok(store)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL UNIQUE,
                game_id TEXT NOT NULL DEFAULT '',
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_score INTEGER NOT NULL,
                away_score INTEGER NOT NULL,
                total_goals INTEGER NOT NULL,
                ht_home_score INTEGER NOT NULL DEFAULT 0,
                ht_away_score INTEGER NOT NULL DEFAULT 0,
                ht_total_goals INTEGER NOT NULL DEFAULT 0,
                start_time INTEGER NOT NULL,
                match_status TEXT NOT NULL DEFAULT 'Unknown',
                league TEXT NOT NULL,
                result TEXT NOT NULL,
                over_under_2_5 TEXT NOT NULL,
                both_teams_scored TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_matches_league_time ON matches(league, start_time);
            CREATE INDEX IF NOT EXISTS idx_matches_home ON matches(home_team);
            CREATE INDEX IF NOT EXISTS idx_matches_away ON matches(away_team);

            CREATE TABLE IF NOT EXISTS league_tables (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                league_name TEXT NOT NULL,
                team_name TEXT NOT NULL,
                position INTEGER NOT NULL,
                matches_played INTEGER NOT NULL,
                wins INTEGER NOT NULL,
                draws INTEGER NOT NULL,
                losses INTEGER NOT NULL,
                goals_for INTEGER NOT NULL,
                goals_against INTEGER NOT NULL,
                goal_difference INTEGER NOT NULL,
                points INTEGER NOT NULL,
                home_matches INTEGER NOT NULL DEFAULT 0,
                away_matches INTEGER NOT NULL DEFAULT 0,
                last_5_results TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(league_name, team_name)
            );

            CREATE TABLE IF NOT EXISTS scheduled_matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL UNIQUE,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                league TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                match_time_display TEXT NULL,
                status TEXT NOT NULL DEFAULT 'scheduled',
                home_odds REAL NOT NULL DEFAULT 1.0,
                draw_odds REAL NOT NULL DEFAULT 1.0,
                away_odds REAL NOT NULL DEFAULT 1.0,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_scheduled_pair
                ON scheduled_matches(league, home_team, away_team);
            "#,
        )?;
        Ok(())
    }

    /// Insert-or-replace by `event_id`, all in one transaction.
    pub fn upsert_matches(&mut self, records: &[MatchRecord]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO matches (
                    event_id, game_id, home_team, away_team, home_score, away_score,
                    total_goals, ht_home_score, ht_away_score, ht_total_goals,
                    start_time, match_status, league, result, over_under_2_5, both_teams_scored
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )?;
            for m in records {
                stmt.execute(params![
                    m.event_id,
                    m.game_id,
                    m.home_team,
                    m.away_team,
                    m.home_score,
                    m.away_score,
                    m.total_goals(),
                    m.ht_home_score,
                    m.ht_away_score,
                    m.ht_total_goals(),
                    m.start_time,
                    m.match_status,
                    m.league,
                    m.result().code(),
                    if m.over_2_5() { "Over" } else { "Under" },
                    if m.both_teams_scored() { "Yes" } else { "No" },
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        debug!(count, "upserted matches");
        Ok(count)
    }

    pub fn match_count(&self, league: &str) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM matches WHERE league = ?1",
            params![league],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Every stored match of a league, oldest first, for table rebuilds.
    pub fn league_matches(&self, league: &str) -> StoreResult<Vec<MatchRecord>> {
        self.query_matches(
            &format!(
                "SELECT {MATCH_COLUMNS} FROM matches WHERE league = ?1 ORDER BY start_time ASC, id ASC"
            ),
            params![league],
        )
    }

    fn query_matches(
        &self,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> StoreResult<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, row_to_match)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace a league's stored table with `table`.
    pub fn save_league_table(&mut self, league: &str, table: &[TeamStanding]) -> StoreResult<()> {
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM league_tables WHERE league_name = ?1",
            params![league],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO league_tables (
                    league_name, team_name, position, matches_played, wins, draws, losses,
                    goals_for, goals_against, goal_difference, points,
                    home_matches, away_matches, last_5_results, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )?;
            for (idx, team) in table.iter().enumerate() {
                let position = team.position.unwrap_or(idx + 1) as i64;
                stmt.execute(params![
                    league,
                    team.team_name,
                    position,
                    team.matches_played,
                    team.wins,
                    team.draws,
                    team.losses,
                    team.goals_for,
                    team.goals_against,
                    team.goal_difference,
                    team.points,
                    team.home_matches,
                    team.away_matches,
                    team.form_string(),
                    updated_at,
                ])?;
            }
        }
        tx.commit()?;
        info!(league, teams = table.len(), "saved league table");
        Ok(())
    }

    pub fn load_league_table(&self, league: &str) -> StoreResult<Vec<TeamStanding>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT team_name, position, matches_played, wins, draws, losses,
                   goals_for, goals_against, goal_difference, points,
                   home_matches, away_matches, last_5_results
            FROM league_tables
            WHERE league_name = ?1
            ORDER BY position ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![league], |row| {
                let last_5: String = row.get(12)?;
                Ok(TeamStanding {
                    team_name: row.get(0)?,
                    position: Some(row.get::<_, i64>(1)? as usize),
                    matches_played: row.get(2)?,
                    wins: row.get(3)?,
                    draws: row.get(4)?,
                    losses: row.get(5)?,
                    goals_for: row.get(6)?,
                    goals_against: row.get(7)?,
                    goal_difference: row.get(8)?,
                    points: row.get(9)?,
                    home_matches: row.get(10)?,
                    away_matches: row.get(11)?,
                    last_5_results: TeamStanding::parse_form(&last_5),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn upsert_scheduled(&mut self, fixtures: &[ScheduledMatch]) -> StoreResult<usize> {
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO scheduled_matches (
                    event_id, home_team, away_team, league, start_time,
                    match_time_display, status, home_odds, draw_odds, away_odds, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(event_id) DO UPDATE SET
                    home_team = excluded.home_team,
                    away_team = excluded.away_team,
                    league = excluded.league,
                    start_time = excluded.start_time,
                    match_time_display = COALESCE(excluded.match_time_display, match_time_display),
                    status = excluded.status,
                    home_odds = excluded.home_odds,
                    draw_odds = excluded.draw_odds,
                    away_odds = excluded.away_odds,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for f in fixtures {
                stmt.execute(params![
                    f.event_id,
                    f.home_team,
                    f.away_team,
                    f.league,
                    f.start_time,
                    f.match_time_display,
                    f.status.as_str(),
                    f.home_odds,
                    f.draw_odds,
                    f.away_odds,
                    updated_at,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        debug!(count, "upserted scheduled fixtures");
        Ok(count)
    }

    /// Upcoming fixtures of a league still marked scheduled.
    pub fn scheduled_for_league(
        &self,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<ScheduledMatch>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FIXTURE_COLUMNS} FROM scheduled_matches
             WHERE league = ?1 AND status = 'scheduled'
             ORDER BY home_team, away_team
             LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![league, limit as i64], row_to_fixture)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(fixture, status)| {
                let status = FixtureStatus::parse(&status).ok_or(StoreError::Corrupt {
                    column: "scheduled_matches.status",
                    value: status,
                })?;
                Ok(ScheduledMatch { status, ..fixture })
            })
            .collect()
    }

    /// Stored matches in `league` where either team played, on either side.
    pub fn prediction_history_count(
        &self,
        league: &str,
        home: &str,
        away: &str,
    ) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM matches
             WHERE league = ?1
               AND (home_team IN (?2, ?3) OR away_team IN (?2, ?3))",
            params![league, home, away],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Scheduled fixtures of a league with their prediction availability.
    /// With nothing scheduled, the most recent completed pairings stand in.
    pub fn fixture_listing(&self, league: &str, limit: usize) -> StoreResult<Vec<FixtureListing>> {
        let mut listing = Vec::new();
        for fixture in self.scheduled_for_league(league, limit)? {
            let history =
                self.prediction_history_count(league, &fixture.home_team, &fixture.away_team)?;
            debug!(
                home = %fixture.home_team,
                away = %fixture.away_team,
                history,
                "fixture prediction check"
            );
            listing.push(FixtureListing {
                event_id: fixture.event_id,
                home_team: fixture.home_team,
                away_team: fixture.away_team,
                match_time: fixture
                    .match_time_display
                    .unwrap_or_else(|| "TBD".to_string()),
                status: fixture.status.as_str().to_string(),
                kind: ListingKind::Scheduled,
                can_predict: history >= MIN_MATCHES_TO_PREDICT,
            });
        }
        if !listing.is_empty() {
            return Ok(listing);
        }

        let mut stmt = self.conn.prepare(
            "SELECT event_id, home_team, away_team FROM matches
             WHERE league = ?1
             ORDER BY start_time DESC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![league, HISTORICAL_LISTING_LIMIT as i64], |row| {
                Ok(FixtureListing {
                    event_id: row.get(0)?,
                    home_team: row.get(1)?,
                    away_team: row.get(2)?,
                    match_time: "Completed".to_string(),
                    status: "completed".to_string(),
                    kind: ListingKind::Historical,
                    can_predict: true,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        info!(league, count = rows.len(), "no scheduled fixtures, listing recent results");
        Ok(rows)
    }

    /// Distinct league keys across results and fixtures, sorted.
    pub fn leagues(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT league FROM matches
             UNION
             SELECT DISTINCT league FROM scheduled_matches
             ORDER BY league",
        )?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter(|l| !l.is_empty()).collect())
    }

    /// Flip fixtures whose kickoff lies a full match length in the past.
    pub fn mark_finished_fixtures(&self, now_ms: i64) -> StoreResult<usize> {
        let n = self.conn.execute(
            "UPDATE scheduled_matches SET status = 'finished', updated_at = ?2
             WHERE status != 'finished' AND start_time <= ?1",
            params![now_ms - MATCH_LENGTH_MS, Utc::now().to_rfc3339()],
        )?;
        if n > 0 {
            info!(count = n, "fixtures marked finished");
        }
        Ok(n)
    }

    /// Flip scheduled fixtures whose kickoff has passed but which are still
    /// within a match length of it.
    pub fn mark_started_fixtures(&self, now_ms: i64) -> StoreResult<usize> {
        let n = self.conn.execute(
            "UPDATE scheduled_matches SET status = 'started', updated_at = ?3
             WHERE status = 'scheduled' AND start_time <= ?1 AND start_time > ?2",
            params![now_ms, now_ms - MATCH_LENGTH_MS, Utc::now().to_rfc3339()],
        )?;
        if n > 0 {
            info!(count = n, "fixtures marked started");
        }
        Ok(n)
    }

    pub fn prune_fixtures_before(&self, cutoff_ms: i64) -> StoreResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM scheduled_matches WHERE status = 'finished' AND start_time < ?1",
            params![cutoff_ms],
        )?;
        Ok(n)
    }
}

fn row_to_match(row: &Row<'_>) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        event_id: row.get(0)?,
        game_id: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        home_score: row.get(4)?,
        away_score: row.get(5)?,
        ht_home_score: row.get(6)?,
        ht_away_score: row.get(7)?,
        start_time: row.get(8)?,
        match_status: row.get(9)?,
        league: row.get(10)?,
    })
}

fn row_to_fixture(row: &Row<'_>) -> rusqlite::Result<(ScheduledMatch, String)> {
    Ok((
        ScheduledMatch {
            event_id: row.get(0)?,
            home_team: row.get(1)?,
            away_team: row.get(2)?,
            league: row.get(3)?,
            start_time: row.get(4)?,
            match_time_display: row.get(5)?,
            status: FixtureStatus::Scheduled,
            home_odds: row.get(7)?,
            draw_odds: row.get(8)?,
            away_odds: row.get(9)?,
        },
        row.get(6)?,
    ))
}

impl FormHistory for MatchStore {
    fn recent_matches(
        &self,
        team: &str,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        self.query_matches(
            &format!(
                "SELECT {MATCH_COLUMNS} FROM matches
                 WHERE (home_team = ?1 OR away_team = ?1) AND league = ?2
                 ORDER BY start_time DESC, id ASC
                 LIMIT ?3"
            ),
            params![team, league, limit as i64],
        )
        .inspect_err(|err| error!(team, league, "recent matches query failed: {err}"))
    }

    fn head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        league: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        self.query_matches(
            &format!(
                "SELECT {MATCH_COLUMNS} FROM matches
                 WHERE ((home_team = ?1 AND away_team = ?2) OR (home_team = ?2 AND away_team = ?1))
                   AND league = ?3
                 ORDER BY start_time DESC, id ASC
                 LIMIT ?4"
            ),
            params![team_a, team_b, league, limit as i64],
        )
        .inspect_err(|err| error!(team_a, team_b, league, "head-to-head query failed: {err}"))
    }

    fn scheduled_kickoff(
        &self,
        home: &str,
        away: &str,
        league: &str,
    ) -> StoreResult<Option<ScheduledKickoff>> {
        let row = self
            .conn
            .query_row(
                "SELECT start_time, match_time_display FROM scheduled_matches
                 WHERE home_team = ?1 AND away_team = ?2 AND league = ?3
                 ORDER BY start_time DESC
                 LIMIT 1",
                params![home, away, league],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()
            .inspect_err(|err| error!(home, away, league, "kickoff lookup failed: {err}"))?;
        Ok(row.and_then(|(ms, display)| kickoff_from_millis(ms, display)))
    }
}

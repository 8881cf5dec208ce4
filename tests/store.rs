use std::fs;
use std::path::PathBuf;

use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

use vfootball::fixtures::{FixtureStatus, ListingKind, parse_fixtures_json};
use vfootball::history::FormHistory;
use vfootball::match_record::MatchRecord;
use vfootball::refresh::{refresh_league, sweep_fixtures};
use vfootball::result_feed::parse_result_page;
use vfootball::standings::{FormResult, build_table};
use vfootball::store::{HISTORICAL_LISTING_LIMIT, MATCH_LENGTH_MS, MatchStore};

const LEAGUE: &str = "england virtual";
const FIXTURE_KICKOFF: i64 = 1_718_003_600_000;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn m(id: u32, home: &str, away: &str, score: (u32, u32)) -> MatchRecord {
    MatchRecord::new(
        format!("e{id}"),
        home,
        away,
        score,
        1_718_000_000_000 + i64::from(id) * 60_000,
        LEAGUE,
    )
}

fn store_with_fixtures() -> MatchStore {
    let mut store = MatchStore::in_memory().unwrap();
    let fixtures = parse_fixtures_json(&read_fixture("fixtures.json")).unwrap();
    store.upsert_scheduled(&fixtures).unwrap();
    store
}

#[test]
fn upsert_replaces_by_event_id() {
    let mut store = MatchStore::in_memory().unwrap();
    store
        .upsert_matches(&[m(1, "ARS", "LEE", (1, 0)), m(2, "CHE", "MUN", (0, 0))])
        .unwrap();
    assert_eq!(store.match_count(LEAGUE).unwrap(), 2);

    // Same id, corrected score.
    store.upsert_matches(&[m(1, "ARS", "LEE", (1, 1))]).unwrap();
    let stored = store.league_matches(LEAGUE).unwrap();
    assert_eq!(stored.len(), 2);
    let first = stored.iter().find(|r| r.event_id == "e1").unwrap();
    assert_eq!((first.home_score, first.away_score), (1, 1));
}

#[test]
fn stored_matches_read_back_intact() {
    let mut store = MatchStore::in_memory().unwrap();
    let mut record = m(1, "ARS", "LEE", (3, 2));
    record.game_id = "20241".to_string();
    record.ht_home_score = 1;
    record.ht_away_score = 2;
    store.upsert_matches(std::slice::from_ref(&record)).unwrap();
    assert_eq!(store.league_matches(LEAGUE).unwrap(), vec![record]);
    assert!(store.league_matches("spain virtual").unwrap().is_empty());
}

#[test]
fn league_matches_are_oldest_first() {
    let mut store = MatchStore::in_memory().unwrap();
    store
        .upsert_matches(&[
            m(3, "ARS", "LEE", (1, 0)),
            m(1, "CHE", "MUN", (0, 0)),
            m(2, "LIV", "EVE", (2, 2)),
        ])
        .unwrap();
    let ids: Vec<String> = store
        .league_matches(LEAGUE)
        .unwrap()
        .into_iter()
        .map(|r| r.event_id)
        .collect();
    assert_eq!(ids, ["e1", "e2", "e3"]);
}

#[test]
fn recent_matches_are_latest_first_and_limited() {
    let mut store = MatchStore::in_memory().unwrap();
    store
        .upsert_matches(&[
            m(1, "ARS", "LEE", (1, 0)),
            m(2, "CHE", "ARS", (0, 0)),
            m(3, "MUN", "LIV", (2, 0)),
            m(4, "ARS", "EVE", (2, 2)),
        ])
        .unwrap();
    let recent = store.recent_matches("ARS", LEAGUE, 2).unwrap();
    let ids: Vec<&str> = recent.iter().map(|r| r.event_id.as_str()).collect();
    assert_eq!(ids, ["e4", "e2"]);
    assert!(store.recent_matches("ARS", "spain virtual", 5).unwrap().is_empty());
}

#[test]
fn head_to_head_covers_both_orientations() {
    let mut store = MatchStore::in_memory().unwrap();
    store
        .upsert_matches(&[
            m(1, "ARS", "LEE", (1, 0)),
            m(2, "LEE", "ARS", (0, 0)),
            m(3, "ARS", "CHE", (2, 0)),
            m(4, "ARS", "LEE", (2, 2)),
        ])
        .unwrap();
    let meetings = store.head_to_head("ARS", "LEE", LEAGUE, 5).unwrap();
    let ids: Vec<&str> = meetings.iter().map(|r| r.event_id.as_str()).collect();
    assert_eq!(ids, ["e4", "e2", "e1"]);
    assert_eq!(store.head_to_head("LEE", "ARS", LEAGUE, 2).unwrap().len(), 2);
}

#[test]
fn league_table_round_trips() {
    let mut store = MatchStore::in_memory().unwrap();
    let table = build_table(&[
        m(1, "ARS", "LEE", (2, 1)),
        m(2, "CHE", "ARS", (0, 0)),
        m(3, "LEE", "CHE", (3, 3)),
    ]);
    store.save_league_table(LEAGUE, &table).unwrap();

    let loaded = store.load_league_table(LEAGUE).unwrap();
    assert_eq!(loaded, table);
    let ars = &loaded[0];
    assert_eq!(ars.team_name, "ARS");
    assert_eq!(ars.form_string(), "W,D");
    assert_eq!(
        ars.last_5_results.iter().copied().collect::<Vec<_>>(),
        [FormResult::W, FormResult::D]
    );
}

#[test]
fn saving_a_table_replaces_the_previous_one() {
    let mut store = MatchStore::in_memory().unwrap();
    let big = build_table(&[m(1, "ARS", "LEE", (2, 1)), m(2, "CHE", "MUN", (0, 0))]);
    store.save_league_table(LEAGUE, &big).unwrap();
    let small = build_table(&[m(1, "ARS", "LEE", (0, 1))]);
    store.save_league_table(LEAGUE, &small).unwrap();

    let loaded = store.load_league_table(LEAGUE).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].team_name, "LEE");
    assert!(store.load_league_table("spain virtual").unwrap().is_empty());
}

#[test]
fn scheduled_fixtures_and_kickoff_lookup() {
    let store = store_with_fixtures();

    // The started fixture is not listed.
    let upcoming = store.scheduled_for_league(LEAGUE, 50).unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].event_id, "sr:match:2001");
    assert_eq!(upcoming[0].status, FixtureStatus::Scheduled);

    let kickoff = store
        .scheduled_kickoff("ARS", "LEE", LEAGUE)
        .unwrap()
        .expect("fixture on record");
    assert_eq!(kickoff.start_time.timestamp_millis(), FIXTURE_KICKOFF);
    assert_eq!(kickoff.display.as_deref(), Some("07:53"));
    assert!(store.scheduled_kickoff("LEE", "ARS", LEAGUE).unwrap().is_none());
}

#[test]
fn rescheduling_updates_in_place() {
    let mut store = store_with_fixtures();
    let mut fixtures = parse_fixtures_json(&read_fixture("fixtures.json")).unwrap();
    fixtures[1].status = FixtureStatus::Scheduled;
    fixtures[1].match_time_display = None;
    store.upsert_scheduled(&fixtures).unwrap();

    let upcoming = store.scheduled_for_league(LEAGUE, 50).unwrap();
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[1].home_team, "CHE");
    assert_eq!(upcoming[1].home_odds, 1.85);
    assert_eq!(store.scheduled_for_league(LEAGUE, 1).unwrap().len(), 1);
}

#[test]
fn leagues_span_results_and_fixtures() {
    let mut store = store_with_fixtures();
    let mut spain = m(1, "BAR", "RMA", (1, 0));
    spain.league = "spain virtual".to_string();
    store.upsert_matches(&[spain]).unwrap();
    assert_eq!(store.leagues().unwrap(), [LEAGUE, "spain virtual"]);
}

#[test]
fn fixtures_finish_after_a_match_length() {
    let store = store_with_fixtures();
    assert_eq!(
        store
            .mark_finished_fixtures(FIXTURE_KICKOFF + MATCH_LENGTH_MS - 1)
            .unwrap(),
        0
    );
    // Scheduled and started both close.
    assert_eq!(
        store
            .mark_finished_fixtures(FIXTURE_KICKOFF + MATCH_LENGTH_MS)
            .unwrap(),
        2
    );
    assert!(store.scheduled_for_league(LEAGUE, 50).unwrap().is_empty());
    assert_eq!(store.prune_fixtures_before(FIXTURE_KICKOFF).unwrap(), 0);
    assert_eq!(store.prune_fixtures_before(FIXTURE_KICKOFF + 1).unwrap(), 2);
}

#[test]
fn sweep_marks_then_prunes() {
    let store = store_with_fixtures();
    let kickoff = Utc.timestamp_millis_opt(FIXTURE_KICKOFF).unwrap();

    let first = sweep_fixtures(&store, kickoff + Duration::minutes(40)).unwrap();
    assert_eq!((first.started, first.finished, first.pruned), (0, 2, 0));

    let later = sweep_fixtures(&store, kickoff + Duration::hours(25)).unwrap();
    assert_eq!((later.started, later.finished, later.pruned), (0, 0, 2));
    assert!(store.scheduled_kickoff("ARS", "LEE", LEAGUE).unwrap().is_none());
}

#[test]
fn refresh_builds_and_saves_table() {
    let mut store = MatchStore::in_memory().unwrap();
    let page = parse_result_page(&read_fixture("result_page.json")).unwrap();

    let summary = refresh_league(&mut store, "England", &page.events).unwrap();
    assert_eq!(summary.league, LEAGUE);
    assert_eq!((summary.received, summary.valid, summary.stored), (5, 2, 2));
    assert_eq!(summary.rejected(), 3);

    let names: Vec<&str> = summary.table.iter().map(|t| t.team_name.as_str()).collect();
    assert_eq!(names, ["ARS", "CHE", "MUN", "LEE"]);
    assert_eq!(store.load_league_table(LEAGUE).unwrap(), summary.table);

    // A repeated page does not double count.
    let again = refresh_league(&mut store, LEAGUE, &page.events).unwrap();
    assert_eq!(store.match_count(LEAGUE).unwrap(), 2);
    assert_eq!(again.table, summary.table);
    assert_eq!(again.table[0].matches_played, 1);
}

#[test]
fn refresh_folds_in_earlier_results() {
    let mut store = MatchStore::in_memory().unwrap();
    store.upsert_matches(&[m(0, "LEE", "ARS", (4, 0))]).unwrap();
    let page = parse_result_page(&read_fixture("result_page.json")).unwrap();
    let summary = refresh_league(&mut store, LEAGUE, &page.events).unwrap();

    let lee = summary.table.iter().find(|t| t.team_name == "LEE").unwrap();
    assert_eq!((lee.matches_played, lee.points), (2, 3));
    assert_eq!(lee.form_string(), "W,L");
    assert_eq!(summary.table[0].team_name, "LEE");
}

#[test]
fn on_disk_store_persists_between_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("vfootball.db");
    {
        let mut store = MatchStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store.upsert_matches(&[m(1, "ARS", "LEE", (1, 0))]).unwrap();
    }
    let store = MatchStore::open(&path).unwrap();
    assert_eq!(store.match_count(LEAGUE).unwrap(), 1);
    assert!(store.path().is_some());
    assert!(MatchStore::in_memory().unwrap().path().is_none());
}

#[test]
fn fixtures_start_once_kickoff_passes() {
    let store = store_with_fixtures();
    assert_eq!(store.mark_started_fixtures(FIXTURE_KICKOFF - 1).unwrap(), 0);
    // Only the scheduled one moves; the other was already started.
    assert_eq!(store.mark_started_fixtures(FIXTURE_KICKOFF).unwrap(), 1);
    assert!(store.scheduled_for_league(LEAGUE, 50).unwrap().is_empty());
    assert_eq!(store.mark_started_fixtures(FIXTURE_KICKOFF + 60_000).unwrap(), 0);
}

#[test]
fn long_past_fixtures_skip_started() {
    let store = store_with_fixtures();
    let late = FIXTURE_KICKOFF + MATCH_LENGTH_MS;
    assert_eq!(store.mark_started_fixtures(late).unwrap(), 0);
    assert_eq!(store.mark_finished_fixtures(late).unwrap(), 2);
}

#[test]
fn sweep_reports_kicked_off_fixtures() {
    let store = store_with_fixtures();
    let kickoff = Utc.timestamp_millis_opt(FIXTURE_KICKOFF).unwrap();
    let summary = sweep_fixtures(&store, kickoff + Duration::minutes(5)).unwrap();
    assert_eq!((summary.started, summary.finished, summary.pruned), (1, 0, 0));
}

#[test]
fn prediction_history_counts_either_team() {
    let mut store = MatchStore::in_memory().unwrap();
    store
        .upsert_matches(&[
            m(1, "ARS", "CHE", (1, 0)),
            m(2, "MUN", "LEE", (0, 0)),
            m(3, "ARS", "LEE", (2, 2)),
            m(4, "CHE", "MUN", (2, 2)),
        ])
        .unwrap();
    assert_eq!(store.prediction_history_count(LEAGUE, "ARS", "LEE").unwrap(), 3);
    assert_eq!(store.prediction_history_count(LEAGUE, "LEE", "ARS").unwrap(), 3);
    assert_eq!(store.prediction_history_count(LEAGUE, "NEW", "BHA").unwrap(), 0);
    assert_eq!(store.prediction_history_count("spain virtual", "ARS", "LEE").unwrap(), 0);
}

#[test]
fn listing_flags_fixtures_that_can_be_predicted() {
    let mut store = store_with_fixtures();
    let mut fixtures = parse_fixtures_json(&read_fixture("fixtures.json")).unwrap();
    fixtures[1].status = FixtureStatus::Scheduled;
    store.upsert_scheduled(&fixtures).unwrap();
    // ARS and LEE share one match; CHE has one more; MUN none.
    store
        .upsert_matches(&[
            m(1, "ARS", "BOU", (1, 0)),
            m(2, "LEE", "FUL", (0, 0)),
            m(3, "CHE", "EVE", (1, 1)),
        ])
        .unwrap();

    let listing = store.fixture_listing(LEAGUE, 50).unwrap();
    assert_eq!(listing.len(), 2);

    let ars = &listing[0];
    assert_eq!((ars.home_team.as_str(), ars.away_team.as_str()), ("ARS", "LEE"));
    assert_eq!(ars.kind, ListingKind::Scheduled);
    assert!(ars.can_predict);
    assert_eq!(ars.match_time, "07:53");
    assert_eq!(ars.status, "scheduled");
    assert_eq!(ars.prediction_note(), "Prediction available");

    let che = &listing[1];
    assert!(!che.can_predict);
    assert_eq!(che.match_time, "TBD");
    assert_eq!(che.prediction_note(), "Insufficient historical data");
}

#[test]
fn listing_falls_back_to_recent_results() {
    let mut store = MatchStore::in_memory().unwrap();
    assert!(store.fixture_listing(LEAGUE, 50).unwrap().is_empty());

    let results: Vec<MatchRecord> = (0..25).map(|i| m(i, "ARS", "LEE", (1, 0))).collect();
    store.upsert_matches(&results).unwrap();

    let listing = store.fixture_listing(LEAGUE, 50).unwrap();
    assert_eq!(listing.len(), HISTORICAL_LISTING_LIMIT);
    assert_eq!(listing[0].event_id, "e24");
    assert!(listing.iter().all(|f| f.kind == ListingKind::Historical && f.can_predict));
    assert_eq!(listing[0].match_time, "Completed");
    assert_eq!(listing[0].status, "completed");
    assert_eq!(listing[0].prediction_note(), "Historical analysis available");
}

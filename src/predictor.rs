use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::error::StoreResult;
use crate::history::FormHistory;
use crate::match_record::{MatchRecord, MatchResult};

const HOME_ADVANTAGE: f64 = 0.15;
const WIN_RATE_WEIGHT: f64 = 0.6;
const CALL_THRESHOLD: f64 = 0.5;

pub const DEFAULT_FORM_WINDOW: usize = 5;
pub const DEFAULT_H2H_WINDOW: usize = 5;

/// A team's record over its most recent matches, from its own side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormStats {
    pub matches: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub btts_yes: u32,
    pub over_2_5: u32,
}

impl FormStats {
    /// `None` when `matches` is empty: no history is not the same as no wins.
    pub fn from_matches(team: &str, matches: &[MatchRecord]) -> Option<Self> {
        let mut stats = FormStats::default();
        for m in matches {
            let Some(side) = m.side_of(team) else {
                continue;
            };
            let (scored, conceded) = m.goals_for_side(side);
            stats.matches += 1;
            stats.goals_for += scored;
            stats.goals_against += conceded;
            match scored.cmp(&conceded) {
                std::cmp::Ordering::Greater => stats.wins += 1,
                std::cmp::Ordering::Equal => stats.draws += 1,
                std::cmp::Ordering::Less => stats.losses += 1,
            }
            if m.both_teams_scored() {
                stats.btts_yes += 1;
            }
            if m.over_2_5() {
                stats.over_2_5 += 1;
            }
        }
        (stats.matches > 0).then_some(stats)
    }

    fn denominator(&self) -> f64 {
        f64::from(self.matches.max(1))
    }

    pub fn win_rate(&self) -> f64 {
        f64::from(self.wins) / self.denominator()
    }

    pub fn draw_rate(&self) -> f64 {
        f64::from(self.draws) / self.denominator()
    }
}

/// Meetings counted from the named fixture's point of view, whichever side
/// each team played on at the time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeadToHead {
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
    pub total: u32,
}

impl HeadToHead {
    pub fn from_matches(home: &str, matches: &[MatchRecord]) -> Self {
        let mut h2h = HeadToHead::default();
        for m in matches {
            let Some(side) = m.side_of(home) else {
                continue;
            };
            let (scored, conceded) = m.goals_for_side(side);
            h2h.total += 1;
            match scored.cmp(&conceded) {
                std::cmp::Ordering::Greater => h2h.home_wins += 1,
                std::cmp::Ordering::Equal => h2h.draws += 1,
                std::cmp::Ordering::Less => h2h.away_wins += 1,
            }
        }
        h2h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalsCall {
    Over,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BttsCall {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "time", rename_all = "snake_case")]
pub enum Kickoff {
    Scheduled(DateTime<Utc>),
    /// No fixture on record; "now" stands in.
    Placeholder(DateTime<Utc>),
}

impl Kickoff {
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Kickoff::Scheduled(t) | Kickoff::Placeholder(t) => *t,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Kickoff::Placeholder(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub predicted_result: MatchResult,
    pub predicted_score: &'static str,
    /// Percentages, one decimal.
    pub home_win_prob: f64,
    pub draw_prob: f64,
    pub away_win_prob: f64,
    pub btts: BttsCall,
    pub over_2_5: GoalsCall,
    pub kickoff: Kickoff,
    pub match_time_display: Option<String>,
    pub home_stats: FormStats,
    pub away_stats: FormStats,
    pub h2h: HeadToHead,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Probabilities {
    /// Fixed heuristic: win rates weighted 0.6 plus a flat home bonus, draw
    /// as the mean draw rate, then normalized.
    pub fn from_form(home: &FormStats, away: &FormStats) -> Self {
        let raw_home = home.win_rate() * WIN_RATE_WEIGHT + HOME_ADVANTAGE;
        let raw_away = away.win_rate() * WIN_RATE_WEIGHT;
        let raw_draw = (home.draw_rate() + away.draw_rate()) / 2.0;

        let total = raw_home + raw_away + raw_draw;
        if total > 0.0 {
            Self {
                home: raw_home / total,
                draw: raw_draw / total,
                away: raw_away / total,
            }
        } else {
            Self {
                home: 1.0 / 3.0,
                draw: 1.0 / 3.0,
                away: 1.0 / 3.0,
            }
        }
    }

    /// Home or away only when strictly ahead of both others; draw otherwise.
    pub fn favoured(&self) -> MatchResult {
        if self.home > self.away && self.home > self.draw {
            MatchResult::Home
        } else if self.away > self.home && self.away > self.draw {
            MatchResult::Away
        } else {
            MatchResult::Draw
        }
    }
}

pub fn predicted_score(result: MatchResult) -> &'static str {
    match result {
        MatchResult::Home => "2:1",
        MatchResult::Away => "1:2",
        MatchResult::Draw => "1:1",
    }
}

/// Share of the considered matches with a "yes", across both teams.
pub fn combined_rate(home_yes: u32, away_yes: u32, home: &FormStats, away: &FormStats) -> f64 {
    let total = home.matches.max(1) + away.matches.max(1);
    f64::from(home_yes + away_yes) / f64::from(total)
}

pub fn percent(p: f64) -> f64 {
    (p * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Copy)]
pub struct OutcomePredictor {
    pub form_window: usize,
    pub h2h_window: usize,
}

impl Default for OutcomePredictor {
    fn default() -> Self {
        Self {
            form_window: DEFAULT_FORM_WINDOW,
            h2h_window: DEFAULT_H2H_WINDOW,
        }
    }
}

impl OutcomePredictor {
    pub fn new(form_window: usize, h2h_window: usize) -> Self {
        Self {
            form_window: form_window.max(1),
            h2h_window,
        }
    }

    pub fn predict<H: FormHistory + ?Sized>(
        &self,
        history: &H,
        home: &str,
        away: &str,
        league: &str,
    ) -> StoreResult<Option<Prediction>> {
        self.predict_at(history, home, away, league, Utc::now())
    }

    /// `Ok(None)` means one of the teams has no history in `league`. Store
    /// failures come back as `Err`.
    pub fn predict_at<H: FormHistory + ?Sized>(
        &self,
        history: &H,
        home: &str,
        away: &str,
        league: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Prediction>> {
        self.compute(history, home, away, league, now)
            .inspect_err(|err| error!(home, away, league, "prediction failed: {err}"))
    }

    fn compute<H: FormHistory + ?Sized>(
        &self,
        history: &H,
        home: &str,
        away: &str,
        league: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Prediction>> {
        let home_recent = history.recent_matches(home, league, self.form_window)?;
        let Some(home_stats) = FormStats::from_matches(home, &home_recent) else {
            info!(team = home, league, "no recent matches, skipping prediction");
            return Ok(None);
        };
        let away_recent = history.recent_matches(away, league, self.form_window)?;
        let Some(away_stats) = FormStats::from_matches(away, &away_recent) else {
            info!(team = away, league, "no recent matches, skipping prediction");
            return Ok(None);
        };

        let h2h = if self.h2h_window == 0 {
            HeadToHead::default()
        } else {
            let meetings = history.head_to_head(home, away, league, self.h2h_window)?;
            HeadToHead::from_matches(home, &meetings)
        };

        let (kickoff, match_time_display) = match history.scheduled_kickoff(home, away, league)? {
            Some(k) => (Kickoff::Scheduled(k.start_time), k.display),
            None => (Kickoff::Placeholder(now), None),
        };

        let probs = Probabilities::from_form(&home_stats, &away_stats);
        let predicted_result = probs.favoured();

        let btts_rate = combined_rate(home_stats.btts_yes, away_stats.btts_yes, &home_stats, &away_stats);
        let over_rate = combined_rate(home_stats.over_2_5, away_stats.over_2_5, &home_stats, &away_stats);

        let prediction = Prediction {
            home_team: home.to_string(),
            away_team: away.to_string(),
            league: league.to_string(),
            predicted_result,
            predicted_score: predicted_score(predicted_result),
            home_win_prob: percent(probs.home),
            draw_prob: percent(probs.draw),
            away_win_prob: percent(probs.away),
            btts: if btts_rate > CALL_THRESHOLD {
                BttsCall::Yes
            } else {
                BttsCall::No
            },
            over_2_5: if over_rate > CALL_THRESHOLD {
                GoalsCall::Over
            } else {
                GoalsCall::Under
            },
            kickoff,
            match_time_display,
            home_stats,
            away_stats,
            h2h,
        };

        info!(
            home,
            away,
            league,
            result = prediction.predicted_result.code(),
            "prediction H:{}% D:{}% A:{}%",
            prediction.home_win_prob,
            prediction.draw_prob,
            prediction.away_win_prob
        );
        Ok(Some(prediction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(matches: u32, wins: u32, draws: u32) -> FormStats {
        FormStats {
            matches,
            wins,
            draws,
            losses: matches - wins - draws,
            ..FormStats::default()
        }
    }

    #[test]
    fn ties_between_home_and_away_fall_to_draw() {
        let p = Probabilities {
            home: 0.4,
            draw: 0.2,
            away: 0.4,
        };
        assert_eq!(p.favoured(), MatchResult::Draw);
    }

    #[test]
    fn home_bonus_applies_without_wins() {
        let p = Probabilities::from_form(&stats(5, 0, 0), &stats(5, 0, 0));
        assert!((p.home - 1.0).abs() < 1e-9);
        assert_eq!(p.favoured(), MatchResult::Home);
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        assert_eq!(percent(0.66666), 66.7);
        assert_eq!(percent(0.0), 0.0);
        assert_eq!(percent(1.0), 100.0);
    }
}

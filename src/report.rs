use std::fmt::Write as _;

use crate::league_names::display_name;
use crate::match_record::MatchResult;
use crate::predictor::{BttsCall, FormStats, GoalsCall, Prediction};
use crate::standings::TeamStanding;

pub const INSUFFICIENT_DATA: &str = "Prediction unavailable - insufficient historical data.";

pub fn format_prediction(prediction: Option<&Prediction>) -> String {
    let Some(p) = prediction else {
        return INSUFFICIENT_DATA.to_string();
    };

    let kickoff = p.kickoff.time().format("%H:%M");
    let verdict = match p.predicted_result {
        MatchResult::Home => "A Home Win is very likely to happen.",
        MatchResult::Draw => "A Draw is very likely to happen.",
        MatchResult::Away => "An Away Win is very likely to happen.",
    };
    let goals = match p.over_2_5 {
        GoalsCall::Over => "Over",
        GoalsCall::Under => "Under",
    };
    let btts = match p.btts {
        BttsCall::Yes => "Yes",
        BttsCall::No => "No",
    };

    format!(
        "Mathematical Prediction Analysis for this {league} game:\n\
         {home} meets {away} in a match in {league} at {kickoff}.\n\
         \n\
         Statistics predict a full time result of {score}.\n\
         \n\
         {verdict}\n\
         \n\
         The Analysis suggests {goals} 2.5 goals in this match.\n\
         \n\
         And a {btts} for both teams to score.\n\
         \n\
         Key Information:\n\
         {home_line}\n\
         {away_line}",
        league = p.league,
        home = p.home_team,
        away = p.away_team,
        score = p.predicted_score,
        home_line = tally_line(&p.home_team, &p.home_stats),
        away_line = tally_line(&p.away_team, &p.away_stats),
    )
}

fn tally_line(team: &str, stats: &FormStats) -> String {
    format!(
        "{team} - Last {} matches: {}W {}D {}L",
        stats.matches, stats.wins, stats.draws, stats.losses
    )
}

/// Plain-text standings for terminal output.
pub fn format_table(league: &str, table: &[TeamStanding]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", display_name(league));
    if table.is_empty() {
        let _ = writeln!(out, "  (no matches recorded)");
        return out;
    }
    let name_width = table
        .iter()
        .map(|t| t.team_name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let _ = writeln!(
        out,
        "{:>3}  {:<name_width$}  {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>4} {:>3}  Form",
        "Pos", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for (idx, t) in table.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<name_width$}  {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>+4} {:>3}  {}",
            t.position.unwrap_or(idx + 1),
            t.team_name,
            t.matches_played,
            t.wins,
            t.draws,
            t.losses,
            t.goals_for,
            t.goals_against,
            t.goal_difference,
            t.points,
            t.form_string(),
        );
    }
    out
}

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const UNKNOWN_LEAGUE: &str = "unknown virtual";

// Order matters: the substring fallback takes the first raw name it finds.
const LEAGUE_NAME_MAPPING: &[(&str, &str)] = &[
    ("england", "england virtual"),
    ("spain", "spain virtual"),
    ("italy", "italy virtual"),
    ("germany", "germany virtual"),
    ("france", "france virtual"),
    ("england virtual", "england virtual"),
    ("spain virtual", "spain virtual"),
    ("italy virtual", "italy virtual"),
    ("germany virtual", "germany virtual"),
    ("france virtual", "france virtual"),
];

const VIRTUAL_LEAGUES: &[(&str, &str, &str)] = &[
    ("england virtual", "sv:category:202120001", "England Virtual League"),
    ("spain virtual", "sv:category:202120002", "Spain Virtual League"),
    ("italy virtual", "sv:category:202120003", "Italy Virtual League"),
    ("germany virtual", "sv:category:202120004", "Germany Virtual League"),
    ("france virtual", "sv:category:202120005", "France Virtual League"),
];

static EXACT: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| LEAGUE_NAME_MAPPING.iter().copied().collect());

static DISPLAY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    VIRTUAL_LEAGUES
        .iter()
        .map(|(key, _, display)| (*key, *display))
        .collect()
});

/// Map any raw competition name onto its standardized lowercase key.
/// Total: unknown names become `"<base> virtual"`.
pub fn standardize_league_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN_LEAGUE.to_string();
    }

    let lower = trimmed.to_lowercase();
    if let Some(key) = EXACT.get(lower.as_str()) {
        return (*key).to_string();
    }

    if let Some((_, key)) = LEAGUE_NAME_MAPPING
        .iter()
        .find(|(raw_name, _)| lower.contains(raw_name))
    {
        return (*key).to_string();
    }

    let base = lower.replace("virtual", "");
    let base = base.trim();
    if base.is_empty() {
        return UNKNOWN_LEAGUE.to_string();
    }
    format!("{base} virtual")
}

pub fn display_name(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "Unknown Virtual League".to_string();
    }
    let key = standardize_league_name(raw);
    match DISPLAY.get(key.as_str()) {
        Some(display) => (*display).to_string(),
        None => title_case(&key),
    }
}

/// Results-API category id for a standardized league key.
pub fn category_id(key: &str) -> Option<&'static str> {
    VIRTUAL_LEAGUES
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, id, _)| *id)
}

pub fn known_leagues() -> impl Iterator<Item = &'static str> {
    VIRTUAL_LEAGUES.iter().map(|(key, _, _)| *key)
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

use std::collections::HashSet;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{info, warn};

use crate::match_record::RawEvent;

const BIZ_CODE_OK: i64 = 10000;

#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    pub total: Option<u64>,
    pub events: Vec<RawEvent>,
}

/// Read one page of the results API envelope:
/// `{ bizCode, message, data: { totalNum, tournaments: [{ events: [...] }] } }`.
pub fn parse_result_page(raw: &str) -> Result<ResultPage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ResultPage::default());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid result page json")?;

    if let Some(code) = v.get("bizCode").and_then(|c| c.as_i64())
        && code != BIZ_CODE_OK
    {
        let message = v
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        return Err(anyhow!("results api error {code}: {message}"));
    }

    let Some(data) = v.get("data") else {
        return Ok(ResultPage::default());
    };
    let total = data.get("totalNum").and_then(|n| n.as_u64());

    let mut events = Vec::new();
    if let Some(tournaments) = data.get("tournaments").and_then(|t| t.as_array()) {
        for tournament in tournaments {
            let Some(items) = tournament.get("events").and_then(|e| e.as_array()) else {
                continue;
            };
            for item in items {
                match serde_json::from_value::<RawEvent>(item.clone()) {
                    Ok(event) => events.push(event),
                    Err(err) => warn!("skipping undecodable event: {err}"),
                }
            }
        }
    }

    Ok(ResultPage { total, events })
}

/// Parse a file holding either a single page object or an array of pages.
pub fn parse_result_pages(raw: &str) -> Result<Vec<ResultPage>> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        let pages: Vec<Value> = serde_json::from_str(trimmed).context("invalid page list json")?;
        pages
            .iter()
            .enumerate()
            .map(|(idx, page)| {
                parse_result_page(&page.to_string()).with_context(|| format!("page {}", idx + 1))
            })
            .collect()
    } else {
        Ok(vec![parse_result_page(trimmed)?])
    }
}

/// Tracks events already taken across pages of one league fetch.
#[derive(Debug, Default)]
pub struct EventDeduper {
    seen: HashSet<String>,
    processed: u64,
    exhausted: bool,
}

impl EventDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns only events not seen on earlier pages. A page adding nothing
    /// new, or reaching the advertised total, ends pagination.
    pub fn take_new(&mut self, page: ResultPage) -> Vec<RawEvent> {
        let mut fresh = Vec::new();
        for event in page.events {
            if self.seen.insert(event.dedup_key()) {
                fresh.push(event);
            }
        }
        self.processed += fresh.len() as u64;
        if fresh.is_empty() || page.total.is_some_and(|total| self.processed >= total) {
            self.exhausted = true;
        }
        info!(
            new = fresh.len(),
            processed = self.processed,
            total = ?page.total,
            "result page merged"
        );
        fresh
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }
}

/// Merge pages in order until the deduper reports the end.
pub fn collect_events(pages: Vec<ResultPage>) -> Vec<RawEvent> {
    let mut deduper = EventDeduper::new();
    let mut out = Vec::new();
    for page in pages {
        if deduper.is_exhausted() {
            break;
        }
        out.extend(deduper.take_new(page));
    }
    out
}

// src/watchlist.rs
//! Watchlista – osobny kanał z wpisami podejrzeń. Całkowicie niezależna od
//! kartoteki: inne źródło, inny parser, żadnej wzajemnej wyłączności.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::discord::SearchMessage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistEntry {
    pub reason: String,
    pub date: DateTime<Utc>,
}

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Vorwurf:\s*(.+)|Grund:\s*(.+)").unwrap());

const DEFAULT_REASON: &str = "Kein Vorwurf angegeben";

/// Wpisy watchlisty dla użytkownika: filtr po markerze `ID: <user_id>`,
/// potem parsowanie powodu z każdej pasującej wiadomości.
pub fn collect_entries(messages: &[SearchMessage], user_id: &str) -> Vec<WatchlistEntry> {
    let marker = format!("ID: {user_id}");
    messages
        .iter()
        .filter(|m| m.content.contains(&marker))
        .map(|m| parse_entry(&m.content, m.timestamp))
        .collect()
}

/// Powód z linii zawierającej `vorwurf:`, z fallbackiem na `grund:`.
/// W odróżnieniu od pól kartoteki etykieta może stać w środku linii.
pub fn parse_entry(content: &str, date: DateTime<Utc>) -> WatchlistEntry {
    let line = content
        .split('\n')
        .find(|l| l.to_lowercase().contains("vorwurf:"))
        .or_else(|| content.split('\n').find(|l| l.to_lowercase().contains("grund:")));

    let mut reason = DEFAULT_REASON.to_string();
    if let Some(line) = line {
        if let Some(caps) = LABEL_RE.captures(line) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                let text = m.as_str().trim();
                if !text.is_empty() {
                    reason = text.to_string();
                }
            }
        }
    }

    WatchlistEntry { reason, date }
}

//! src/strafakte.rs
//! Strafakte – parser i agregator kartoteki moderacyjnej użytkownika.
//!
//! Zawiera:
//! - klasyfikację wpisów z kanału Strafakte (entbannung / entmute / warn /
//!   kara terminowa lub permanentna) z pól `Tat:` i `Strafe:`
//! - kategorie kar A–E/KICK wyprowadzane z tekstu kary (pierwsza pasująca
//!   reguła wygrywa, zob. `parse_strafe_kategorie`)
//! - liczenie wygaśnięcia kar terminowych (ułamkowe dni, ostre `>`)
//! - agregację do `StrafakteData` + serwis `Strafakte` z cache per user
//!
//! Uwaga: klasyfikacja jest czystą funkcją treści, stempla czasu i "teraz" –
//! całe IO siedzi w `discord::RestClient`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::discord::{RestClient, SearchMessage, UserProfile};
use crate::watchlist::{self, WatchlistEntry};

/* ==============================
   Kategorie i typy publiczne
   ============================== */

/// Kategoria kary wyprowadzana z tekstu `Strafe:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kategorie {
    /// "A" – 1h timeout
    #[serde(rename = "A")]
    OneHour,
    /// "B" – ostrzeżenie
    #[serde(rename = "B")]
    Warn,
    /// "C" – ban do 3 dni
    #[serde(rename = "C")]
    ShortBan,
    /// "D" – ban do 7 dni
    #[serde(rename = "D")]
    MediumBan,
    /// "E" – ban powyżej 7 dni albo permanentny
    #[serde(rename = "E")]
    PermBan,
    #[serde(rename = "KICK")]
    Kick,
    #[serde(rename = "?")]
    Unknown,
}

impl Kategorie {
    pub fn code(self) -> &'static str {
        match self {
            Kategorie::OneHour => "A",
            Kategorie::Warn => "B",
            Kategorie::ShortBan => "C",
            Kategorie::MediumBan => "D",
            Kategorie::PermBan => "E",
            Kategorie::Kick => "KICK",
            Kategorie::Unknown => "?",
        }
    }

    /// E i KICK nigdy nie wygasają.
    pub fn never_expires(self) -> bool {
        matches!(self, Kategorie::PermBan | Kategorie::Kick)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyEntry {
    pub text: String,
    pub category: Kategorie,
    pub expired: bool,
    pub days: i64,
    pub offense: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningEntry {
    pub offense: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnbanEntry {
    pub reason: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmuteEntry {
    pub date: DateTime<Utc>,
}

/// Wynik klasyfikacji pojedynczej wiadomości. Dokładnie jedna kategoria
/// na wiadomość; kolejność sprawdzeń jest częścią kontraktu.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Unban(UnbanEntry),
    Unmute(UnmuteEntry),
    Warning(WarningEntry),
    Penalty(PenaltyEntry),
    /// Bez `Strafe:` albo kategoria "?" – wpis nie liczy się nigdzie.
    Skip,
}

/// Błędy lookupu. Trafiają do `StrafakteData.error`, nigdy nie są rzucane
/// wyżej – UI sprawdza tylko to jedno pole. `NoEntries` jest osobnym
/// wariantem, a nie "pustym sukcesem": pusta kartoteka i padnięty fetch
/// wyglądają inaczej dla wołającego.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum LookupError {
    #[error("Kein Token")]
    NoToken,
    #[error("Kein Token (401)")]
    TokenExpired,
    #[error("API Fehler {status}")]
    Api { status: u16 },
    #[error("Keine Einträge gefunden")]
    NoEntries,
    #[error("Bots haben keine Strafakte")]
    BotUser,
    #[error("Serverfehler")]
    Other(String),
}

/// Zagregowana kartoteka – to konsumuje warstwa prezentacji.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrafakteData {
    pub warn_count: usize,
    pub unban_count: usize,
    pub unmute_count: usize,
    pub watchlist_count: usize,
    pub penalties: Vec<PenaltyEntry>,
    pub warnings: Vec<WarningEntry>,
    pub unbans: Vec<UnbanEntry>,
    pub unmutes: Vec<UnmuteEntry>,
    pub watchlist: Vec<WatchlistEntry>,
    /// Najdłuższa wciąż aktywna kara dniowa – ostrzega przed eskalacją.
    pub newest_active_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LookupError>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl StrafakteData {
    pub fn failed(error: LookupError, profile: Option<&UserProfile>) -> Self {
        Self {
            error: Some(error),
            username: profile.map(|p| p.username.clone()),
            avatar_url: profile.and_then(|p| p.avatar_url()),
            ..Self::default()
        }
    }

    /// Boty nie mają kartoteki – zwracamy od razu, bez żadnego zapytania.
    pub fn for_bot(profile: &UserProfile) -> Self {
        Self {
            error: Some(LookupError::BotUser),
            username: Some(profile.username.clone()),
            avatar_url: profile.avatar_url(),
            ..Self::default()
        }
    }
}

/* ==============================
   Słowa kluczowe i wzorce
   ============================== */

const UNBAN_KEYWORDS: &[&str] = &[
    "unbann",
    "entbannung",
    "entban",
    "unban",
    "entbannungsantrag",
    "entbannungsgesuch",
    "entbannungantrag",
    "entbannungs anfrage",
    "unban request",
    "entbitten",
];

const UNMUTE_KEYWORDS: &[&str] = &[
    "entmute", "unmute", "entmuten", "unmuten", "entmuted", "unmuted", "entmutet", "unmutet",
];

/// Fraza wykluczająca wniosek o entbannung mimo słów kluczowych.
const NO_UNBAN_MARKER: &str = "keine chance auf entbannung";

static MD_BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*\*|\*\*$").unwrap());
static DAYS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)d").unwrap());

/* ==============================
   Klasyfikacja
   ============================== */

/// Kategoria z tekstu `Strafe:`. Reguły w kolejności, pierwsza wygrywa:
/// ban (bez unban/entban) -> warn -> kick -> 1h -> `<N>d` -> "?".
pub fn parse_strafe_kategorie(strafe: &str) -> Kategorie {
    let clean = MD_BOLD_RE.replace_all(strafe, "");
    let clean = clean.trim().to_lowercase();

    if clean.contains("ban") && !clean.contains("unban") && !clean.contains("entban") {
        return Kategorie::PermBan;
    }

    if clean.contains("warn") {
        return Kategorie::Warn;
    }
    if clean.contains("kick") {
        return Kategorie::Kick;
    }
    if clean.contains("1h") || clean.contains("1 h") || clean.contains("1 stunde") {
        return Kategorie::OneHour;
    }

    if let Some(caps) = DAYS_RE.captures(&clean) {
        let days: i64 = caps[1].parse().unwrap_or(i64::MAX);
        return if days <= 3 {
            Kategorie::ShortBan
        } else if days <= 7 {
            Kategorie::MediumBan
        } else {
            Kategorie::PermBan
        };
    }

    Kategorie::Unknown
}

/// Wiek wpisu w dniach, ułamkowo – bez zaokrąglania do dni kalendarzowych.
pub fn age_in_days(date: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - date).num_milliseconds() as f64 / 86_400_000.0
}

pub fn is_expired(kat: Kategorie, age_days: f64) -> bool {
    match kat {
        Kategorie::OneHour => age_days > 1.0,
        Kategorie::ShortBan => age_days > 30.0,
        Kategorie::MediumBan => age_days > 60.0,
        // PermBan i Kick nie wygasają; Warn/Unknown nie trafiają tutaj
        _ => false,
    }
}

/// Klasyfikacja jednej wiadomości z kanału Strafakte. Czysta funkcja –
/// dwukrotne wywołanie z tymi samymi argumentami daje ten sam wynik.
pub fn classify(content: &str, date: DateTime<Utc>, now: DateTime<Utc>) -> Classified {
    let lower = content.to_lowercase();

    // 1) wniosek o entbannung ma najwyższy priorytet
    let is_unban_request = UNBAN_KEYWORDS.iter().any(|k| lower.contains(k))
        && !lower.contains(NO_UNBAN_MARKER);
    if is_unban_request {
        let reason = line_value(content, "grund:")
            .unwrap_or_else(|| "Kein Grund angegeben".to_string());
        return Classified::Unban(UnbanEntry { reason, date });
    }

    // 2) entmute
    if UNMUTE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Classified::Unmute(UnmuteEntry { date });
    }

    // 3) pola Tat/Strafe; bez tekstu kary wpis w ogóle nie istnieje
    let offense =
        line_value(content, "tat:").unwrap_or_else(|| "Keine Tat angegeben".to_string());
    let Some(strafe) = line_value(content, "strafe:").filter(|s| !s.is_empty()) else {
        return Classified::Skip;
    };

    match parse_strafe_kategorie(&strafe) {
        Kategorie::Warn => Classified::Warning(WarningEntry { offense, date }),
        Kategorie::Unknown => Classified::Skip,
        kat => {
            let expired = !kat.never_expires() && is_expired(kat, age_in_days(date, now));
            let days = DAYS_RE
                .captures(&strafe)
                .and_then(|c| c[1].parse::<i64>().ok())
                .unwrap_or(0);
            Classified::Penalty(PenaltyEntry {
                text: strafe,
                category: kat,
                expired,
                days,
                offense,
                date,
            })
        }
    }
}

/// Pierwsza linia zaczynająca się (bez rozróżniania wielkości liter) od
/// `label`; zwraca przycięty tekst po etykiecie.
fn line_value(content: &str, label: &str) -> Option<String> {
    content
        .split('\n')
        .find_map(|line| strip_label(line, label))
        .map(str::to_string)
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    if line.len() >= label.len()
        && line.is_char_boundary(label.len())
        && line[..label.len()].eq_ignore_ascii_case(label)
    {
        Some(line[label.len()..].trim())
    } else {
        None
    }
}

/* ==============================
   Agregacja
   ============================== */

/// Składa kartotekę z surowych wiadomości obu kanałów. Wpisy bez markera
/// `ID: <user_id>` odpadają; reszta idzie od najnowszych do najstarszych.
pub fn build_summary(
    messages: &[SearchMessage],
    watchlist: Vec<WatchlistEntry>,
    user_id: &str,
    profile: Option<&UserProfile>,
    now: DateTime<Utc>,
) -> StrafakteData {
    let marker = format!("ID: {user_id}");
    let mut relevant: Vec<&SearchMessage> = messages
        .iter()
        .filter(|m| m.content.contains(&marker))
        .collect();
    relevant.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let username = profile
        .map(|p| p.username.clone())
        .unwrap_or_else(|| format!("Benutzer {user_id}"));
    let avatar_url = profile.and_then(|p| p.avatar_url());

    if relevant.is_empty() && watchlist.is_empty() {
        return StrafakteData {
            error: Some(LookupError::NoEntries),
            username: Some(username),
            avatar_url,
            ..StrafakteData::default()
        };
    }

    let mut data = StrafakteData {
        username: Some(username),
        avatar_url,
        ..StrafakteData::default()
    };

    for msg in relevant {
        match classify(&msg.content, msg.timestamp, now) {
            Classified::Unban(e) => {
                data.unban_count += 1;
                data.unbans.push(e);
            }
            Classified::Unmute(e) => {
                data.unmute_count += 1;
                data.unmutes.push(e);
            }
            Classified::Warning(e) => {
                data.warn_count += 1;
                data.warnings.push(e);
            }
            Classified::Penalty(e) => {
                if !e.expired && e.days > 0 && e.days > data.newest_active_days {
                    data.newest_active_days = e.days;
                }
                data.penalties.push(e);
            }
            Classified::Skip => {}
        }
    }

    data.watchlist_count = watchlist.len();
    data.watchlist = watchlist;
    data
}

/* ==============================
   Serwis
   ============================== */

pub struct Strafakte {
    rest: Arc<RestClient>,
    guild_id: u64,
    strafakte_channel_id: u64,
    watchlist_channel_id: u64,
    /// Cache per user – hover potrafi odpalić lookup kilka razy z rzędu.
    cache: Cache<String, Arc<StrafakteData>>,
}

impl Strafakte {
    pub fn new(settings: &Settings, rest: Arc<RestClient>) -> Arc<Self> {
        let ttl = settings.cache.summary_ttl_secs.unwrap_or(60);
        let max = settings.cache.max_entries.unwrap_or(512);
        Arc::new(Self {
            rest,
            guild_id: settings.discord.guild_id,
            strafakte_channel_id: settings.discord.strafakte_channel_id,
            watchlist_channel_id: settings.discord.watchlist_channel_id,
            cache: Cache::builder()
                .max_capacity(max)
                .time_to_live(Duration::from_secs(ttl))
                .build(),
        })
    }

    /// Pełny lookup kartoteki z cache.
    pub async fn lookup(&self, user_id: &str) -> Arc<StrafakteData> {
        if let Some(hit) = self.cache.get(user_id).await {
            tracing::debug!(user_id, "strafakte z cache");
            return hit;
        }

        let data = Arc::new(self.lookup_uncached(user_id, Utc::now()).await);

        // Błędy transportu/tokenu nie idą do cache – następna próba ma sens
        // od razu. Stany per-user (pusta kartoteka, bot) można trzymać.
        let cacheable = !matches!(
            data.error,
            Some(
                LookupError::NoToken
                    | LookupError::TokenExpired
                    | LookupError::Api { .. }
                    | LookupError::Other(_)
            )
        );
        if cacheable {
            self.cache.insert(user_id.to_string(), data.clone()).await;
        }
        data
    }

    async fn lookup_uncached(&self, user_id: &str, now: DateTime<Utc>) -> StrafakteData {
        // profil najpierw: boty odpadają zanim w ogóle ruszy wyszukiwanie
        let profile = match self.rest.fetch_user(user_id).await {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::debug!(user_id, error = %e, "profil niedostępny");
                None
            }
        };
        if let Some(p) = &profile {
            if p.bot {
                return StrafakteData::for_bot(p);
            }
        }

        let messages = match self
            .rest
            .search_messages(self.guild_id, self.strafakte_channel_id, user_id)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "strafakte fetch failed");
                return StrafakteData::failed(e, profile.as_ref());
            }
        };

        // watchlista jest niezależna; jej błąd nie wywraca całego lookupu
        let watchlist_msgs = match self
            .rest
            .search_messages(self.guild_id, self.watchlist_channel_id, user_id)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(user_id, error = %e, "watchlist fetch failed");
                Vec::new()
            }
        };
        let watchlist = watchlist::collect_entries(&watchlist_msgs, user_id);

        build_summary(&messages, watchlist, user_id, profile.as_ref(), now)
    }
}

/* ==============================
   Testy helperów
   ============================== */

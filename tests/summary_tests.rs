use chrono::{DateTime, Duration, TimeZone, Utc};

use r6de_support::discord::{SearchMessage, UserProfile};
use r6de_support::strafakte::{build_summary, Kategorie, LookupError, StrafakteData};
use r6de_support::watchlist::collect_entries;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn msg(content: &str, days_ago: i64) -> SearchMessage {
    SearchMessage {
        content: content.to_string(),
        timestamp: now() - Duration::days(days_ago),
    }
}

fn profile(bot: bool) -> UserProfile {
    UserProfile {
        id: "123".into(),
        username: "tigris".into(),
        bot,
        avatar: Some("abc".into()),
    }
}

#[test]
fn empty_channels_yield_no_entries_error() {
    let data = build_summary(&[], Vec::new(), "123", None, now());

    assert_eq!(data.error, Some(LookupError::NoEntries));
    assert_eq!(data.error.as_ref().unwrap().to_string(), "Keine Einträge gefunden");
    assert_eq!(data.warn_count, 0);
    assert_eq!(data.unban_count, 0);
    assert_eq!(data.unmute_count, 0);
    assert_eq!(data.watchlist_count, 0);
    assert!(data.penalties.is_empty());
    // bez profilu zostaje fallback na ID
    assert_eq!(data.username.as_deref(), Some("Benutzer 123"));
}

#[test]
fn messages_for_other_users_do_not_count() {
    let messages = vec![msg("ID: 999\nTat: Spam\nStrafe: Ban", 1)];
    let data = build_summary(&messages, Vec::new(), "123", None, now());
    assert_eq!(data.error, Some(LookupError::NoEntries));
}

#[test]
fn watchlist_alone_prevents_no_entries() {
    let watch_msgs = vec![msg("ID: 123\nVorwurf: Scam", 1)];
    let watchlist = collect_entries(&watch_msgs, "123");
    let data = build_summary(&[], watchlist, "123", None, now());

    assert_eq!(data.error, None);
    assert_eq!(data.watchlist_count, 1);
    assert_eq!(data.watchlist[0].reason, "Scam");
}

#[test]
fn bot_user_gets_fixed_outcome_without_any_search() {
    let data = StrafakteData::for_bot(&profile(true));

    assert_eq!(data.error, Some(LookupError::BotUser));
    assert_eq!(
        data.error.as_ref().unwrap().to_string(),
        "Bots haben keine Strafakte"
    );
    assert_eq!(data.username.as_deref(), Some("tigris"));
    assert!(data.avatar_url.as_deref().unwrap().contains("/avatars/123/abc"));
    assert_eq!(data.warn_count + data.unban_count + data.watchlist_count, 0);
}

#[test]
fn plain_ban_message_yields_single_perm_penalty() {
    let messages = vec![msg("Strafakte\nID: 123\nStrafe: **Ban**", 2)];
    let data = build_summary(&messages, Vec::new(), "123", Some(&profile(false)), now());

    assert_eq!(data.error, None);
    assert_eq!(data.penalties.len(), 1);
    let p = &data.penalties[0];
    assert_eq!(p.category, Kategorie::PermBan);
    assert_eq!(p.days, 0);
    assert!(!p.expired);
    assert_eq!(p.text, "**Ban**");
    assert_eq!(p.offense, "Keine Tat angegeben");
    assert_eq!(data.newest_active_days, 0);
    assert_eq!(data.username.as_deref(), Some("tigris"));
}

#[test]
fn mixed_history_aggregates_per_kind() {
    let messages = vec![
        msg("ID: 123\nTat: Beleidigung\nStrafe: Warn", 2),
        msg("Entbannungsantrag\nID: 123\nGrund: Einsicht", 5),
        msg("ID: 123\nUser wurde entmutet", 1),
        msg("ID: 123\nTat: Spam\nStrafe: 5d Mute", 3),
        msg("ID: 123\nTat: Alt-Account\nStrafe: 2d", 40),
        msg("ID: 999\nTat: fremd\nStrafe: Ban", 1),
        msg("ID: 123\nTat: ohne Strafe", 4),
    ];
    let watch_msgs = vec![msg("ID: 123\nVorwurf: Trolling", 6)];
    let watchlist = collect_entries(&watch_msgs, "123");

    let data = build_summary(&messages, watchlist, "123", Some(&profile(false)), now());

    assert_eq!(data.error, None);
    assert_eq!(data.warn_count, 1);
    assert_eq!(data.unban_count, 1);
    assert_eq!(data.unmute_count, 1);
    assert_eq!(data.watchlist_count, 1);
    assert_eq!(data.penalties.len(), 2);

    // 5d świeże i aktywne, 2d po 40 dniach wygasłe
    assert_eq!(data.penalties[0].category, Kategorie::MediumBan);
    assert!(!data.penalties[0].expired);
    assert_eq!(data.penalties[1].category, Kategorie::ShortBan);
    assert!(data.penalties[1].expired);
    assert_eq!(data.newest_active_days, 5);
}

#[test]
fn entries_are_ordered_newest_first() {
    let messages = vec![
        msg("ID: 123\nTat: alt\nStrafe: Warn", 20),
        msg("ID: 123\nTat: neu\nStrafe: Warn", 1),
        msg("ID: 123\nTat: mittel\nStrafe: Warn", 10),
    ];
    let data = build_summary(&messages, Vec::new(), "123", None, now());

    let offenses: Vec<&str> = data.warnings.iter().map(|w| w.offense.as_str()).collect();
    assert_eq!(offenses, vec!["neu", "mittel", "alt"]);
}

#[test]
fn active_days_ignore_expired_and_day_less_penalties() {
    let messages = vec![
        // 1h i permanentny ban nie mają komponentu dniowego
        msg("ID: 123\nStrafe: 1h Mute", 0),
        msg("ID: 123\nStrafe: Ban", 0),
        // wygasła kara dniowa też nie liczy się do eskalacji
        msg("ID: 123\nStrafe: 3d", 35),
    ];
    let data = build_summary(&messages, Vec::new(), "123", None, now());

    assert_eq!(data.penalties.len(), 3);
    assert_eq!(data.newest_active_days, 0);
}

#[test]
fn perm_ban_with_day_count_feeds_active_days() {
    // E nie wygasa, więc jego licznik dni zostaje aktywny na zawsze
    let messages = vec![msg("ID: 123\nStrafe: Ban 14d", 300)];
    let data = build_summary(&messages, Vec::new(), "123", None, now());

    assert_eq!(data.penalties[0].category, Kategorie::PermBan);
    assert!(!data.penalties[0].expired);
    assert_eq!(data.newest_active_days, 14);
}

#[test]
fn error_display_matches_ui_strings() {
    assert_eq!(LookupError::NoToken.to_string(), "Kein Token");
    assert_eq!(LookupError::TokenExpired.to_string(), "Kein Token (401)");
    assert_eq!(LookupError::Api { status: 404 }.to_string(), "API Fehler 404");
    assert_eq!(LookupError::Other("boom".into()).to_string(), "Serverfehler");
}

#[test]
fn summary_serializes_without_error_field_on_success() {
    let messages = vec![msg("ID: 123\nTat: Spam\nStrafe: Warn", 1)];
    let data = build_summary(&messages, Vec::new(), "123", None, now());

    let json = serde_json::to_value(&data).unwrap();
    assert!(json.get("error").is_none());
    assert_eq!(json["warn_count"], 1);
    assert_eq!(json["warnings"][0]["offense"], "Spam");
}

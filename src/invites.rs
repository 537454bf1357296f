// src/invites.rs
//! Podgląd zaproszeń: wyciąganie kodu z treści wiadomości i typowany
//! odczyt danych z endpointu `/invites/<code>` (pobiera `RestClient`).

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static INVITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(www\.)?(discord\.gg|discord\.com/invite)/([\w-]+)").unwrap()
});

/// Emoji wg typu kanału (indeks = discordowy typ kanału).
const CHANNEL_EMOJIS: [&str; 9] = ["💬", "📱", "🔊", "👥", "📁", "📢", "🛒", "🎭", "💭"];

/// Kod zaproszenia z pierwszego linku w tekście, jeśli jest.
pub fn invite_code(text: &str) -> Option<&str> {
    INVITE_RE
        .captures(text)
        .and_then(|caps| caps.get(3))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InviteGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InviteChannel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: u8,
}

/// Odpowiedź `/invites/<code>?with_counts=true&with_expiration=true`.
/// Prywatne zaproszenia nie zdradzają gildii – stąd wszystko opcjonalne.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InvitePreview {
    #[serde(default)]
    pub guild: Option<InviteGuild>,
    #[serde(default)]
    pub channel: Option<InviteChannel>,
    #[serde(default)]
    pub approximate_member_count: Option<u64>,
    #[serde(default)]
    pub approximate_presence_count: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl InvitePreview {
    pub fn guild_name(&self) -> &str {
        self.guild
            .as_ref()
            .map(|g| g.name.as_str())
            .unwrap_or("🔒 Privater Server")
    }

    pub fn icon_url(&self) -> Option<String> {
        let g = self.guild.as_ref()?;
        let icon = g.icon.as_ref()?;
        Some(format!(
            "https://cdn.discordapp.com/icons/{}/{}.png?size=128",
            g.id, icon
        ))
    }

    pub fn channel_name(&self) -> &str {
        self.channel
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .unwrap_or("general")
    }

    pub fn channel_emoji(&self) -> &'static str {
        let kind = self.channel.as_ref().map(|c| c.kind).unwrap_or(0);
        CHANNEL_EMOJIS.get(kind as usize).copied().unwrap_or("💬")
    }

    pub fn member_count_label(&self) -> String {
        match self.approximate_member_count {
            Some(n) => format!("{n} Mitglieder"),
            None => "??? Mitglieder".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_from_discord_gg() {
        assert_eq!(invite_code("kommt rein https://discord.gg/r6de"), Some("r6de"));
    }

    #[test]
    fn code_from_invite_path_with_www() {
        assert_eq!(
            invite_code("http://www.discord.com/invite/abc-123 gg"),
            Some("abc-123")
        );
    }

    #[test]
    fn no_code_in_plain_text() {
        assert_eq!(invite_code("https://example.com/invite/nope"), None);
        assert_eq!(invite_code("discord.gg/ohne-schema"), None);
    }

    #[test]
    fn voice_channel_gets_speaker_emoji() {
        let preview = InvitePreview {
            guild: None,
            channel: Some(InviteChannel {
                name: Some("talk".into()),
                kind: 2,
            }),
            approximate_member_count: Some(1200),
            approximate_presence_count: None,
            expires_at: None,
        };
        assert_eq!(preview.channel_emoji(), "🔊");
        assert_eq!(preview.member_count_label(), "1200 Mitglieder");
    }

    #[test]
    fn private_invite_falls_back() {
        let preview = InvitePreview {
            guild: None,
            channel: None,
            approximate_member_count: None,
            approximate_presence_count: None,
            expires_at: None,
        };
        assert_eq!(preview.guild_name(), "🔒 Privater Server");
        assert_eq!(preview.channel_name(), "general");
        assert_eq!(preview.icon_url(), None);
        // nieznany typ kanału dostaje domyślną ikonę
        assert_eq!(preview.channel_emoji(), "💬");
    }

    #[test]
    fn unknown_channel_kind_is_clamped() {
        let preview = InvitePreview {
            guild: None,
            channel: Some(InviteChannel {
                name: None,
                kind: 99,
            }),
            approximate_member_count: None,
            approximate_presence_count: None,
            expires_at: None,
        };
        assert_eq!(preview.channel_emoji(), "💬");
    }
}

// src/discord/mod.rs
//! Klient REST Discorda działający na user tokenie (tak jak klient webowy).
//! Stąd pochodzą surowe wiadomości z wyszukiwarki, profile użytkowników
//! i podglądy zaproszeń. Wszystkie błędy wychodzą jako `LookupError` –
//! warstwa wyżej nigdy nie dostaje wyjątku z transportu.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Settings;
use crate::invites::InvitePreview;
use crate::strafakte::LookupError;

/// Zmienna środowiskowa, z której host podaje świeży token.
const TOKEN_ENV: &str = "R6DE_DISCORD_TOKEN";

/* ===========================
   Globalny HTTP client
   =========================== */

static HTTP: OnceCell<reqwest::Client> = OnceCell::new();

fn http() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .user_agent("R6DE-Support/4.0")
            .connect_timeout(Duration::from_millis(1500))
            .timeout(Duration::from_millis(5000))
            .build()
            .expect("http client")
    })
}

/* ===========================
   Typy na granicy fetchu
   =========================== */

/// Wiadomość z wyszukiwarki – już sparsowana, klasyfikator nie widzi JSON-a.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchMessage {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Wyszukiwarka zwraca wiadomości w paczkach (`messages: [[..]]`).
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    messages: Vec<Vec<SearchMessage>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|hash| {
            format!(
                "https://cdn.discordapp.com/avatars/{}/{}.png?size=128",
                self.id, hash
            )
        })
    }
}

/* ===========================
   Klient
   =========================== */

pub struct RestClient {
    api_base: String,
    configured_token: String,
    /// Cache tokenu; czyszczony po 401.
    token: Mutex<Option<String>>,
}

impl RestClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_base = settings.discord.api_base.trim_end_matches('/').to_string();
        // walidacja na starcie zamiast błędu przy pierwszym zapytaniu
        Url::parse(&api_base)?;
        Ok(Self {
            api_base,
            configured_token: settings.discord.token.clone(),
            token: Mutex::new(None),
        })
    }

    /// Token z cache; przy braku – konfiguracja, potem zmienna środowiskowa
    /// (host może podmienić token w trakcie działania).
    fn token(&self) -> Option<String> {
        let mut slot = self.token.lock().unwrap();
        if slot.is_none() {
            let fresh = if !self.configured_token.trim().is_empty() {
                self.configured_token.clone()
            } else {
                std::env::var(TOKEN_ENV).unwrap_or_default()
            };
            if !fresh.trim().is_empty() {
                *slot = Some(fresh);
            }
        }
        slot.clone()
    }

    pub fn invalidate_token(&self) {
        self.token.lock().unwrap().take();
    }

    /// GET z autoryzacją. 401 -> jedno odświeżenie tokenu i jedna powtórka,
    /// nic więcej; kolejne 401 kończy się `TokenExpired`.
    async fn get_authorized(&self, url: &str) -> Result<reqwest::Response, LookupError> {
        let Some(token) = self.token() else {
            return Err(LookupError::NoToken);
        };
        let res = http()
            .get(url)
            .header(header::AUTHORIZATION, token.as_str())
            .send()
            .await
            .map_err(|e| LookupError::Other(e.to_string()))?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return check_status(res);
        }

        tracing::debug!(%url, "401 – odświeżam token i powtarzam");
        self.invalidate_token();
        let Some(token) = self.token() else {
            return Err(LookupError::TokenExpired);
        };
        let res = http()
            .get(url)
            .header(header::AUTHORIZATION, token.as_str())
            .send()
            .await
            .map_err(|e| LookupError::Other(e.to_string()))?;
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(LookupError::TokenExpired);
        }
        check_status(res)
    }

    /// Wyszukiwarka wiadomości: wszystkie wpisy kanału zawierające
    /// `ID: <user_id>`. Kształt zapytania identyczny jak w kliencie webowym.
    pub async fn search_messages(
        &self,
        guild_id: u64,
        channel_id: u64,
        user_id: &str,
    ) -> Result<Vec<SearchMessage>, LookupError> {
        let url = format!(
            "{}/guilds/{}/messages/search?content=ID%3A%20{}&channel_id={}&include_nsfw=true",
            self.api_base, guild_id, user_id, channel_id
        );
        let res = self.get_authorized(&url).await?;
        let body: SearchResponse = res
            .json()
            .await
            .map_err(|e| LookupError::Other(e.to_string()))?;
        Ok(body.messages.into_iter().flatten().collect())
    }

    pub async fn fetch_user(&self, user_id: &str) -> Result<UserProfile, LookupError> {
        let url = format!("{}/users/{}", self.api_base, user_id);
        let res = self.get_authorized(&url).await?;
        res.json()
            .await
            .map_err(|e| LookupError::Other(e.to_string()))
    }

    /// Podgląd zaproszenia – endpoint publiczny, bez autoryzacji.
    pub async fn fetch_invite(&self, code: &str) -> Result<InvitePreview, LookupError> {
        let url = format!(
            "{}/invites/{}?with_counts=true&with_expiration=true",
            self.api_base, code
        );
        let res = http()
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Other(e.to_string()))?;
        let res = check_status(res)?;
        res.json()
            .await
            .map_err(|e| LookupError::Other(e.to_string()))
    }
}

fn check_status(res: reqwest::Response) -> Result<reqwest::Response, LookupError> {
    if res.status().is_success() {
        Ok(res)
    } else {
        Err(LookupError::Api {
            status: res.status().as_u16(),
        })
    }
}

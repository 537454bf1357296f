use anyhow::Result;
use serde::{Deserialize, Serialize};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub env: String,
    pub app: App,
    pub discord: Discord,
    pub cache: CacheCfg,
    pub notes: NotesCfg,
    pub logging: Logging,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct App {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Discord {
    /// User token – najwygodniej przez R6DE_DISCORD_TOKEN.
    pub token: String,
    pub api_base: String,
    pub guild_id: u64,
    pub strafakte_channel_id: u64,
    pub watchlist_channel_id: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheCfg {
    pub summary_ttl_secs: Option<u64>,
    pub max_entries: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotesCfg {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logging {
    pub json: Option<bool>,
    pub level: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Które środowisko?
        let env = std::env::var("R6DE_ENV").unwrap_or_else(|_| "development".to_string());

        // Załaduj .env.<env> i .env (jeśli są)
        let _ = dotenvy::from_filename(format!(".env.{}", env));
        let _ = dotenvy::dotenv();

        // Domyślne wartości
        #[derive(Deserialize, Serialize)]
        struct Defaults {
            env: String,
            app: App,
            discord: Discord,
            cache: CacheCfg,
            notes: NotesCfg,
            logging: Logging,
        }

        let defaults = Defaults {
            env: env.clone(),
            app: App {
                name: "R6DE Support Tool".into(),
            },
            discord: Discord {
                token: "".into(),
                api_base: "https://discord.com/api/v9".into(),
                // stałe produkcyjne serwera R6DE
                guild_id: 787620905269854259,
                strafakte_channel_id: 795999721839525929,
                watchlist_channel_id: 843185952122077224,
            },
            cache: CacheCfg {
                summary_ttl_secs: Some(60),
                max_entries: Some(512),
            },
            notes: NotesCfg {
                path: "notes.json".into(),
            },
            logging: Logging {
                json: Some(false),
                level: Some("info".into()),
            },
        };

        // Warstwy: domyślne -> plik TOML -> zmienne środowiskowe R6DE_*
        let figment = Figment::from(Serialized::defaults(defaults))
            .merge(Toml::file(format!("config/{}.toml", env)))
            // R6DE_DISCORD_TOKEN => discord.token itd.
            .merge(Env::prefixed("R6DE_").split("_"));

        let mut s: Settings = figment.extract()?;
        s.env = env;

        // Uzupełnij brakujące domyślne
        if s.cache.summary_ttl_secs.is_none() {
            s.cache.summary_ttl_secs = Some(60);
        }

        Ok(s)
    }
}

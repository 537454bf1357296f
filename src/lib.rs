// src/lib.rs

pub mod config;
pub mod discord;
pub mod invites;
pub mod logging;
pub mod notes;
pub mod strafakte;
pub mod watchlist;

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use config::Settings;
use discord::RestClient;
use notes::NotesStore;
use strafakte::Strafakte;

/// Globalny kontekst aplikacji – jawna sesja zamiast luźnych globali.
/// Trzyma konfigurację, klienta REST, notatki i serwis Strafakte.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    rest: Arc<RestClient>,
    notes: Arc<NotesStore>,
    strafakte: OnceCell<Arc<Strafakte>>,
}

impl AppContext {
    /// Bootstrap całej aplikacji:
    /// - logi
    /// - klient REST (walidacja api_base, cache tokenu)
    /// - notatki z dysku
    /// - serwis Strafakte wstrzyknięty do OnceCell
    pub async fn bootstrap(settings: Settings) -> Result<Arc<Self>> {
        // 1) logi
        logging::init(&settings);

        // 2) REST
        let rest = Arc::new(RestClient::new(&settings)?);

        // 3) notatki
        let notes = Arc::new(NotesStore::load(settings.notes.path.clone()));

        // 4) kontekst (na razie z pustym OnceCell)
        let ctx = Arc::new(Self {
            settings,
            rest,
            notes,
            strafakte: OnceCell::new(),
        });

        // 5) Strafakte
        let svc = Strafakte::new(&ctx.settings, ctx.rest.clone());
        let _ = ctx.strafakte.set(svc); // set() można wołać tylko raz

        Ok(ctx)
    }

    /// Wygodny getter: daj mi serwis Strafakte (Arc).
    pub fn strafakte(&self) -> Arc<Strafakte> {
        self.strafakte
            .get()
            .expect("Strafakte not initialized")
            .clone()
    }

    pub fn rest(&self) -> Arc<RestClient> {
        self.rest.clone()
    }

    pub fn notes(&self) -> Arc<NotesStore> {
        self.notes.clone()
    }

    /// Domknięcie sesji (odpowiednik `stop` hosta): zrzut notatek.
    pub fn shutdown(&self) {
        if let Err(e) = self.notes.save() {
            tracing::warn!(error = %e, "notes flush failed");
        }
    }
}

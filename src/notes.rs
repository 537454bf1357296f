// src/notes.rs
//! Prywatne notatki moderatora per użytkownik. Jeden plik JSON
//! (`{ "<user_id>": "tekst", ... }`), w pamięci DashMap. Zapis jest
//! best-effort: błąd IO ląduje w logu, nigdy nie wywraca narzędzia.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Result;
use dashmap::DashMap;

pub struct NotesStore {
    path: PathBuf,
    notes: DashMap<String, String>,
}

impl NotesStore {
    /// Wczytuje notatki z dysku; brak pliku to normalny pierwszy start.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let notes = DashMap::new();
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    for (user_id, text) in map {
                        notes.insert(user_id, text);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "notes: plik nieczytelny, start od zera");
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "notes: odczyt nieudany");
            }
        }
        Self { path, notes }
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        self.notes.get(user_id).map(|n| n.clone())
    }

    /// Pusta (lub sama biała) notatka usuwa wpis.
    pub fn set(&self, user_id: &str, text: &str) {
        if text.trim().is_empty() {
            self.notes.remove(user_id);
        } else {
            self.notes.insert(user_id.to_string(), text.to_string());
        }
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "notes: zapis nieudany");
        }
    }

    pub fn remove(&self, user_id: &str) {
        self.set(user_id, "");
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Zrzut całości na dysk (BTreeMap dla stabilnej kolejności kluczy).
    pub fn save(&self) -> Result<()> {
        let map: BTreeMap<String, String> = self
            .notes
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect();
        let raw = serde_json::to_string_pretty(&map)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

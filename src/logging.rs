use crate::config::Settings;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::prelude::*;

/// Inicjalizacja logowania.
/// Poziom bierzemy z konfiguracji, RUST_LOG ma pierwszeństwo.
pub fn init(settings: &Settings) {
    let level = settings
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "info".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Prosty formatter tekstowy – wystarcza dla narzędzia jednego użytkownika.
    let fmt_layer = fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

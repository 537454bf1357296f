use anyhow::{bail, Result};
use std::sync::Arc;
use r6de_support::{config::Settings, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    let ctx: Arc<AppContext> = AppContext::bootstrap(settings).await?;

    let Some(user_id) = std::env::args().nth(1) else {
        bail!("Aufruf: r6de <user-id>");
    };
    // ID to 17-20 cyfr (snowflake)
    if !user_id.chars().all(|c| c.is_ascii_digit()) || !(17..=20).contains(&user_id.len()) {
        bail!("Ungültige Benutzer-ID: {user_id}");
    }

    let akte = ctx.strafakte().lookup(&user_id).await;
    println!("{}", serde_json::to_string_pretty(&*akte)?);

    ctx.shutdown();
    Ok(())
}

use bookrate::config::AppConfig;
use bookrate::db;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::from_env();
    let state = db::init_state(&cfg).await?;

    let _ = bookrate::rocket(state).launch().await?;
    Ok(())
}

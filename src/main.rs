use recipe_core::users::{create_superuser, normalize_email, ExtraFields, UserStore};
use recipe_core::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_core=debug,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let (state, pg) = AppState::init().await?;
    pg.migrate().await?;

    if let Some(seed) = state.config.superuser.clone() {
        let email = normalize_email(&seed.email);
        match state.store.find_user_by_email(&email).await? {
            Some(existing) => {
                tracing::info!(user_id = existing.id, "superuser already present; skipping seed");
            }
            None => {
                let user = create_superuser(
                    &*state.store,
                    &email,
                    Some(seed.password.as_str()),
                    ExtraFields::named("Administrator"),
                )
                .await?;
                tracing::info!(user_id = user.id, "superuser seeded");
            }
        }
    }

    tracing::info!("schema ready");
    Ok(())
}

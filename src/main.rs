mod admin;
mod app;
mod appwrite;
mod auth;
mod config;
mod error;
mod lookups;
mod pagination;
mod profiles;
mod schema;
mod state;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "platecheck=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    // Data paths retry the bootstrap on their own if this fails.
    if let Err(e) = app_state.schema.ensure(app_state.store.as_ref()).await {
        tracing::warn!(error = %e, "schema bootstrap failed; continuing");
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}

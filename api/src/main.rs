use std::time::Duration;

use comments_api::{
    App,
    config::{Env, ServerConfig},
    router,
};
use dotenv::dotenv;
use eyre::WrapErr;
use mimalloc::MiMalloc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_tracing(env: &Env) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "comments_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Env::Dev => registry.with(tracing_subscriber::fmt::layer()).init(),
        Env::Staging | Env::Production => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    // logging has to be up before the config warns about missing variables
    init_tracing(&Env::from_name(std::env::var("ENVIRONMENT").ok().as_deref()));

    let config = ServerConfig::new_from_env();
    let addr = config.listen_addr;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .wrap_err("couldn't build the HTTP client")?;

    let app = router(App::new(config, http));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("couldn't bind to {addr}"))?;

    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await.wrap_err("server error")?;

    Ok(())
}

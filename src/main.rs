// src/main.rs

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use race_registration_backend::{
    config::{settings::AppConfig, AppState},
    create_router,
    services::pix_sweeper::start_pix_sweep_worker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let bind_address = config.bind_address();
    let sweep_interval = config.pix_sweep_interval;

    let (app_state, db_pool) = AppState::new(config).await?;

    // Aplica as migrações do SQLx na inicialização
    sqlx::migrate!().run(&db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some(every) = sweep_interval {
        start_pix_sweep_worker(app_state.pix_sweeper.clone(), every);
    }

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

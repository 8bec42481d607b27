// Módulos de la aplicación
mod accumulator;
mod api;
mod app_state;
mod config;
mod decoder;
mod error;
mod explorer;
mod focus;
mod highlight;
mod mission;
mod models;
mod neo4j_client;
mod presets;

use crate::app_state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración y tabla de valores por defecto
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;
    let mission_defaults = mission::MissionDefaults::builtin()
        .context("Error cargando la tabla de valores por defecto de misiones")?;

    // 3. Conectar a Neo4j (el driver se inyecta en el estado, no es global)
    let graph = neo4j_client::connect_from_config(&cfg)
        .await
        .context("Error conectando a Neo4j")?;
    let source = Arc::new(neo4j_client::Neo4jSource::new(graph));

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 4. Crear estado compartido y precargar la consulta por defecto
    let app_state = AppState::new(cfg.clone(), source, mission_defaults, Some(shutdown_tx));
    if let Some(preset) = presets::find_preset(&cfg.default_preset) {
        if let Err((status, body)) = api::run_fetch(&app_state, preset).await {
            warn!("No se pudo precargar '{}' ({}): {}", preset.name, status, body.0);
        }
    }

    // 5. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .fallback_service(ServeDir::new(&cfg.static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let server_addr = &cfg.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    let server_url = format!("http://{}", server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    // Abrir el frontend en el navegador por defecto
    if cfg.open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use url::Url;

use crate::{
    accumulator::{build_graph, LinkMode},
    app_state::AppState,
    error::{ExplorerError, MissionError},
    explorer::{ExplorerStatus, FetchOutcome, FetchTicket, GraphExplorer, GraphView},
    highlight::HighlightFilter,
    mission::{resolve_defaults, validate_mission, Mission},
    models::{GraphData, RawRecord, RenderNode},
    presets::{find_preset, presets_by_category, PresetQuery},
};

type ApiError = (StatusCode, Json<Value>);

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct SelectPresetPayload {
    preset: String,
}

#[derive(Deserialize)]
pub struct NormalizePayload {
    records: Vec<Vec<Value>>,
    #[serde(default)]
    aggregate: bool,
}

#[derive(Deserialize)]
pub struct FocusPayload {
    node_id: String,
}

#[derive(Deserialize)]
pub struct HighlightPayload {
    types: Option<Vec<String>>,
    entity_types: Option<Vec<String>>,
}

/// Equivalente a marcar o desmarcar una casilla del panel lateral.
#[derive(Deserialize)]
pub struct HighlightTogglePayload {
    #[serde(rename = "type")]
    node_type: Option<String>,
    entity_type: Option<String>,
    enabled: bool,
}

#[derive(Deserialize)]
pub struct MissionPayload {
    mission: Mission,
}

#[derive(Serialize)]
pub struct PresetGroup {
    category: &'static str,
    presets: Vec<&'static PresetQuery>,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/presets", get(list_presets_handler))
        .route("/api/graph", get(graph_view_handler))
        .route("/api/graph/select", post(select_preset_handler))
        .route("/api/graph/refresh", post(refresh_handler))
        .route("/api/graph/normalize", post(normalize_handler))
        .route("/api/graph/nodes/:id", get(node_details_handler))
        .route("/api/graph/focus", post(focus_handler))
        .route("/api/graph/unfocus", post(unfocus_handler))
        .route("/api/graph/highlight", put(highlight_handler))
        .route("/api/graph/highlight/toggle", post(highlight_toggle_handler))
        .route("/api/mission/options", get(mission_options_handler))
        .route("/api/mission/defaults", post(mission_defaults_handler))
        .route("/api/mission/validate", post(mission_validate_handler))
        .route("/api/status", get(status_handler))
        .route("/api/neo4j-info", get(neo4j_info_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers del grafo ---

#[axum::debug_handler]
async fn list_presets_handler() -> Json<Vec<PresetGroup>> {
    let groups = presets_by_category()
        .into_iter()
        .map(|(category, presets)| PresetGroup { category, presets })
        .collect();
    Json(groups)
}

#[axum::debug_handler]
async fn graph_view_handler(State(state): State<AppState>) -> Result<Json<GraphView>, ApiError> {
    Ok(Json(lock_explorer(&state)?.view()))
}

#[axum::debug_handler]
async fn select_preset_handler(
    State(state): State<AppState>,
    Json(payload): Json<SelectPresetPayload>,
) -> Result<Json<GraphView>, ApiError> {
    let preset = find_preset(&payload.preset)
        .ok_or_else(|| explorer_error(ExplorerError::UnknownPreset(payload.preset.clone())))?;
    run_fetch(&state, preset).await
}

#[axum::debug_handler]
async fn refresh_handler(State(state): State<AppState>) -> Result<Json<GraphView>, ApiError> {
    let active = lock_explorer(&state)?.active_preset();
    let preset = match active {
        Some(preset) => preset,
        None => find_preset(&state.config.default_preset).ok_or_else(|| {
            explorer_error(ExplorerError::UnknownPreset(state.config.default_preset.clone()))
        })?,
    };
    run_fetch(&state, preset).await
}

/// Normaliza registros ya obtenidos por el navegador sin tocar el estado.
#[axum::debug_handler]
async fn normalize_handler(Json(payload): Json<NormalizePayload>) -> Result<Json<GraphData>, ApiError> {
    let records: Vec<RawRecord> = payload.records.into_iter().map(RawRecord::from_json).collect();
    build_graph(&records, LinkMode::from_flag(payload.aggregate))
        .map(Json)
        .map_err(explorer_error)
}

#[axum::debug_handler]
async fn node_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderNode>, ApiError> {
    let explorer = lock_explorer(&state)?;
    explorer
        .node_details(&id)
        .cloned()
        .map(Json)
        .map_err(explorer_error)
}

#[axum::debug_handler]
async fn focus_handler(
    State(state): State<AppState>,
    Json(payload): Json<FocusPayload>,
) -> Result<Json<GraphView>, ApiError> {
    let mut explorer = lock_explorer(&state)?;
    explorer.click_node(&payload.node_id).map_err(explorer_error)?;
    Ok(Json(explorer.view()))
}

#[axum::debug_handler]
async fn unfocus_handler(State(state): State<AppState>) -> Result<Json<GraphView>, ApiError> {
    let mut explorer = lock_explorer(&state)?;
    explorer.unfocus();
    Ok(Json(explorer.view()))
}

#[axum::debug_handler]
async fn highlight_handler(
    State(state): State<AppState>,
    Json(payload): Json<HighlightPayload>,
) -> Result<Json<GraphView>, ApiError> {
    let mut explorer = lock_explorer(&state)?;
    let mut filter: HighlightFilter = explorer.highlight().clone();
    if let Some(types) = payload.types {
        filter.enabled_types = types.into_iter().collect();
    }
    if let Some(entity_types) = payload.entity_types {
        filter.enabled_entity_types = entity_types.into_iter().collect();
    }
    explorer.set_highlight(filter);
    Ok(Json(explorer.view()))
}

#[axum::debug_handler]
async fn highlight_toggle_handler(
    State(state): State<AppState>,
    Json(payload): Json<HighlightTogglePayload>,
) -> Result<Json<GraphView>, ApiError> {
    let mut explorer = lock_explorer(&state)?;
    if let Some(node_type) = &payload.node_type {
        explorer.set_type_enabled(node_type, payload.enabled);
    }
    if let Some(entity_type) = &payload.entity_type {
        explorer.set_entity_type_enabled(entity_type, payload.enabled);
    }
    Ok(Json(explorer.view()))
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Result<Json<ExplorerStatus>, ApiError> {
    Ok(Json(lock_explorer(&state)?.status()))
}

// --- Handlers del planificador de misiones ---

#[axum::debug_handler]
async fn mission_options_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "types": state.mission_defaults.mission_types() }))
}

#[axum::debug_handler]
async fn mission_defaults_handler(
    State(state): State<AppState>,
    Json(payload): Json<MissionPayload>,
) -> Result<Json<Value>, ApiError> {
    match resolve_defaults(&payload.mission, &state.mission_defaults) {
        Ok(mission) => Ok(Json(json!({ "mission": mission }))),
        Err(err) => Err(mission_error(err)),
    }
}

#[axum::debug_handler]
async fn mission_validate_handler(Json(payload): Json<MissionPayload>) -> Result<Json<Value>, ApiError> {
    validate_mission(&payload.mission).map_err(mission_error)?;
    Ok(Json(json!({ "valid": true })))
}

// --- Salud y apagado ---

#[axum::debug_handler]
async fn neo4j_info_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, StatusCode> {
    let browser_url = browser_url(&state.config.neo4j_uri);

    match state.source.ping().await {
        Ok(()) => Ok(Json(json!({ "status": "ok", "browser_url": browser_url }))),
        Err(e) => {
            error!("Error en el health check de Neo4j: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Ok(mut sender) = state.shutdown_sender.lock() {
        if let Some(sender) = sender.take() {
            let _ = sender.send(());
        }
    }
    StatusCode::OK
}

// --- Utilidades ---

/// Neo4j Browser escucha en HTTP/7474 del mismo host que el Bolt configurado.
/// `neo4j://` no es un esquema especial para `url`, así que no se puede
/// cambiar a `http` con `set_scheme`: se reconstruye desde el host.
fn browser_url(neo4j_uri: &str) -> String {
    let host = Url::parse(neo4j_uri)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string());
    format!("http://{host}:7474")
}

/// Carga en curso. Si el future de la petición se suelta antes de completar
/// (cliente desconectado), el `Drop` libera la bandera de carga.
struct PendingFetch {
    explorer: Arc<Mutex<GraphExplorer>>,
    ticket: Option<FetchTicket>,
}

impl PendingFetch {
    fn finish(mut self) {
        self.ticket = None;
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            if let Ok(mut explorer) = self.explorer.lock() {
                explorer.abandon_fetch(&ticket);
            }
        }
    }
}

/// Carga una consulta sin mantener el cerrojo durante la espera.
pub async fn run_fetch(state: &AppState, preset: &'static PresetQuery) -> Result<Json<GraphView>, ApiError> {
    let ticket = lock_explorer(state)?.begin_fetch(preset);
    info!("Cargando consulta '{}' (token {})", preset.name, ticket.token);
    let pending = PendingFetch {
        explorer: Arc::clone(&state.explorer),
        ticket: Some(ticket.clone()),
    };

    let result = state
        .source
        .fetch_records(preset)
        .await
        .map_err(ExplorerError::from);
    // Se desarma antes de tomar el cerrojo.
    pending.finish();

    let mut explorer = lock_explorer(state)?;
    match explorer.complete_fetch(&ticket, result) {
        FetchOutcome::Applied => Ok(Json(explorer.view())),
        FetchOutcome::Stale => Err((
            StatusCode::CONFLICT,
            Json(json!({"error": "La consulta fue reemplazada por una selección posterior."})),
        )),
        FetchOutcome::Failed(err) => Err(explorer_error(err)),
    }
}

fn lock_explorer(state: &AppState) -> Result<MutexGuard<'_, GraphExplorer>, ApiError> {
    state.explorer.lock().map_err(|_| {
        error!("El estado del explorador quedó envenenado");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Estado del explorador no disponible."})),
        )
    })
}

fn explorer_error(err: ExplorerError) -> ApiError {
    let status = match err {
        ExplorerError::FetchFailure(_) => StatusCode::BAD_GATEWAY,
        ExplorerError::MalformedAggregateRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ExplorerError::UnknownPreset(_) | ExplorerError::UnknownNode(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(json!({"error": err.to_string()})))
}

fn mission_error(err: MissionError) -> ApiError {
    match err {
        MissionError::NoDefaultsForType(_) | MissionError::NoDefaultsForPhase { .. } => {
            warn!("{}", err);
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": err.to_string(), "notice": "No defaults found for this selection."})),
            )
        }
        MissionError::MissingRequiredField(ref fields) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": err.to_string(), "missing": fields})),
        ),
        MissionError::InvalidTable(_) => {
            error!("{}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
        }
    }
}

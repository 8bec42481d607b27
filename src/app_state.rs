use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use crate::{
    config::AppConfig, explorer::GraphExplorer, mission::MissionDefaults,
    neo4j_client::GraphSource,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub source: Arc<dyn GraphSource>,
    pub explorer: Arc<Mutex<GraphExplorer>>,
    pub mission_defaults: Arc<MissionDefaults>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        source: Arc<dyn GraphSource>,
        mission_defaults: MissionDefaults,
        shutdown_tx: Option<oneshot::Sender<()>>,
    ) -> Self {
        Self {
            config,
            source,
            explorer: Arc::new(Mutex::new(GraphExplorer::new())),
            mission_defaults: Arc::new(mission_defaults),
            shutdown_sender: Arc::new(Mutex::new(shutdown_tx)),
        }
    }
}

//! Estado de la página del grafo de conocimiento: consulta activa, grafo
//! normalizado, foco, filtros de resaltado y bandera de carga.
//!
//! Cada carga recibe un token creciente; sólo la respuesta del último token
//! emitido puede aplicarse. Las respuestas atrasadas se descartan.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    accumulator::build_graph,
    error::ExplorerError,
    focus::FocusState,
    highlight::HighlightFilter,
    models::{GraphData, RawRecord, RenderLink, RenderNode},
    presets::PresetQuery,
};

/// Resguardo de una carga en curso.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub token: u64,
    pub preset: &'static PresetQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied,
    Stale,
    Failed(ExplorerError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    #[serde(flatten)]
    pub node: RenderNode,
    pub highlighted: bool,
    pub in_focus: bool,
    pub emphasized: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    #[serde(flatten)]
    pub link: RenderLink,
    pub in_focus: bool,
    pub emphasized: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerStatus {
    pub loading: bool,
    pub active_preset: Option<&'static str>,
    pub node_count: usize,
    pub link_count: usize,
    pub dangling_links: usize,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Todo lo que el renderizador necesita para pintar el grafo.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub focus: FocusState,
    pub enabled_types: Vec<String>,
    pub enabled_entity_types: Vec<String>,
    pub status: ExplorerStatus,
}

#[derive(Debug, Default)]
pub struct GraphExplorer {
    active_preset: Option<&'static PresetQuery>,
    graph: GraphData,
    focus: FocusState,
    highlight: HighlightFilter,
    loading: bool,
    latest_token: u64,
    last_error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl GraphExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra el inicio de una carga y devuelve su token.
    pub fn begin_fetch(&mut self, preset: &'static PresetQuery) -> FetchTicket {
        self.latest_token += 1;
        self.loading = true;
        FetchTicket {
            token: self.latest_token,
            preset,
        }
    }

    /// Aplica el resultado de una carga si su token sigue siendo el último.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<RawRecord>, ExplorerError>,
    ) -> FetchOutcome {
        if ticket.token != self.latest_token {
            warn!(
                "Descartado resultado atrasado de '{}' (token {} < {})",
                ticket.preset.name, ticket.token, self.latest_token
            );
            return FetchOutcome::Stale;
        }
        self.loading = false;

        let graph = match result.and_then(|records| build_graph(&records, ticket.preset.link_mode())) {
            Ok(graph) => graph,
            Err(err) => {
                // Se conserva el grafo anterior.
                error!("Error cargando '{}': {}", ticket.preset.name, err);
                self.last_error = Some(err.to_string());
                return FetchOutcome::Failed(err);
            }
        };

        let dangling = graph.dangling_links().len();
        if dangling > 0 {
            warn!("'{}': {} enlaces apuntan a nodos ausentes", ticket.preset.name, dangling);
        }

        let same_preset = self.active_preset.is_some_and(|p| p.name == ticket.preset.name);
        self.graph = graph;
        self.active_preset = Some(ticket.preset);
        self.last_error = None;
        self.updated_at = Some(Utc::now());

        let keep_focus = same_preset
            && self
                .focus
                .focused_node()
                .is_some_and(|id| self.graph.contains_node(id));
        if keep_focus {
            self.focus.relink(&self.graph.links);
        } else {
            self.focus.unfocus();
        }

        info!(
            "Grafo '{}' reconstruido: {} nodos, {} enlaces",
            ticket.preset.name,
            self.graph.nodes.len(),
            self.graph.links.len()
        );
        FetchOutcome::Applied
    }

    /// Cierra una carga que nunca llegó a completarse, p. ej. porque el cliente
    /// HTTP se desconectó. Sólo la última carga emitida controla `loading`.
    pub fn abandon_fetch(&mut self, ticket: &FetchTicket) {
        if ticket.token == self.latest_token {
            warn!("Carga de '{}' abandonada (token {})", ticket.preset.name, ticket.token);
            self.loading = false;
        }
    }

    pub fn click_node(&mut self, node_id: &str) -> Result<&FocusState, ExplorerError> {
        if !self.graph.contains_node(node_id) {
            return Err(ExplorerError::UnknownNode(node_id.to_string()));
        }
        self.focus.click(node_id, &self.graph.links);
        Ok(&self.focus)
    }

    pub fn unfocus(&mut self) {
        self.focus.unfocus();
    }

    pub fn set_type_enabled(&mut self, node_type: &str, enabled: bool) {
        self.highlight.set_type_enabled(node_type, enabled);
    }

    pub fn set_entity_type_enabled(&mut self, entity_type: &str, enabled: bool) {
        self.highlight.set_entity_type_enabled(entity_type, enabled);
    }

    pub fn set_highlight(&mut self, highlight: HighlightFilter) {
        self.highlight = highlight;
    }

    pub fn highlight(&self) -> &HighlightFilter {
        &self.highlight
    }

    pub fn active_preset(&self) -> Option<&'static PresetQuery> {
        self.active_preset
    }

    pub fn node_details(&self, node_id: &str) -> Result<&RenderNode, ExplorerError> {
        self.graph
            .node(node_id)
            .ok_or_else(|| ExplorerError::UnknownNode(node_id.to_string()))
    }

    pub fn status(&self) -> ExplorerStatus {
        ExplorerStatus {
            loading: self.loading,
            active_preset: self.active_preset.map(|p| p.name),
            node_count: self.graph.nodes.len(),
            link_count: self.graph.links.len(),
            dangling_links: self.graph.dangling_links().len(),
            last_error: self.last_error.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Vista para el renderizador. Énfasis = resaltado y dentro del foco.
    pub fn view(&self) -> GraphView {
        let highlighted_by_id: HashMap<&str, bool> = self
            .graph
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), self.highlight.is_highlighted(node)))
            .collect();

        let nodes = self
            .graph
            .nodes
            .iter()
            .map(|node| {
                let highlighted = highlighted_by_id.get(node.id.as_str()).copied().unwrap_or(false);
                let in_focus = self.focus.is_node_in_focus(node);
                NodeView {
                    node: node.clone(),
                    highlighted,
                    in_focus,
                    emphasized: highlighted && in_focus,
                }
            })
            .collect();

        let links = self
            .graph
            .links
            .iter()
            .map(|link| {
                let in_focus = self.focus.is_link_in_focus(link);
                // Los extremos ausentes no vetan el énfasis.
                let endpoints_highlighted = [&link.source, &link.target]
                    .iter()
                    .all(|id| highlighted_by_id.get(id.as_str()).copied().unwrap_or(true));
                LinkView {
                    link: link.clone(),
                    in_focus,
                    emphasized: in_focus && endpoints_highlighted,
                }
            })
            .collect();

        GraphView {
            nodes,
            links,
            focus: self.focus.clone(),
            enabled_types: self.highlight.enabled_types.iter().cloned().collect(),
            enabled_entity_types: self.highlight.enabled_entity_types.iter().cloned().collect(),
            status: self.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{GraphNode, GraphRelationship, GraphValue, PropertyMap},
        presets::find_preset,
    };
    use serde_json::json;

    fn node(id: &str, label: &str) -> GraphValue {
        GraphValue::Node(GraphNode {
            identity: id.into(),
            labels: vec![label.into()],
            properties: PropertyMap::new(),
        })
    }

    fn rel(start: &str, end: &str) -> GraphValue {
        GraphValue::Relationship(GraphRelationship {
            identity: format!("{start}-{end}"),
            rel_type: "RELATION".into(),
            start: start.into(),
            end: end.into(),
            properties: PropertyMap::new(),
        })
    }

    fn relations() -> &'static PresetQuery {
        find_preset("Relations").unwrap()
    }

    fn records(pairs: &[(&str, &str)]) -> Vec<RawRecord> {
        pairs
            .iter()
            .map(|(a, b)| RawRecord::new(vec![node(a, "Entity"), rel(a, b), node(b, "Entity")]))
            .collect()
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let mut explorer = GraphExplorer::new();
        let first = explorer.begin_fetch(relations());
        let second = explorer.begin_fetch(find_preset("Results").unwrap());

        assert_eq!(
            explorer.complete_fetch(&second, Ok(records(&[("a", "b")]))),
            FetchOutcome::Applied
        );
        assert_eq!(
            explorer.complete_fetch(&first, Ok(records(&[("x", "y"), ("y", "z")]))),
            FetchOutcome::Stale
        );
        assert_eq!(explorer.active_preset().unwrap().name, "Results");
        assert_eq!(explorer.graph.nodes.len(), 2);
        assert!(!explorer.status().loading);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_graph() {
        let mut explorer = GraphExplorer::new();
        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b")])));

        let ticket = explorer.begin_fetch(relations());
        let outcome = explorer.complete_fetch(&ticket, Err(ExplorerError::FetchFailure("timeout".into())));
        assert!(matches!(outcome, FetchOutcome::Failed(ExplorerError::FetchFailure(_))));
        assert_eq!(explorer.graph.nodes.len(), 2);
        let status = explorer.status();
        assert!(!status.loading);
        assert!(status.last_error.unwrap().contains("timeout"));
    }

    #[test]
    fn test_malformed_aggregate_keeps_previous_graph() {
        let mut explorer = GraphExplorer::new();
        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b")])));

        let ticket = explorer.begin_fetch(find_preset("Co-occurring Topics").unwrap());
        let outcome = explorer.complete_fetch(&ticket, Ok(vec![RawRecord::new(vec![node("t", "Topic")])]));
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(ExplorerError::MalformedAggregateRecord { .. })
        ));
        assert_eq!(explorer.active_preset().unwrap().name, "Relations");
    }

    #[test]
    fn test_preset_change_clears_focus() {
        let mut explorer = GraphExplorer::new();
        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b")])));
        explorer.click_node("a").unwrap();

        let ticket = explorer.begin_fetch(find_preset("Results").unwrap());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b")])));
        assert_eq!(explorer.focus, FocusState::Unfocused);
    }

    #[test]
    fn test_refresh_recomputes_focus() {
        let mut explorer = GraphExplorer::new();
        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b")])));
        explorer.click_node("a").unwrap();

        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b"), ("c", "a")])));
        let connected: Vec<&str> = explorer
            .focus
            .connected()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(connected, vec!["a", "b", "c"]);

        // Si el nodo enfocado desaparece, se sale del foco.
        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("x", "y")])));
        assert_eq!(explorer.focus, FocusState::Unfocused);
    }

    #[test]
    fn test_view_combines_highlight_and_focus() {
        let mut explorer = GraphExplorer::new();
        let ticket = explorer.begin_fetch(relations());
        explorer.complete_fetch(&ticket, Ok(records(&[("a", "b"), ("b", "c")])));
        explorer.click_node("a").unwrap();

        let view = explorer.view();
        let c = view.nodes.iter().find(|n| n.node.id == "c").unwrap();
        assert!(c.highlighted);
        assert!(!c.in_focus);
        assert!(!c.emphasized);

        explorer.set_type_enabled("Entity", false);
        let view = explorer.view();
        let a = view.nodes.iter().find(|n| n.node.id == "a").unwrap();
        assert!(a.in_focus);
        assert!(!a.emphasized);
        assert!(view.links.iter().all(|l| !l.emphasized));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["nodes"][0]["type"], json!("Entity"));
        assert_eq!(json["nodes"][0]["inFocus"], json!(true));
        assert_eq!(json["focus"]["state"], json!("focused_on"));
    }

    #[test]
    fn test_abandoned_fetch_clears_loading() {
        let mut explorer = GraphExplorer::new();
        let first = explorer.begin_fetch(relations());
        let second = explorer.begin_fetch(relations());

        // Abandonar una carga ya reemplazada no toca la bandera.
        explorer.abandon_fetch(&first);
        assert!(explorer.status().loading);

        explorer.abandon_fetch(&second);
        assert!(!explorer.status().loading);
        assert_eq!(
            explorer.complete_fetch(&first, Ok(records(&[("a", "b")]))),
            FetchOutcome::Stale
        );
    }

    #[test]
    fn test_view_with_dangling_link_endpoint() {
        let mut explorer = GraphExplorer::new();
        let ticket = explorer.begin_fetch(relations());
        let records = vec![
            RawRecord::new(vec![node("a", "Entity"), rel("a", "b"), node("b", "Entity")]),
            RawRecord::new(vec![node("a", "Entity"), rel("a", "ghost")]),
        ];
        explorer.complete_fetch(&ticket, Ok(records));
        explorer.click_node("a").unwrap();

        let view = explorer.view();
        let dangling = view.links.iter().find(|l| l.link.target == "ghost").unwrap();
        assert!(dangling.in_focus);
        assert!(dangling.emphasized);
    }

    #[test]
    fn test_click_unknown_node() {
        let mut explorer = GraphExplorer::new();
        assert_eq!(
            explorer.click_node("nope").unwrap_err(),
            ExplorerError::UnknownNode("nope".into())
        );
    }
}

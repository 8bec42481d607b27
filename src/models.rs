//! Modelos de dominio: valores crudos del grafo (tal y como llegan del driver)
//! y los elementos renderizables que se entregan al frontend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Propiedades de un nodo o relación. Ordenadas para que la salida sea determinista.
pub type PropertyMap = BTreeMap<String, Value>;

/// Nodo del grafo tal y como lo devuelve el driver.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub identity: String,
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

/// Relación del grafo tal y como la devuelve el driver.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRelationship {
    pub identity: String,
    pub rel_type: String,
    pub start: String,
    pub end: String,
    pub properties: PropertyMap,
}

/// Valor de una columna ya clasificado en la frontera con el driver.
/// El resto del motor nunca vuelve a inspeccionar la forma del valor.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Node(GraphNode),
    Relationship(GraphRelationship),
    Scalar(Value),
    Empty,
}

/// Una fila del resultado de una consulta: secuencia ordenada de valores heterogéneos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub values: Vec<GraphValue>,
}

impl RawRecord {
    pub fn new(values: Vec<GraphValue>) -> Self {
        Self { values }
    }
}

/// Nodo listo para el renderizador (react-force-graph o similar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub props: PropertyMap,
}

/// Enlace listo para el renderizador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Resultado completo de una consulta, ya normalizado.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<RenderNode>,
    pub links: Vec<RenderLink>,
}

impl GraphData {
    pub fn node(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Enlaces cuyo origen o destino nunca apareció como nodo decodificado.
    /// No se inventan nodos de relleno; el renderizador debe tolerarlos.
    pub fn dangling_links(&self) -> Vec<&RenderLink> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.links
            .iter()
            .filter(|l| !ids.contains(l.source.as_str()) || !ids.contains(l.target.as_str()))
            .collect()
    }
}

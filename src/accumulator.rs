//! Pliegue de los registros de una consulta en el grafo renderizable.
//!
//! Los nodos se deduplican por id canónico (gana la primera aparición) y
//! conservan el orden de inserción. Los enlaces siguen el orden de los
//! registros y, dentro de cada uno, el orden de decodificación.

use std::collections::HashSet;

use serde_json::Value;

use crate::{
    decoder::decode_record,
    error::ExplorerError,
    models::{GraphData, GraphNode, GraphRelationship, GraphValue, RawRecord, RenderLink, RenderNode},
};

/// Tipo sintético de los enlaces derivados de un conteo.
pub const AGGREGATE_LINK_TYPE: &str = "CO_OCCURS";
/// Etiqueta genérica cuyas instancias llevan subtipo en la propiedad `type`.
pub const ENTITY_TYPE: &str = "Entity";

const LABEL_PROPERTIES: [&str; 4] = ["title", "name", "topic", "label"];

/// Cómo se obtienen los enlaces de cada registro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Los enlaces son las relaciones devueltas por la consulta.
    Relationships,
    /// Cada registro es (nodo, nodo, conteo) y produce un enlace con peso.
    Aggregate,
}

impl LinkMode {
    pub fn from_flag(produces_aggregate_link: bool) -> Self {
        if produces_aggregate_link {
            Self::Aggregate
        } else {
            Self::Relationships
        }
    }
}

/// Acumulador de una ejecución de consulta.
#[derive(Debug)]
pub struct GraphAccumulator {
    mode: LinkMode,
    seen: HashSet<String>,
    data: GraphData,
    records: usize,
}

impl GraphAccumulator {
    pub fn new(mode: LinkMode) -> Self {
        Self {
            mode,
            seen: HashSet::new(),
            data: GraphData::default(),
            records: 0,
        }
    }

    /// Incorpora un registro. En modo agregado falla si la forma no es
    /// exactamente dos nodos seguidos de un escalar numérico.
    pub fn push(&mut self, record: &RawRecord) -> Result<(), ExplorerError> {
        let index = self.records;
        self.records += 1;

        if self.mode == LinkMode::Aggregate {
            let (a, b, weight) = aggregate_shape(index, record)?;
            self.insert_node(a);
            self.insert_node(b);
            self.data.links.push(RenderLink {
                source: a.identity.clone(),
                target: b.identity.clone(),
                link_type: AGGREGATE_LINK_TYPE.to_string(),
                weight: Some(weight),
            });
            return Ok(());
        }

        let decoded = decode_record(record);
        for node in decoded.nodes {
            self.insert_node(node);
        }
        for rel in decoded.relationships {
            self.data.links.push(relationship_link(rel));
        }
        Ok(())
    }

    pub fn finish(self) -> GraphData {
        self.data
    }

    fn insert_node(&mut self, node: &GraphNode) {
        if self.seen.insert(node.identity.clone()) {
            self.data.nodes.push(render_node(node));
        }
    }
}

/// Construye el grafo completo de una consulta.
pub fn build_graph(records: &[RawRecord], mode: LinkMode) -> Result<GraphData, ExplorerError> {
    let mut acc = GraphAccumulator::new(mode);
    for record in records {
        acc.push(record)?;
    }
    Ok(acc.finish())
}

/// Nodo renderizable a partir del nodo del driver.
pub fn render_node(node: &GraphNode) -> RenderNode {
    let node_type = node
        .labels
        .first()
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());

    let label = LABEL_PROPERTIES
        .iter()
        .filter_map(|key| node.properties.get(*key))
        .find_map(display_value)
        .unwrap_or_else(|| format!("{} {}", node_type, node.identity));

    let entity_type = if node_type == ENTITY_TYPE {
        node.properties
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
    } else {
        None
    };

    RenderNode {
        id: node.identity.clone(),
        label,
        node_type,
        entity_type,
        props: node.properties.clone(),
    }
}

fn relationship_link(rel: &GraphRelationship) -> RenderLink {
    RenderLink {
        source: rel.start.clone(),
        target: rel.end.clone(),
        link_type: rel.rel_type.clone(),
        weight: None,
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn aggregate_shape(index: usize, record: &RawRecord) -> Result<(&GraphNode, &GraphNode, f64), ExplorerError> {
    let malformed = |reason: String| ExplorerError::MalformedAggregateRecord { record: index, reason };

    let present: Vec<&GraphValue> = record
        .values
        .iter()
        .filter(|v| !matches!(v, GraphValue::Empty))
        .collect();

    if let [first, second, third] = present[..] {
        if let (GraphValue::Node(a), GraphValue::Node(b), GraphValue::Scalar(count)) = (first, second, third) {
            let weight = count
                .as_f64()
                .ok_or_else(|| malformed(format!("el conteo no es numérico: {count}")))?;
            return Ok((a, b, weight));
        }
    }

    let nodes = present.iter().filter(|v| matches!(v, GraphValue::Node(_))).count();
    let scalars = present.iter().filter(|v| matches!(v, GraphValue::Scalar(_))).count();
    let rels = present.len() - nodes - scalars;
    Err(malformed(format!(
        "se esperaban dos nodos y un conteo final; llegaron {nodes} nodos, {rels} relaciones y {scalars} escalares"
    )))
}

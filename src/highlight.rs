//! Filtro de resaltado en dos dimensiones: tipo primario y, para los nodos
//! `Entity`, subtipo de entidad.

use std::collections::BTreeSet;

use crate::{accumulator::ENTITY_TYPE, models::RenderNode};

pub const KNOWN_TYPES: [&str; 4] = ["Paper", "Topic", "Entity", "Cluster"];

pub const KNOWN_ENTITY_TYPES: [&str; 9] = [
    "Study",
    "Method",
    "Environment",
    "Experimental Condition",
    "Result",
    "Quantitative Result",
    "Gene",
    "Microorganism",
    "Psychological Impact",
];

/// ¿Está resaltado el nodo con los conjuntos de tipos habilitados?
pub fn is_highlighted(
    node: &RenderNode,
    enabled_types: &BTreeSet<String>,
    enabled_entity_types: &BTreeSet<String>,
) -> bool {
    if !enabled_types.contains(&node.node_type) {
        return false;
    }
    match (&node.entity_type, node.node_type == ENTITY_TYPE) {
        (Some(entity_type), true) => enabled_entity_types.contains(entity_type),
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightFilter {
    pub enabled_types: BTreeSet<String>,
    pub enabled_entity_types: BTreeSet<String>,
}

impl Default for HighlightFilter {
    fn default() -> Self {
        Self {
            enabled_types: KNOWN_TYPES.iter().map(|t| t.to_string()).collect(),
            enabled_entity_types: KNOWN_ENTITY_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl HighlightFilter {
    pub fn is_highlighted(&self, node: &RenderNode) -> bool {
        is_highlighted(node, &self.enabled_types, &self.enabled_entity_types)
    }

    pub fn set_type_enabled(&mut self, node_type: &str, enabled: bool) {
        toggle(&mut self.enabled_types, node_type, enabled);
    }

    pub fn set_entity_type_enabled(&mut self, entity_type: &str, enabled: bool) {
        toggle(&mut self.enabled_entity_types, entity_type, enabled);
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str, enabled: bool) {
    if enabled {
        set.insert(value.to_string());
    } else {
        set.remove(value);
    }
}

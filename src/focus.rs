//! Modo foco: al hacer clic en un nodo sólo él y sus vecinos directos
//! conservan el énfasis visual.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{RenderLink, RenderNode};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FocusState {
    #[default]
    Unfocused,
    FocusedOn {
        node_id: String,
        connected: BTreeSet<String>,
    },
}

impl FocusState {
    /// Transición por clic sobre un nodo.
    pub fn click(&mut self, node_id: &str, links: &[RenderLink]) {
        *self = if self.focused_node() == Some(node_id) {
            Self::Unfocused
        } else {
            Self::FocusedOn {
                node_id: node_id.to_string(),
                connected: connected_ids(node_id, links),
            }
        };
    }

    pub fn unfocus(&mut self) {
        *self = Self::Unfocused;
    }

    /// Recalcula el vecindario del nodo enfocado contra un nuevo conjunto de enlaces.
    pub fn relink(&mut self, links: &[RenderLink]) {
        if let Self::FocusedOn { node_id, connected } = self {
            *connected = connected_ids(node_id, links);
        }
    }

    pub fn focused_node(&self) -> Option<&str> {
        match self {
            Self::Unfocused => None,
            Self::FocusedOn { node_id, .. } => Some(node_id),
        }
    }

    pub fn connected(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Unfocused => None,
            Self::FocusedOn { connected, .. } => Some(connected),
        }
    }

    pub fn is_id_in_focus(&self, id: &str) -> bool {
        self.connected().map_or(true, |set| set.contains(id))
    }

    pub fn is_node_in_focus(&self, node: &RenderNode) -> bool {
        self.is_id_in_focus(&node.id)
    }

    pub fn is_link_in_focus(&self, link: &RenderLink) -> bool {
        self.is_id_in_focus(&link.source) && self.is_id_in_focus(&link.target)
    }
}

/// {N} ∪ vecinos a un salto en cualquier dirección.
pub fn connected_ids(node_id: &str, links: &[RenderLink]) -> BTreeSet<String> {
    let mut ids = BTreeSet::from([node_id.to_string()]);
    for link in links {
        if link.source == node_id {
            ids.insert(link.target.clone());
        } else if link.target == node_id {
            ids.insert(link.source.clone());
        }
    }
    ids
}

//! Catálogo de consultas Cypher predefinidas del explorador.
//!
//! Cada plantilla declara sus columnas de retorno (el cliente Neo4j las lee en
//! ese orden para formar el `RawRecord`) y si sus filas codifican un enlace
//! agregado (dos nodos + conteo) en lugar de relaciones explícitas.

use serde::Serialize;

use crate::accumulator::LinkMode;

#[derive(Debug, Clone, Serialize)]
pub struct PresetQuery {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub cypher: &'static str,
    #[serde(skip)]
    pub columns: &'static [&'static str],
    /// Columnas que nunca son nodos ni relaciones (conteos, valores sueltos).
    #[serde(skip)]
    pub scalar_columns: &'static [&'static str],
    pub produces_aggregate_link: bool,
}

impl PresetQuery {
    pub fn link_mode(&self) -> LinkMode {
        LinkMode::from_flag(self.produces_aggregate_link)
    }

    /// Columnas que pueden traer un nodo o una relación.
    pub fn element_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .copied()
            .filter(|column| !self.scalar_columns.contains(column))
    }
}

pub const DEFAULT_PRESET: &str = "Topics Graph";

pub static PRESET_QUERIES: &[PresetQuery] = &[
    PresetQuery {
        name: "Topics Graph",
        category: "overview",
        description: "Overview of research clusters, topics, and papers",
        cypher: "MATCH (c:Cluster)-[r1:HAS_TOPIC]->(t:Topic)<-[r2:MENTIONS]-(p:Paper)
                 RETURN c, r1, t, r2, p LIMIT 2000",
        columns: &["c", "r1", "t", "r2", "p"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Research Landscape",
        category: "overview",
        description: "High-level view of research topics covered by NASA publications",
        cypher: "MATCH (n:Topic) RETURN n LIMIT 100",
        columns: &["n"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Paper Report",
        category: "overview",
        description: "Papers and their reported entities",
        cypher: "MATCH (p:Paper)-[r:REPORTS]->(e:Entity)
                 RETURN p, r, e LIMIT 2000",
        columns: &["p", "r", "e"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Study Environments",
        category: "study",
        description: "Study environments and experimental conditions",
        cypher: "MATCH (p:Paper)-[r1:REPORTS]->(env:Entity)
                 WHERE env.type = \"Environment\"
                 OPTIONAL MATCH (env)-[r2:RELATION]->(cond:Entity)
                 WHERE cond.type = \"Experimental Condition\"
                 RETURN p, r1, env, r2, cond LIMIT 2000",
        columns: &["p", "r1", "env", "r2", "cond"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Complete Study Design",
        category: "study",
        description: "Full study designs with all components",
        cypher: "MATCH (p:Paper)-[r1:REPORTS]->(study:Entity)
                 WHERE study.type = \"Study\"
                 OPTIONAL MATCH (study)-[r2:RELATION]->(comp:Entity)
                 WHERE comp.type IN [\"Method\", \"Environment\", \"Experimental Condition\"]
                 RETURN p, r1, study, r2, comp LIMIT 5000",
        columns: &["p", "r1", "study", "r2", "comp"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Papers and Results",
        category: "study",
        description: "Papers and their reported Results",
        cypher: "MATCH (p:Paper)-[r:REPORTS]->(e:Entity)
                 WHERE e.type = \"Result\"
                 RETURN p, r, e LIMIT 2000",
        columns: &["p", "r", "e"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Co-occurring Topics",
        category: "comparison",
        description: "Topics that appear together in papers",
        cypher: "MATCH (p:Paper)-[:MENTIONS]->(t1:Topic),
                       (p)-[:MENTIONS]->(t2:Topic)
                 WHERE t1 <> t2
                 WITH t1, t2, COUNT(p) AS co_occurrence
                 ORDER BY co_occurrence DESC LIMIT 2000
                 RETURN t1, t2, co_occurrence",
        columns: &["t1", "t2", "co_occurrence"],
        scalar_columns: &["co_occurrence"],
        produces_aggregate_link: true,
    },
    PresetQuery {
        name: "Highly Connected Entities",
        category: "network",
        description: "Top 500 most connected entities and their direct relationships",
        cypher: "MATCH (e:Entity)-[r:RELATION]-(other:Entity)
                 WITH e, COUNT(DISTINCT r) AS connections
                 ORDER BY connections DESC
                 LIMIT 500
                 MATCH (e)-[r2:RELATION]-(connected:Entity)
                 RETURN e, r2, connected
                 ORDER BY e.id, connections DESC",
        columns: &["e", "r2", "connected"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Results",
        category: "network",
        description: "Entities connected to Results",
        cypher: "MATCH (e:Entity)-[r:RELATION]-(related:Entity)
                 WHERE e.type = \"Result\" OR related.type = \"Result\"
                 RETURN e, r, related LIMIT 2000",
        columns: &["e", "r", "related"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
    PresetQuery {
        name: "Relations",
        category: "network",
        description: "All RELATION relationships between entities",
        cypher: "MATCH (e1:Entity)-[r:RELATION]-(e2:Entity)
                 RETURN e1, r, e2 LIMIT 2000",
        columns: &["e1", "r", "e2"],
        scalar_columns: &[],
        produces_aggregate_link: false,
    },
];

pub fn find_preset(name: &str) -> Option<&'static PresetQuery> {
    PRESET_QUERIES.iter().find(|p| p.name == name)
}

/// Agrupa el catálogo por categoría, en el orden en que aparece cada categoría.
pub fn presets_by_category() -> Vec<(&'static str, Vec<&'static PresetQuery>)> {
    let mut groups: Vec<(&'static str, Vec<&'static PresetQuery>)> = Vec::new();
    for preset in PRESET_QUERIES {
        match groups.iter_mut().find(|(category, _)| *category == preset.category) {
            Some((_, items)) => items.push(preset),
            None => groups.push((preset.category, vec![preset])),
        }
    }
    groups
}

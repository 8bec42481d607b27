//! Acceso al grafo de conocimiento en Neo4j.
//!
//! El explorador no conoce al driver: recibe un `GraphSource` inyectado. La
//! implementación real abre una conexión del pool por consulta (vía
//! `Graph::execute`) y la libera al soltar el stream, también ante errores.
//! Aquí, en la frontera, cada columna se convierte en `GraphValue`.
//!
//! El driver sólo permite leer propiedades por nombre, así que cada consulta
//! se envuelve para devolver también `keys(x)` de cada columna que puede
//! traer un nodo o una relación.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use neo4rs::{query, Graph, Node, Relation, Row};
use serde_json::{json, Number, Value};
use tracing::{debug, info};
use url::Url;

use crate::{
    config::AppConfig,
    models::{GraphNode, GraphRelationship, GraphValue, PropertyMap, RawRecord},
    presets::PresetQuery,
};

/// Proveedor de resultados de consultas predefinidas.
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn fetch_records(&self, preset: &PresetQuery) -> Result<Vec<RawRecord>>;

    /// Comprobación de salud del servicio de grafos.
    async fn ping(&self) -> Result<()>;
}

pub async fn connect_from_config(cfg: &AppConfig) -> Result<Graph> {
    let url = Url::parse(&cfg.neo4j_uri)?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    let addr = format!("{host}:{port}");

    info!("Conectando a Neo4j en {addr}...");
    let graph = Graph::new(&addr, &cfg.neo4j_user, &cfg.neo4j_password).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

/// `GraphSource` respaldado por neo4rs.
pub struct Neo4jSource {
    graph: Graph,
}

impl Neo4jSource {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl GraphSource for Neo4jSource {
    async fn fetch_records(&self, preset: &PresetQuery) -> Result<Vec<RawRecord>> {
        debug!("Ejecutando consulta '{}'", preset.name);
        let mut cursor = self.graph.execute(query(&element_query(preset))).await?;

        let mut records = Vec::new();
        while let Some(row) = cursor.next().await? {
            let values = preset
                .columns
                .iter()
                .map(|column| decode_column(&row, column))
                .collect();
            records.push(RawRecord::new(values));
        }

        info!("Consulta '{}': {} filas", preset.name, records.len());
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        let mut cursor = self.graph.execute(query("RETURN 1 AS ok")).await?;
        cursor
            .next()
            .await?
            .ok_or_else(|| anyhow!("Neo4j no devolvió filas en el health check"))?;
        Ok(())
    }
}

/// Lee un valor por nombre probando los tipos que el driver sabe convertir.
/// Sirve igual para `Row`, `Node` y `Relation`, que comparten `get::<T>`.
macro_rules! read_value {
    ($source:expr, $key:expr) => {{
        let source = &$source;
        let key: &str = $key;
        if let Some(v) = source.get::<String>(key) {
            Some(Value::String(v))
        } else if let Some(v) = source.get::<i64>(key) {
            Some(Value::from(v))
        } else if let Some(v) = source.get::<f64>(key) {
            Some(Number::from_f64(v).map_or(Value::Null, Value::Number))
        } else if let Some(v) = source.get::<bool>(key) {
            Some(Value::Bool(v))
        } else if let Some(v) = source.get::<chrono::NaiveDate>(key) {
            Some(Value::String(v.to_string()))
        } else if let Some(v) = source.get::<chrono::DateTime<chrono::FixedOffset>>(key) {
            Some(Value::String(v.to_rfc3339()))
        } else if let Some(v) = source.get::<Vec<String>>(key) {
            Some(json!(v))
        } else if let Some(v) = source.get::<Vec<i64>>(key) {
            Some(json!(v))
        } else if let Some(v) = source.get::<Vec<f64>>(key) {
            Some(json!(v))
        } else {
            None
        }
    }};
}

/// Nombre de la columna auxiliar con las claves de propiedades de `column`.
fn keys_column(column: &str) -> String {
    format!("{column}_keys")
}

/// Envuelve la consulta para que cada columna de elementos lleve sus claves.
pub fn element_query(preset: &PresetQuery) -> String {
    let keys: Vec<String> = preset
        .element_columns()
        .map(|column| format!("keys({column}) AS {}", keys_column(column)))
        .collect();
    if keys.is_empty() {
        return preset.cypher.to_string();
    }
    format!("CALL {{\n{}\n}}\nRETURN *, {}", preset.cypher, keys.join(", "))
}

/// Clasifica una columna de la fila en la unión etiquetada del motor.
fn decode_column(row: &Row, column: &str) -> GraphValue {
    let keys = || row.get::<Vec<String>>(&keys_column(column)).unwrap_or_default();

    if let Some(node) = row.get::<Node>(column) {
        return GraphValue::Node(GraphNode {
            identity: node.id().to_string(),
            labels: node.labels(),
            properties: collect_properties(&keys(), |key| read_value!(node, key)),
        });
    }
    if let Some(rel) = row.get::<Relation>(column) {
        return GraphValue::Relationship(GraphRelationship {
            identity: rel.id().to_string(),
            rel_type: rel.typ(),
            start: rel.start_node_id().to_string(),
            end: rel.end_node_id().to_string(),
            properties: collect_properties(&keys(), |key| read_value!(rel, key)),
        });
    }
    read_value!(*row, column).map_or(GraphValue::Empty, scalar_value)
}

fn collect_properties(keys: &[String], mut read: impl FnMut(&str) -> Option<Value>) -> PropertyMap {
    keys.iter()
        .filter_map(|key| match read(key) {
            Some(value) => Some((key.clone(), value)),
            None => {
                debug!("Propiedad '{key}' con un tipo no soportado; se omite");
                None
            }
        })
        .collect()
}

/// Sólo booleanos, números y texto cuentan como escalares; el resto queda vacío.
fn scalar_value(value: Value) -> GraphValue {
    match value {
        scalar @ (Value::Bool(_) | Value::Number(_) | Value::String(_)) => GraphValue::Scalar(scalar),
        _ => GraphValue::Empty,
    }
}

//! Decodificación de registros crudos.
//!
//! Dos responsabilidades:
//!   1. Clasificar valores JSON (p. ej. resultados del driver JavaScript que el
//!      navegador reenvía) por su forma estructural en un `GraphValue`.
//!   2. Separar un `RawRecord` ya clasificado en nodos, relaciones y escalares,
//!      respetando el orden del registro.
//!
//! Nada aquí falla: lo ausente o irreconocible se ignora en silencio.

use serde_json::{Map, Number, Value};

use crate::models::{GraphNode, GraphRelationship, GraphValue, PropertyMap, RawRecord};

/// Vista de un registro separada por tipo de valor.
#[derive(Debug, Default)]
pub struct DecodedRecord<'a> {
    pub nodes: Vec<&'a GraphNode>,
    pub relationships: Vec<&'a GraphRelationship>,
    pub scalars: Vec<&'a Value>,
}

/// Separa los valores de un registro conservando su orden relativo.
pub fn decode_record(record: &RawRecord) -> DecodedRecord<'_> {
    let mut decoded = DecodedRecord::default();
    for value in &record.values {
        match value {
            GraphValue::Node(node) => decoded.nodes.push(node),
            GraphValue::Relationship(rel) => decoded.relationships.push(rel),
            GraphValue::Scalar(scalar) => decoded.scalars.push(scalar),
            GraphValue::Empty => {}
        }
    }
    decoded
}

impl RawRecord {
    /// Construye un registro a partir de los valores JSON de una fila.
    pub fn from_json(values: Vec<Value>) -> Self {
        Self::new(values.iter().map(classify_value).collect())
    }
}

/// Clasifica un valor JSON por su forma:
/// labels + properties + identity ⇒ nodo; type + start + end ⇒ relación.
pub fn classify_value(value: &Value) -> GraphValue {
    match value {
        Value::Null => GraphValue::Empty,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => GraphValue::Scalar(value.clone()),
        Value::Object(obj) => {
            if let Some(node) = node_from_object(obj) {
                GraphValue::Node(node)
            } else if let Some(rel) = relationship_from_object(obj) {
                GraphValue::Relationship(rel)
            } else if let Some(n) = js_integer(obj) {
                // Los conteos del driver JS llegan como {low, high}.
                GraphValue::Scalar(n)
            } else {
                GraphValue::Empty
            }
        }
        Value::Array(_) => GraphValue::Empty,
    }
}

/// Convierte una identidad opaca en el id canónico de texto.
pub fn canonical_identity(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => match js_integer(obj) {
            Some(n) => Some(n.to_string()),
            None => Some(value.to_string()),
        },
        other => Some(other.to_string()),
    }
}

fn node_from_object(obj: &Map<String, Value>) -> Option<GraphNode> {
    let labels = obj.get("labels")?.as_array()?;
    let properties = obj.get("properties")?.as_object()?;
    let identity = obj
        .get("identity")
        .or_else(|| obj.get("elementId"))
        .and_then(canonical_identity)?;

    Some(GraphNode {
        identity,
        labels: labels
            .iter()
            .filter_map(|l| l.as_str().map(str::to_string))
            .collect(),
        properties: property_map(properties),
    })
}

fn relationship_from_object(obj: &Map<String, Value>) -> Option<GraphRelationship> {
    let rel_type = obj.get("type")?.as_str()?.to_string();
    let start = obj.get("start").and_then(canonical_identity)?;
    let end = obj.get("end").and_then(canonical_identity)?;
    let identity = obj
        .get("identity")
        .or_else(|| obj.get("elementId"))
        .and_then(canonical_identity)
        .unwrap_or_default();
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(property_map)
        .unwrap_or_default();

    Some(GraphRelationship {
        identity,
        rel_type,
        start,
        end,
        properties,
    })
}

fn property_map(obj: &Map<String, Value>) -> PropertyMap {
    obj.iter()
        .map(|(k, v)| (k.clone(), normalize_property(v)))
        .collect()
}

fn normalize_property(value: &Value) -> Value {
    match value {
        Value::Object(obj) => js_integer(obj).unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(normalize_property).collect()),
        _ => value.clone(),
    }
}

/// Entero de 64 bits del driver JavaScript: `{ "low": i32, "high": i32 }`.
fn js_integer(obj: &Map<String, Value>) -> Option<Value> {
    if obj.len() != 2 {
        return None;
    }
    let low = obj.get("low")?.as_i64()?;
    let high = obj.get("high")?.as_i64()?;
    let combined = (high << 32) | (low as u32 as i64);
    Some(Value::Number(Number::from(combined)))
}

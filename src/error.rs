//! Taxonomía de errores del explorador y del planificador de misiones.

use thiserror::Error;

/// Errores del motor del grafo y de la carga de datos.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorerError {
    #[error("Error al consultar el grafo: {0}")]
    FetchFailure(String),

    #[error("Registro agregado mal formado (fila {record}): {reason}")]
    MalformedAggregateRecord { record: usize, reason: String },

    #[error("Consulta predefinida desconocida: {0}")]
    UnknownPreset(String),

    #[error("Nodo desconocido en el grafo actual: {0}")]
    UnknownNode(String),
}

impl From<anyhow::Error> for ExplorerError {
    fn from(err: anyhow::Error) -> Self {
        Self::FetchFailure(err.to_string())
    }
}

/// Errores del formulario de configuración de misiones.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MissionError {
    #[error("No hay valores por defecto para el tipo de misión '{0}'")]
    NoDefaultsForType(String),

    #[error("No hay valores por defecto para la fase '{phase}' del tipo '{mission_type}'")]
    NoDefaultsForPhase { mission_type: String, phase: String },

    #[error("Faltan campos obligatorios: {}", .0.join(", "))]
    MissingRequiredField(Vec<String>),

    #[error("Tabla de valores por defecto inválida: {0}")]
    InvalidTable(String),
}

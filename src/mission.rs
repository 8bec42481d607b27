//! Planificador de misiones: valores por defecto por escenario y validación
//! del formulario antes de enviarlo al backend.
//!
//! La tabla es un JSON anidado tipo → fase → objetivo → registro. El orden de
//! las claves importa: si el objetivo no existe se usa el primero de la fase.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::MissionError;

/// Descriptor de misión tal y como lo edita el formulario.
pub type Mission = Map<String, Value>;

const BUILTIN_DEFAULTS: &str = include_str!("../data/mission_defaults.json");

const REQUIRED_TEXT_FIELDS: [&str; 4] = ["type", "phase", "objective", "coordinates"];
const REQUIRED_NUMERIC_FIELDS: [&str; 10] = [
    "deltaV",
    "duration",
    "fuel",
    "payload",
    "crew",
    "commsLatency",
    "gravity",
    "radDose",
    "power_kW",
    "edlDifficulty",
];

/// Tabla estática de valores por defecto por escenario.
#[derive(Debug, Clone)]
pub struct MissionDefaults {
    table: Map<String, Value>,
}

impl MissionDefaults {
    /// Tabla incluida en el binario (Mars, Moon, Asteroid).
    pub fn builtin() -> Result<Self, MissionError> {
        Self::from_json(BUILTIN_DEFAULTS)
    }

    pub fn from_json(raw: &str) -> Result<Self, MissionError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MissionError::InvalidTable(e.to_string()))?;
        let table = match value {
            Value::Object(map) => map,
            _ => return Err(MissionError::InvalidTable("la raíz debe ser un objeto".into())),
        };

        // tipo → fase → objetivo → registro, todos objetos.
        for (mission_type, phases) in &table {
            let phases = phases.as_object().ok_or_else(|| {
                MissionError::InvalidTable(format!("'{mission_type}' no es un objeto"))
            })?;
            for (phase, objectives) in phases {
                let objectives = objectives.as_object().ok_or_else(|| {
                    MissionError::InvalidTable(format!("'{mission_type}/{phase}' no es un objeto"))
                })?;
                if objectives.is_empty() {
                    return Err(MissionError::InvalidTable(format!(
                        "'{mission_type}/{phase}' no tiene objetivos"
                    )));
                }
                for (objective, record) in objectives {
                    if !record.is_object() {
                        return Err(MissionError::InvalidTable(format!(
                            "'{mission_type}/{phase}/{objective}' no es un objeto"
                        )));
                    }
                }
            }
        }

        Ok(Self { table })
    }

    pub fn mission_types(&self) -> Vec<&str> {
        self.table.keys().map(String::as_str).collect()
    }

    /// Resuelve el registro por defecto y lo fusiona sobre la misión.
    pub fn resolve(&self, mission: &Mission) -> Result<Mission, MissionError> {
        let wanted_type = text_field(mission, "type");
        let wanted_phase = text_field(mission, "phase");
        let wanted_objective = text_field(mission, "objective");

        let phases = find_key(&self.table, wanted_type)
            .and_then(|(_, v)| v.as_object())
            .ok_or_else(|| MissionError::NoDefaultsForType(wanted_type.to_string()))?;

        let (phase_key, objectives) = find_key(phases, wanted_phase)
            .and_then(|(k, v)| v.as_object().map(|o| (k, o)))
            .ok_or_else(|| MissionError::NoDefaultsForPhase {
                mission_type: wanted_type.to_string(),
                phase: wanted_phase.to_string(),
            })?;

        let (objective_key, record) = match find_key(objectives, wanted_objective) {
            Some(found) => found,
            None => {
                let first = objectives.iter().next().ok_or_else(|| MissionError::NoDefaultsForPhase {
                    mission_type: wanted_type.to_string(),
                    phase: wanted_phase.to_string(),
                })?;
                debug!(
                    "Objetivo '{}' sin valores por defecto en {}; se usa '{}'",
                    wanted_objective, phase_key, first.0
                );
                first
            }
        };
        debug!("Valores por defecto resueltos: {}/{}", phase_key, objective_key);

        let defaults = record.as_object().cloned().unwrap_or_default();
        Ok(merge_defaults(mission, &defaults))
    }
}

/// Función libre equivalente a `MissionDefaults::resolve`.
pub fn resolve_defaults(mission: &Mission, defaults: &MissionDefaults) -> Result<Mission, MissionError> {
    defaults.resolve(mission)
}

/// Fusión superficial: los valores por defecto pisan los campos homónimos y el
/// resto de la misión se conserva. El contexto se copia limpio en `summary`.
pub fn merge_defaults(mission: &Mission, defaults: &Mission) -> Mission {
    let mut merged = mission.clone();
    for (key, value) in defaults {
        merged.insert(key.clone(), value.clone());
    }

    let context = defaults.get("context").and_then(Value::as_str).unwrap_or("");
    merged.insert("summary".into(), Value::String(clean_context(context)));
    merged.insert("additionalContext".into(), Value::String(String::new()));

    // La selección del usuario manda sobre la tabla.
    for key in ["type", "phase", "objective"] {
        match mission.get(key) {
            Some(value) => {
                merged.insert(key.into(), value.clone());
            }
            None => {
                merged.remove(key);
            }
        }
    }
    merged
}

/// Comprueba los campos obligatorios antes del envío y devuelve todos los que faltan.
pub fn validate_mission(mission: &Mission) -> Result<(), MissionError> {
    let mut missing = Vec::new();

    for field in REQUIRED_TEXT_FIELDS {
        if text_field(mission, field).is_empty() {
            missing.push(field.to_string());
        }
    }
    for field in REQUIRED_NUMERIC_FIELDS {
        if mission.get(field).map_or(true, Value::is_null) {
            missing.push(field.to_string());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissionError::MissingRequiredField(missing))
    }
}

fn text_field<'a>(mission: &'a Mission, key: &str) -> &'a str {
    mission.get(key).and_then(Value::as_str).unwrap_or("").trim()
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn find_key<'a>(map: &'a Map<String, Value>, wanted: &str) -> Option<(&'a String, &'a Value)> {
    let wanted = normalize(wanted);
    map.iter().find(|(key, _)| normalize(key) == wanted)
}

/// Colapsa cada salto de línea seguido de espacios en un único salto.
fn clean_context(context: &str) -> String {
    let mut out = String::with_capacity(context.len());
    let mut chars = context.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        }
        out.push(c);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mission(value: Value) -> Mission {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_case_insensitive_resolution() {
        let defaults = MissionDefaults::builtin().unwrap();
        let input = mission(json!({
            "type": "mars",
            "phase": "PLANNING",
            "objective": "scientific research",
            "context": ""
        }));
        let merged = defaults.resolve(&input).unwrap();
        assert_eq!(merged["deltaV"], json!(12.0));
        assert_eq!(merged["duration"], json!(540));
        assert_eq!(merged["crew"], json!(4));
        // Los valores del usuario se conservan tal cual los escribió.
        assert_eq!(merged["type"], json!("mars"));
        assert_eq!(merged["phase"], json!("PLANNING"));
    }

    #[test]
    fn test_unknown_objective_falls_back_to_first() {
        let defaults = MissionDefaults::builtin().unwrap();
        let input = mission(json!({"type": "Mars", "phase": "Planning", "objective": "Unknown Goal"}));
        let merged = defaults.resolve(&input).unwrap();
        // Primer objetivo de Planning: Scientific Research.
        assert_eq!(merged["crew"], json!(4));
        assert_eq!(merged["power_kW"], json!(10));
        assert_eq!(merged["objective"], json!("Unknown Goal"));
    }

    #[test]
    fn test_unknown_type_and_phase() {
        let defaults = MissionDefaults::builtin().unwrap();
        let err = defaults
            .resolve(&mission(json!({"type": "Venus", "phase": "Planning", "objective": "x"})))
            .unwrap_err();
        assert_eq!(err, MissionError::NoDefaultsForType("Venus".into()));

        let err = defaults
            .resolve(&mission(json!({"type": " Moon ", "phase": "Cruise", "objective": "x"})))
            .unwrap_err();
        assert_eq!(
            err,
            MissionError::NoDefaultsForPhase {
                mission_type: "Moon".into(),
                phase: "Cruise".into()
            }
        );
    }

    #[test]
    fn test_merge_keeps_fields_not_in_defaults() {
        let defaults = mission(json!({"crew": 2, "context": "Line one.\n        Line two."}));
        let input = mission(json!({"type": "Moon", "crew": 9, "notes": "keep me"}));
        let merged = merge_defaults(&input, &defaults);
        assert_eq!(merged["crew"], json!(2));
        assert_eq!(merged["notes"], json!("keep me"));
        assert_eq!(merged["summary"], json!("Line one.\nLine two."));
        assert_eq!(merged["additionalContext"], json!(""));
        assert!(!merged.contains_key("phase"));
    }

    #[test]
    fn test_merge_without_context_clears_summary() {
        let defaults = mission(json!({"crew": 2}));
        let input = mission(json!({
            "type": "Moon",
            "summary": "texto anterior",
            "additionalContext": "notas del usuario"
        }));
        let merged = merge_defaults(&input, &defaults);
        assert_eq!(merged["summary"], json!(""));
        assert_eq!(merged["additionalContext"], json!(""));
    }

    #[test]
    fn test_delta_v_keeps_decimal_literals() {
        let defaults = MissionDefaults::builtin().unwrap();
        let input = mission(json!({"type": "Moon", "phase": "Analysis", "objective": "Scientific Research"}));
        let merged = defaults.resolve(&input).unwrap();
        assert_eq!(merged["deltaV"], json!(6.0));

        for phases in defaults.table.values() {
            for objectives in phases.as_object().unwrap().values() {
                for record in objectives.as_object().unwrap().values() {
                    assert!(record["deltaV"].is_f64(), "deltaV entero en {record}");
                }
            }
        }
    }

    #[test]
    fn test_fallback_follows_table_order() {
        let table = r#"{"Mars": {"Planning": {"Colonization": {"crew": 10}, "Scientific Research": {"crew": 4}}}}"#;
        let defaults = MissionDefaults::from_json(table).unwrap();
        let merged = defaults
            .resolve(&mission(json!({"type": "Mars", "phase": "Planning", "objective": "?"})))
            .unwrap();
        assert_eq!(merged["crew"], json!(10));
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        assert!(MissionDefaults::from_json("[]").is_err());
        assert!(MissionDefaults::from_json(r#"{"Mars": {"Planning": {}}}"#).is_err());
        assert!(MissionDefaults::from_json(r#"{"Mars": {"Planning": {"X": 3}}}"#).is_err());
    }

    #[test]
    fn test_builtin_table_covers_all_scenarios() {
        let defaults = MissionDefaults::builtin().unwrap();
        assert_eq!(defaults.mission_types(), vec!["Mars", "Moon", "Asteroid"]);
        for mission_type in ["Mars", "Moon", "Asteroid"] {
            for phase in ["Analysis", "Planning", "Execution"] {
                for objective in ["Scientific Research", "Colonization"] {
                    let input = mission(json!({"type": mission_type, "phase": phase, "objective": objective}));
                    let merged = defaults.resolve(&input).unwrap();
                    assert!(validate_mission(&merged).is_ok(), "{mission_type}/{phase}/{objective}");
                }
            }
        }
    }

    #[test]
    fn test_validation_lists_every_missing_field() {
        let input = mission(json!({
            "type": "Mars",
            "phase": "",
            "objective": "Colonization",
            "deltaV": 12.5,
            "duration": null,
            "coordinates": "0.0N, 0.0E"
        }));
        match validate_mission(&input) {
            Err(MissionError::MissingRequiredField(fields)) => {
                assert_eq!(
                    fields,
                    vec![
                        "phase",
                        "duration",
                        "fuel",
                        "payload",
                        "crew",
                        "commsLatency",
                        "gravity",
                        "radDose",
                        "power_kW",
                        "edlDifficulty"
                    ]
                );
            }
            other => panic!("se esperaba MissingRequiredField, llegó {other:?}"),
        }
    }

    #[test]
    fn test_clean_context() {
        assert_eq!(clean_context("  a\n   b\n\n   c  "), "a\nb\nc");
    }
}

//! Carga y gestión de configuración de la aplicación (Neo4j + servidor web).

use std::env;
use anyhow::{anyhow, Result};

use crate::presets::{find_preset, DEFAULT_PRESET};

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub server_addr: String,

    pub static_dir: String,
    pub default_preset: String,
    pub open_browser: bool,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo de una función arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let neo4j_uri = lookup("NEO4J_URI").ok_or_else(|| anyhow!("Falta NEO4J_URI en el entorno"))?;
        let neo4j_user = lookup("NEO4J_USER").ok_or_else(|| anyhow!("Falta NEO4J_USER en el entorno"))?;
        let neo4j_password =
            lookup("NEO4J_PASSWORD").ok_or_else(|| anyhow!("Falta NEO4J_PASSWORD en el entorno"))?;

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:3322".to_string());
        let static_dir = lookup("STATIC_DIR").unwrap_or_else(|| "frontend".to_string());

        let default_preset = lookup("DEFAULT_PRESET").unwrap_or_else(|| DEFAULT_PRESET.to_string());
        if find_preset(&default_preset).is_none() {
            return Err(anyhow!("DEFAULT_PRESET desconocido: {default_preset}"));
        }

        let open_browser = match lookup("OPEN_BROWSER") {
            None => true,
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("Valor inválido para OPEN_BROWSER: {raw}"))?,
        };

        Ok(Self {
            neo4j_uri,
            neo4j_user,
            neo4j_password,
            server_addr,
            static_dir,
            default_preset,
            open_browser,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! # Configuração do Pipeline
//!
//! Todos os parâmetros que no fluxo de curadoria vêm "de fora" (padrão do
//! tokenizador, conjunto de *holes*, tipos atômicos/derivados e o mapa de
//! regras de composição) ficam num único valor explícito, passado para cada
//! componente. Não existe estado global.
//!
//! ## Exemplo de arquivo JSON
//!
//! ```json
//! {
//!   "token_pattern": "\\b\\w\\w+\\b",
//!   "holes": ["X", "U"],
//!   "entity_rules": { "P I": "P I", "S I": "S I" }
//! }
//! ```
//!
//! Campos ausentes assumem os valores padrão.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::error::Result;

/// Padrão padrão de token: palavras com 2+ caracteres alfanuméricos.
pub const DEFAULT_TOKEN_PATTERN: &str = r"\b\w\w+\b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Regex que define o que é um token genérico.
    pub token_pattern: String,
    /// Tipos "não informativos": viram `O` no IOB e não contam como anotação útil.
    pub holes: Vec<EntityType>,
    /// Tipos de base (não compostos).
    pub atomics: Vec<EntityType>,
    /// Tipos compostos reconhecidos nas matrizes de relação.
    pub derived: Vec<EntityType>,
    /// Assinatura composta (ex: `"P I"`) → tipo derivado proposto.
    pub entity_rules: IndexMap<String, EntityType>,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        let entity_rules = [
            ("I I", "I"),
            ("P I", "P I"),
            ("S I", "S I"),
            ("I P", "P I"),
            ("I S", "S I"),
            ("P P", "P"),
            ("S S", "S"),
        ]
        .into_iter()
        .map(|(sig, ty)| (sig.to_string(), EntityType::from_code(ty)))
        .collect();

        Self {
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            holes: vec![EntityType::Stopword, EntityType::Unknown],
            atomics: vec![EntityType::Item, EntityType::Problem, EntityType::Solution],
            derived: vec![EntityType::from_code("P I"), EntityType::from_code("S I")],
            entity_rules,
        }
    }
}

impl TaggingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Lê a configuração de um arquivo JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn is_hole(&self, entity: &EntityType) -> bool {
        self.holes.contains(entity)
    }

    pub fn is_atomic(&self, entity: &EntityType) -> bool {
        self.atomics.contains(entity)
    }
}

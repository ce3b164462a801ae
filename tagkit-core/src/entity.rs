//! # Tipos de Entidade
//!
//! Taxonomia usada para classificar o vocabulário das ordens de serviço.
//!
//! | Código | Significado                 | Exemplos                       |
//! |--------|-----------------------------|--------------------------------|
//! | I      | Item (equipamento/peça)     | pump, valve, hyd_hose          |
//! | P      | Problem (falha/sintoma)     | leak, broken, noisy            |
//! | S      | Solution (ação corretiva)   | replace, tighten, weld         |
//! | X      | Stopword                    | the, on, at                    |
//! | U      | Unknown                     | (analista não soube dizer)     |
//! | ""     | Ainda não classificado      |                                |
//! | NA     | Sentinela "sem tag"         | (usado apenas na matriz)       |
//!
//! Tipos derivados (ex: `"P I"`, problema + item) são livres e definidos pela
//! configuração, por isso a variante [`EntityType::Derived`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tipo de entidade de uma linha do vocabulário.
///
/// Serializa sempre como o código curto (`"I"`, `"P"`, `"P I"`, ...), que é o
/// formato do arquivo de vocabulário.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Item,
    Problem,
    Solution,
    Stopword,
    Unknown,
    /// Ainda não classificado pelo analista (string vazia no disco).
    Unclassified,
    /// Sentinela reservada "sem tag" da matriz de ocorrências.
    Untagged,
    /// Qualquer outro código, inclusive tipos compostos como `"P I"`.
    Derived(String),
}

impl EntityType {
    /// Código curto do tipo (ex: `Item` → `"I"`).
    pub fn code(&self) -> &str {
        match self {
            EntityType::Item => "I",
            EntityType::Problem => "P",
            EntityType::Solution => "S",
            EntityType::Stopword => "X",
            EntityType::Unknown => "U",
            EntityType::Unclassified => "",
            EntityType::Untagged => "NA",
            EntityType::Derived(code) => code.as_str(),
        }
    }

    /// Parseia um código. Nunca falha: códigos desconhecidos viram `Derived`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "I" => EntityType::Item,
            "P" => EntityType::Problem,
            "S" => EntityType::Solution,
            "X" => EntityType::Stopword,
            "U" => EntityType::Unknown,
            "" => EntityType::Unclassified,
            "NA" => EntityType::Untagged,
            other => EntityType::Derived(other.to_string()),
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, EntityType::Unclassified)
    }

    /// Nome legível para relatórios
    pub fn name(&self) -> &str {
        match self {
            EntityType::Item => "Item",
            EntityType::Problem => "Problem",
            EntityType::Solution => "Solution",
            EntityType::Stopword => "Stopword",
            EntityType::Unknown => "Unknown",
            EntityType::Unclassified => "Unclassified",
            EntityType::Untagged => "Untagged",
            EntityType::Derived(code) => code.as_str(),
        }
    }
}

impl Default for EntityType {
    fn default() -> Self {
        EntityType::Unclassified
    }
}

impl From<String> for EntityType {
    fn from(code: String) -> Self {
        EntityType::from_code(&code)
    }
}

impl From<&str> for EntityType {
    fn from(code: &str) -> Self {
        EntityType::from_code(code)
    }
}

impl From<EntityType> for String {
    fn from(entity: EntityType) -> Self {
        entity.code().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in ["I", "P", "S", "X", "U", "", "NA", "P I"] {
            assert_eq!(EntityType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_unknown_code_is_derived() {
        assert_eq!(
            EntityType::from_code("S I"),
            EntityType::Derived("S I".to_string())
        );
        assert_eq!(EntityType::from_code("V").name(), "V");
    }

    #[test]
    fn test_serde_uses_code() {
        let json = serde_json::to_string(&EntityType::Problem).unwrap();
        assert_eq!(json, "\"P\"");
        let back: EntityType = serde_json::from_str("\"\"").unwrap();
        assert!(back.is_unclassified());
    }
}

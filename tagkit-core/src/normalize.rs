//! # Normalização de Texto
//!
//! Junta as colunas de texto livre de cada ordem de serviço num único campo e
//! limpa o resultado, na seguinte ordem fixa:
//!
//! 1. minúsculas;
//! 2. quebras de linha → espaço;
//! 3. cada caractere de pontuação ASCII → espaço;
//! 4. substituições especiais conhecidas *a priori* (maior casamento primeiro).
//!
//! ```rust
//! use tagkit_core::dataset::Dataset;
//! use tagkit_core::normalize::{ColumnSelector, TextNormalizer};
//!
//! let mut ds = Dataset::new(vec!["problem".into(), "action".into()]);
//! ds.push_row(vec![Some("HYD. Leak!".into()), Some("Repl. hose".into())]);
//!
//! let normalizer = TextNormalizer::new(ColumnSelector::ByIndex(vec![0, 1]));
//! let text = normalizer.transform(&ds).unwrap();
//! assert_eq!(text.cleaned[0], "hyd  leak  repl  hose");
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Result, TagError};
use crate::matcher::VocabMatcher;

/// Chave individual de coluna, do jeito que chega da configuração.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

/// Seleção de colunas: só índices ou só nomes, nunca misturados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelector {
    ByIndex(Vec<usize>),
    ByName(Vec<String>),
}

impl Default for ColumnSelector {
    fn default() -> Self {
        ColumnSelector::ByIndex(vec![0])
    }
}

impl ColumnSelector {
    /// Constrói a partir de chaves soltas, rejeitando listas vazias ou mistas.
    pub fn from_keys<I, K>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<ColumnKey>,
    {
        let keys: Vec<ColumnKey> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(TagError::InvalidSelector("lista de colunas vazia".into()));
        }
        if keys.iter().all(|k| matches!(k, ColumnKey::Index(_))) {
            Ok(ColumnSelector::ByIndex(
                keys.into_iter()
                    .filter_map(|k| match k {
                        ColumnKey::Index(i) => Some(i),
                        ColumnKey::Name(_) => None,
                    })
                    .collect(),
            ))
        } else if keys.iter().all(|k| matches!(k, ColumnKey::Name(_))) {
            Ok(ColumnSelector::ByName(
                keys.into_iter()
                    .filter_map(|k| match k {
                        ColumnKey::Name(n) => Some(n),
                        ColumnKey::Index(_) => None,
                    })
                    .collect(),
            ))
        } else {
            Err(TagError::InvalidSelector(
                "lista mistura nomes e índices de coluna".into(),
            ))
        }
    }

    /// Resolve para posições de coluna no dataset.
    pub fn resolve(&self, dataset: &Dataset) -> Result<Vec<usize>> {
        let n_cols = dataset.columns().len();
        match self {
            ColumnSelector::ByIndex(idx) if idx.is_empty() => {
                Err(TagError::InvalidSelector("lista de colunas vazia".into()))
            }
            ColumnSelector::ByName(names) if names.is_empty() => {
                Err(TagError::InvalidSelector("lista de colunas vazia".into()))
            }
            ColumnSelector::ByIndex(idx) => idx
                .iter()
                .map(|&i| {
                    if i < n_cols {
                        Ok(i)
                    } else {
                        Err(TagError::InvalidSelector(format!(
                            "índice {i} fora do intervalo (0..{n_cols})"
                        )))
                    }
                })
                .collect(),
            ColumnSelector::ByName(names) => names
                .iter()
                .map(|name| {
                    dataset.column_index(name).ok_or_else(|| {
                        TagError::InvalidSelector(format!("coluna '{name}' não existe"))
                    })
                })
                .collect(),
        }
    }
}

/// Texto de cada documento antes e depois da limpeza.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// Colunas concatenadas, sem limpeza.
    pub merged: Vec<String>,
    /// Saída final, uma string por documento.
    pub cleaned: Vec<String>,
}

/// Extrai, junta e limpa as colunas de linguagem natural.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    pub columns: ColumnSelector,
    pub special_replace: Option<HashMap<String, String>>,
}

impl TextNormalizer {
    pub fn new(columns: ColumnSelector) -> Self {
        Self {
            columns,
            special_replace: None,
        }
    }

    /// Define substituições literais aplicadas depois da limpeza.
    pub fn with_special_replace(mut self, replacements: HashMap<String, String>) -> Self {
        self.special_replace = Some(replacements);
        self
    }

    /// Não altera o dataset; devolve o texto juntado e o texto limpo.
    pub fn transform(&self, dataset: &Dataset) -> Result<NormalizedText> {
        let cols = self.columns.resolve(dataset)?;

        let merged: Vec<String> = (0..dataset.len())
            .map(|row| {
                cols.iter()
                    .map(|&col| dataset.cell(row, col).unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        let special = match &self.special_replace {
            Some(map) => Some((VocabMatcher::compile(map.keys())?, map)),
            None => None,
        };

        let cleaned = merged
            .iter()
            .map(|text| {
                let basic = clean_text(text);
                match &special {
                    Some((matcher, map)) => matcher.substitute(&basic, map),
                    None => basic,
                }
            })
            .collect();

        Ok(NormalizedText { merged, cleaned })
    }
}

/// Minúsculas, sem quebras de linha e sem pontuação ASCII.
pub fn clean_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c == '\n' || c == '\r' || c.is_ascii_punctuation() {
                ' '
            } else {
                c
            }
        })
        .collect()
}

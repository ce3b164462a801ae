//! # Rótulos IOB
//!
//! Converte texto bruto em uma sequência `(token, rótulo, doc_id)` no esquema
//! **IOB** (Inside-Outside-Beginning), pronta para alimentar ferramentas
//! externas de NER.
//!
//! ## Algoritmo
//!
//! 1. Junta o vocabulário de 1-gramas e o de n-gramas (o segundo vence em
//!    tokens repetidos).
//! 2. Tokeniza cada documento em minúsculas dando prioridade às entradas do
//!    vocabulário (maior casamento primeiro); o resto do texto cai no
//!    `token_pattern` genérico.
//! 3. Cada trecho recebe o tipo do vocabulário (`U` se ausente ou vazio).
//! 4. O trecho é quebrado em `[_\s]+`: a primeira parte leva `B-<tipo>`, as
//!    seguintes `I-<tipo>`. Tipos que são *holes* viram `O`.
//!
//! | Trecho             | Tipo | Saída                                   |
//! |--------------------|------|-----------------------------------------|
//! | `the`              | X    | `the/O`                                 |
//! | `quick brown fox`  | I    | `quick/B-I brown/I-I fox/I-I`           |
//! | `jumped`           | V    | `jumped/B-V`                            |

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::TaggingConfig;
use crate::entity::EntityType;
use crate::error::Result;
use crate::matcher::VocabMatcher;
use crate::vocabulary::VocabularyTable;

/// Rótulo IOB de um token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum IobTag {
    /// Primeiro token de um trecho com tipo. Ex: **quick** brown fox (B-I).
    Begin(EntityType),
    /// Tokens seguintes do mesmo trecho. Ex: quick **brown** fox (I-I).
    Inside(EntityType),
    /// Fora de qualquer entidade informativa.
    Outside,
}

impl IobTag {
    /// Representação textual (ex: `"B-I"`, `"I-P I"`, `"O"`).
    pub fn label(&self) -> String {
        match self {
            IobTag::Begin(ty) => format!("B-{}", ty.code()),
            IobTag::Inside(ty) => format!("I-{}", ty.code()),
            IobTag::Outside => "O".to_string(),
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(IobTag::Outside);
        }
        let (prefix, code) = s.split_once('-')?;
        let ty = EntityType::from_code(code);
        if ty.is_unclassified() {
            return None;
        }
        match prefix {
            "B" => Some(IobTag::Begin(ty)),
            "I" => Some(IobTag::Inside(ty)),
            _ => None,
        }
    }
}

impl fmt::Display for IobTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<IobTag> for String {
    fn from(tag: IobTag) -> Self {
        tag.label()
    }
}

impl TryFrom<String> for IobTag {
    type Error = String;

    fn try_from(label: String) -> std::result::Result<Self, Self::Error> {
        IobTag::from_label(&label).ok_or_else(|| format!("rótulo IOB inválido: '{label}'"))
    }
}

/// Uma linha da saída IOB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IobRow {
    pub token: String,
    #[serde(rename = "NE")]
    pub ne: IobTag,
    pub doc_id: usize,
}

/// Rotula cada token de `raw_text`, em ordem de documento e posição.
pub fn iob_labels(
    raw_text: &[String],
    vocab_1gram: &VocabularyTable,
    vocab_ngram: Option<&VocabularyTable>,
    config: &TaggingConfig,
) -> Result<Vec<IobRow>> {
    let mut types: HashMap<&str, &EntityType> = HashMap::new();
    let tables = std::iter::once(vocab_1gram).chain(vocab_ngram);
    for table in tables {
        for (token, entry) in table.iter() {
            types.insert(token, &entry.entity_type);
        }
    }

    let matcher = VocabMatcher::tokenizer(types.keys(), &config.token_pattern)?;
    let splitter = Regex::new(r"[_\s]+")?;

    let per_doc: Vec<Vec<IobRow>> = raw_text
        .par_iter()
        .enumerate()
        .map(|(doc_id, text)| {
            let lowered = text.to_lowercase();
            let mut rows = Vec::new();
            for span in matcher.find_all(&lowered) {
                let ty = types
                    .get(span)
                    .filter(|ty| !ty.is_unclassified())
                    .map(|ty| (*ty).clone())
                    .unwrap_or(EntityType::Unknown);
                let hole = config.is_hole(&ty);
                let pieces = splitter.split(span).filter(|p| !p.is_empty());
                for (i, piece) in pieces.enumerate() {
                    let ne = if hole {
                        IobTag::Outside
                    } else if i == 0 {
                        IobTag::Begin(ty.clone())
                    } else {
                        IobTag::Inside(ty.clone())
                    };
                    rows.push(IobRow {
                        token: piece.to_string(),
                        ne,
                        doc_id,
                    });
                }
            }
            rows
        })
        .collect();

    Ok(per_doc.into_iter().flatten().collect())
}

/// Grava as linhas com cabeçalho `token,NE,doc_id`.
pub fn write_iob<W: Write>(rows: &[IobRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_iob_csv(rows: &[IobRow], path: impl AsRef<Path>) -> Result<()> {
    write_iob(rows, std::fs::File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyEntry;

    fn vocab(rows: &[(&str, &str)]) -> VocabularyTable {
        rows.iter()
            .map(|(t, ne)| {
                (
                    t.to_string(),
                    VocabularyEntry::classified(EntityType::from_code(ne), ""),
                )
            })
            .collect()
    }

    fn labels(rows: &[IobRow]) -> Vec<(String, String)> {
        rows.iter()
            .map(|r| (r.token.clone(), r.ne.label()))
            .collect()
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(IobTag::Outside.label(), "O");
        assert_eq!(IobTag::Begin(EntityType::Item).label(), "B-I");
        assert_eq!(IobTag::Inside(EntityType::from_code("P I")).label(), "I-P I");
        assert_eq!(
            IobTag::from_label("I-P I"),
            Some(IobTag::Inside(EntityType::from_code("P I")))
        );
        assert_eq!(IobTag::from_label("B-"), None);
        assert_eq!(IobTag::from_label("Z-I"), None);
    }

    #[test]
    fn test_multiword_span_and_holes() {
        let v = vocab(&[("hyd leak", "P"), ("the", "X"), ("pump", "I")]);
        let rows = iob_labels(
            &["The hyd leak at PUMP".to_string()],
            &v,
            None,
            &TaggingConfig::default(),
        )
        .unwrap();
        let expected: Vec<(String, String)> = [
            ("the", "O"),
            ("hyd", "B-P"),
            ("leak", "I-P"),
            ("at", "O"),
            ("pump", "B-I"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        assert_eq!(labels(&rows), expected);
    }

    #[test]
    fn test_ngram_table_overrides_and_underscores() {
        let one = vocab(&[("hose", "I")]);
        let two = vocab(&[("hose", "S"), ("hyd_hose", "I")]);
        let rows = iob_labels(
            &["hose".to_string(), "hyd_hose".to_string()],
            &one,
            Some(&two),
            &TaggingConfig::default(),
        )
        .unwrap();
        assert_eq!(rows[0].ne, IobTag::Begin(EntityType::Solution));
        assert_eq!(rows[0].doc_id, 0);
        assert_eq!(rows[1].token, "hyd");
        assert_eq!(rows[2].ne, IobTag::Inside(EntityType::Item));
        assert_eq!(rows[2].doc_id, 1);
    }

    #[test]
    fn test_unclassified_is_unknown() {
        let v = vocab(&[("valve", "")]);
        let rows = iob_labels(&["valve".to_string()], &v, None, &TaggingConfig::default())
            .unwrap();
        assert_eq!(rows[0].ne, IobTag::Outside);
    }

    #[test]
    fn test_write_iob_csv() {
        let rows = vec![IobRow {
            token: "pump".into(),
            ne: IobTag::Begin(EntityType::Item),
            doc_id: 3,
        }];
        let mut buf = Vec::new();
        write_iob(&rows, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "token,NE,doc_id\npump,B-I,3\n");
    }
}

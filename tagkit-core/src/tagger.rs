//! # Etiquetador de Documentos
//!
//! Produz a matriz de ocorrências **documento × (tipo de entidade, alias)** a
//! partir de um extrator TF-IDF e da tabela de vocabulário.
//!
//! ## Formulação esparsa
//!
//! ```text
//! A  : documento × token ranqueado   (1 se o peso TF-IDF > 0)
//! M  : token × (tipo, alias)         (1 na tag do token)
//! T  = A · M                         (contagens, não limitadas a 1)
//! ```
//!
//! Tokens sem tipo entram como `NA`; sem alias, entram no balde único
//! `_untagged` (padrão) ou com o próprio token como alias.
//!
//! ## Completude
//!
//! [`completeness`] resume quanto do texto já está coberto pela anotação:
//!
//! | Métrica   | Definição                                          |
//! |-----------|----------------------------------------------------|
//! | precisão  | `1 − (NA + U) / total` por documento               |
//! | completos | documentos sem nenhuma ocorrência `NA`             |
//! | vazios    | sem ocorrência dos tipos atômicos (`config.atomics`) |

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TaggingConfig;
use crate::entity::EntityType;
use crate::error::Result;
use crate::extractor::VocabularyExtractor;
use crate::matrix::SparseMatrix;
use crate::vocabulary::VocabularyTable;

/// Alias coletivo dos tokens ainda sem alias.
pub const UNTAGGED_ALIAS: &str = "_untagged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagOptions {
    /// Junta todos os tokens sem alias num único alias `_untagged`.
    pub group_untagged: bool,
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            group_untagged: true,
        }
    }
}

/// Coluna da matriz de tags.
pub type TagColumn = (EntityType, String);

/// Matriz de ocorrências documento × (tipo, alias).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagMatrix {
    pub doc_ids: Vec<usize>,
    pub columns: Vec<TagColumn>,
    pub data: SparseMatrix,
}

impl TagMatrix {
    pub fn n_docs(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn column_index(&self, entity_type: &EntityType, alias: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|(ty, a)| ty == entity_type && a == alias)
    }

    /// Contagem de `(tipo, alias)` no documento de posição `row`; 0 se a
    /// coluna não existe.
    pub fn get(&self, row: usize, entity_type: &EntityType, alias: &str) -> f64 {
        self.column_index(entity_type, alias)
            .map(|c| self.data.get(row, c))
            .unwrap_or(0.0)
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.data.row_sums()
    }

    /// Soma, por documento, das colunas do tipo dado.
    pub fn type_sums(&self, entity_type: &EntityType) -> Vec<f64> {
        let cols: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, (ty, _))| ty == entity_type)
            .map(|(i, _)| i)
            .collect();
        self.data.select_columns(&cols).row_sums()
    }

    /// Mantém só as colunas cujo tipo está em `types`; tipos ausentes são
    /// ignorados em silêncio.
    pub fn pick_types(&self, types: &[EntityType]) -> TagMatrix {
        let cols: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, (ty, _))| types.contains(ty))
            .map(|(i, _)| i)
            .collect();
        TagMatrix {
            doc_ids: self.doc_ids.clone(),
            columns: cols.iter().map(|&i| self.columns[i].clone()).collect(),
            data: self.data.select_columns(&cols),
        }
    }

    /// Acrescenta as colunas de `other` cujo alias ainda não aparece em
    /// `self` (junção das tags de 1-gramas e 2-gramas).
    pub fn join_new_aliases(&self, other: &TagMatrix) -> TagMatrix {
        let new_cols: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(_, (_, alias))| !self.columns.iter().any(|(_, a)| a == alias))
            .map(|(i, _)| i)
            .collect();
        let mut columns = self.columns.clone();
        columns.extend(new_cols.iter().map(|&i| other.columns[i].clone()));

        let extra = other.data.select_columns(&new_cols);
        let offset = self.columns.len();
        let rows = (0..self.n_docs())
            .map(|r| {
                let mut row = self.data.row(r).to_vec();
                row.extend(extra.row(r).iter().map(|&(c, v)| (c + offset, v)));
                row
            })
            .collect();

        TagMatrix {
            doc_ids: self.doc_ids.clone(),
            data: SparseMatrix::from_rows(columns.len(), rows),
            columns,
        }
    }

    /// União de colunas; em colunas comuns valem os valores de `self`.
    /// O resultado fica ordenado por (tipo, alias).
    pub fn combine_first(&self, other: &TagMatrix) -> TagMatrix {
        let mut columns: Vec<TagColumn> = self.columns.clone();
        for col in &other.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        sort_columns(&mut columns);
        let position: HashMap<&TagColumn, usize> =
            columns.iter().enumerate().map(|(i, c)| (c, i)).collect();

        let n_docs = self.n_docs().max(other.n_docs());
        let doc_ids = if self.n_docs() >= other.n_docs() {
            self.doc_ids.clone()
        } else {
            other.doc_ids.clone()
        };

        let rows = (0..n_docs)
            .map(|r| {
                let mut row: BTreeMap<usize, f64> = BTreeMap::new();
                for &(c, v) in other.data.row(r) {
                    row.insert(position[&other.columns[c]], v);
                }
                // colunas de self sobrescrevem, inclusive com zero
                for col in &self.columns {
                    row.remove(&position[col]);
                }
                for &(c, v) in self.data.row(r) {
                    row.insert(position[&self.columns[c]], v);
                }
                row.into_iter().collect()
            })
            .collect();

        TagMatrix {
            doc_ids,
            data: SparseMatrix::from_rows(columns.len(), rows),
            columns,
        }
    }

    /// Versão legível: por documento e por tipo, os aliases presentes
    /// separados por `", "`.
    pub fn readable(&self) -> ReadableTags {
        let mut types: Vec<EntityType> = Vec::new();
        for (ty, _) in &self.columns {
            if !types.contains(ty) {
                types.push(ty.clone());
            }
        }
        let type_pos: HashMap<&EntityType, usize> =
            types.iter().enumerate().map(|(i, t)| (t, i)).collect();

        let rows = (0..self.n_docs())
            .map(|r| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); types.len()];
                for &(c, v) in self.data.row(r) {
                    let (ty, alias) = &self.columns[c];
                    if v >= 1.0 && !alias.is_empty() {
                        cells[type_pos[ty]].push(alias.as_str());
                    }
                }
                cells.into_iter().map(|aliases| aliases.join(", ")).collect()
            })
            .collect();

        ReadableTags {
            doc_ids: self.doc_ids.clone(),
            types,
            rows,
        }
    }

    /// CSV com duas linhas de cabeçalho (tipo, alias); primeira coluna `doc_id`.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

        let mut types = vec!["doc_id".to_string()];
        types.extend(self.columns.iter().map(|(ty, _)| ty.code().to_string()));
        wtr.write_record(&types)?;

        let mut aliases = vec![String::new()];
        aliases.extend(self.columns.iter().map(|(_, alias)| alias.clone()));
        wtr.write_record(&aliases)?;

        for (r, doc_id) in self.doc_ids.iter().enumerate() {
            let mut record = vec![doc_id.to_string()];
            record.extend(
                (0..self.columns.len()).map(|c| (self.data.get(r, c) as u64).to_string()),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_writer(std::fs::File::create(path)?)
    }
}

/// Tags legíveis: `rows[doc][tipo]` com os aliases separados por vírgula.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableTags {
    pub doc_ids: Vec<usize>,
    pub types: Vec<EntityType>,
    pub rows: Vec<Vec<String>>,
}

impl ReadableTags {
    pub fn cell(&self, row: usize, entity_type: &EntityType) -> Option<&str> {
        let col = self.types.iter().position(|t| t == entity_type)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

fn sort_columns(columns: &mut [TagColumn]) {
    columns.sort_by(|(ta, aa), (tb, ab)| (ta.code(), aa).cmp(&(tb.code(), ab)));
}

/// Etiqueta `raw_text` com o vocabulário.
///
/// Treina o extrator se ainda não foi treinado; caso contrário só projeta o
/// texto no vocabulário existente.
pub fn tag_documents(
    extractor: &mut VocabularyExtractor,
    raw_text: &[String],
    vocabulary: Option<&VocabularyTable>,
    options: &TagOptions,
) -> Result<TagMatrix> {
    let tfidf = if extractor.is_fitted() {
        extractor.transform(raw_text)?
    } else {
        debug!(documents = raw_text.len(), "extrator sem fit; treinando no texto");
        extractor.fit_transform(raw_text)?
    };

    let table = VocabularyTable::build(extractor, vocabulary)?;
    let ranked = extractor.ranked_tokens()?;
    let indicator = tfidf.select_columns(&extractor.ranks()?).binarize();

    let token_columns: Vec<TagColumn> = ranked
        .iter()
        .map(|token| {
            let entry = table.get(token);
            let entity_type = match entry.map(|e| &e.entity_type) {
                Some(ty) if !ty.is_unclassified() => ty.clone(),
                _ => EntityType::Untagged,
            };
            let alias = match entry.map(|e| e.alias.as_str()) {
                Some(alias) if !alias.is_empty() => alias.to_string(),
                _ if options.group_untagged => UNTAGGED_ALIAS.to_string(),
                _ => token.clone(),
            };
            (entity_type, alias)
        })
        .collect();

    let mut columns = token_columns.clone();
    sort_columns(&mut columns);
    columns.dedup();
    let position: HashMap<&TagColumn, usize> =
        columns.iter().enumerate().map(|(i, c)| (c, i)).collect();

    let membership = SparseMatrix::from_rows(
        columns.len(),
        token_columns
            .iter()
            .map(|col| vec![(position[col], 1.0)])
            .collect(),
    );

    Ok(TagMatrix {
        doc_ids: (0..raw_text.len()).collect(),
        data: indicator.dot(&membership),
        columns,
    })
}

pub fn tag_documents_readable(
    extractor: &mut VocabularyExtractor,
    raw_text: &[String],
    vocabulary: Option<&VocabularyTable>,
    options: &TagOptions,
) -> Result<ReadableTags> {
    Ok(tag_documents(extractor, raw_text, vocabulary, options)?.readable())
}

/// Estatísticas de cobertura da anotação.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagCompleteness {
    /// Precisão por documento; `None` para documentos sem nenhuma ocorrência.
    pub per_document: Vec<Option<f64>>,
    /// Documentos sem nenhuma ocorrência `NA`.
    pub complete: usize,
    /// Documentos sem nenhuma ocorrência dos tipos atômicos configurados.
    pub empty: usize,
    pub mean: Option<f64>,
    /// Desvio padrão amostral (ddof = 1); exige ao menos dois valores.
    pub std: Option<f64>,
}

/// Precisão por documento (`1 - (NA + U) / total`) e contagens de documentos
/// completos e vazios; "vazio" é não ter nenhuma ocorrência dos tipos
/// atômicos de `config`.
pub fn completeness(tags: &TagMatrix, config: &TaggingConfig) -> TagCompleteness {
    let totals = tags.row_sums();
    let untagged = tags.type_sums(&EntityType::Untagged);
    let unknown = tags.type_sums(&EntityType::Unknown);
    let atomic_sums: Vec<Vec<f64>> = config.atomics.iter().map(|ty| tags.type_sums(ty)).collect();

    let per_document: Vec<Option<f64>> = (0..tags.n_docs())
        .map(|r| (totals[r] > 0.0).then(|| 1.0 - (untagged[r] + unknown[r]) / totals[r]))
        .collect();
    let complete = untagged.iter().filter(|&&v| v == 0.0).count();
    let empty = (0..tags.n_docs())
        .filter(|&r| atomic_sums.iter().all(|sums| sums[r] == 0.0))
        .count();

    let defined: Vec<f64> = per_document.iter().flatten().copied().collect();
    let n = defined.len() as f64;
    let mean = (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / n);
    let std = mean.filter(|_| defined.len() > 1).map(|m| {
        (defined.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    });

    let n_docs = tags.n_docs().max(1) as f64;
    info!(
        mean = mean.unwrap_or(f64::NAN),
        std = std.unwrap_or(f64::NAN),
        complete,
        complete_pct = complete as f64 / n_docs,
        empty,
        empty_pct = empty as f64 / n_docs,
        atomics = ?config.atomics.iter().map(EntityType::name).collect::<Vec<_>>(),
        "completude da anotação"
    );

    TagCompleteness {
        per_document,
        complete,
        empty,
        mean,
        std,
    }
}

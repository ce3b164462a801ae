//! # Tabela de Vocabulário
//!
//! Fonte da verdade do analista: cada token ranqueado pelo extrator recebe um
//! tipo de entidade, um alias normalizado e notas livres. A tabela é mantida
//! em **ordem de ranking** (um `IndexMap` chaveado pelo token).
//!
//! ## Ciclo de vida
//!
//! 1. Criada a partir de um extrator recém treinado (campos em branco).
//! 2. O analista classifica linhas ([`VocabularyTable::set_classification`]).
//! 3. Numa nova rodada de extração, a tabela salva é mesclada com a nova:
//!    campos preenchidos pelo analista prevalecem, tokens novos entram em
//!    branco, tokens que sumiram da extração saem e o `score` é sempre
//!    recalculado.
//!
//! ## Formato em disco
//!
//! CSV com cabeçalho `tokens,NE,alias,notes,score`; string vazia significa
//! "sem valor".

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::EntityType;
use crate::error::{Result, TagError};
use crate::extractor::VocabularyExtractor;

/// Anotação de um token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub entity_type: EntityType,
    pub alias: String,
    pub notes: String,
    /// Importância normalizada em `[0, 1]`; só serve para ordenar.
    pub score: f64,
}

impl VocabularyEntry {
    pub fn classified(entity_type: EntityType, alias: impl Into<String>) -> Self {
        Self {
            entity_type,
            alias: alias.into(),
            ..Default::default()
        }
    }
}

/// Linha do CSV. Colunas ausentes num arquivo reimportado viram vazias.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    tokens: String,
    #[serde(rename = "NE", default)]
    ne: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    score: Option<f64>,
}

/// Tabela token → anotação, em ordem de ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocabularyTable {
    entries: IndexMap<String, VocabularyEntry>,
}

impl VocabularyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrói a tabela a partir do extrator, opcionalmente mesclando com
    /// uma tabela anterior.
    ///
    /// Extrator sem `fit` devolve a tabela anterior intacta, ou
    /// [`TagError::NotFitted`] se não houver uma.
    pub fn build(
        extractor: &VocabularyExtractor,
        existing: Option<&VocabularyTable>,
    ) -> Result<Self> {
        if !extractor.is_fitted() {
            return match existing {
                Some(table) => {
                    debug!(rows = table.len(), "extrator sem fit; reaproveitando a tabela");
                    Ok(table.clone())
                }
                None => Err(TagError::NotFitted),
            };
        }

        let tokens = extractor.ranked_tokens()?;
        let scores = extractor.normalized_scores()?;
        let mut table = Self::new();
        for (token, score) in tokens.into_iter().zip(scores) {
            table.entries.entry(token).or_insert(VocabularyEntry {
                score,
                ..Default::default()
            });
        }

        if let Some(existing) = existing {
            table.overlay(existing);
        }
        Ok(table)
    }

    /// Como [`build`](Self::build), mas a tabela anterior vem de `path` e o
    /// resultado é gravado de volta nele. Sem extrator ajustado, devolve a
    /// tabela salva sem reescrever o arquivo.
    pub fn build_from_file(extractor: &VocabularyExtractor, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !extractor.is_fitted() {
            return Self::read_csv(path);
        }
        let table = if path.is_file() {
            let existing = Self::read_csv(path)?;
            Self::build(extractor, Some(&existing))?
        } else {
            Self::build(extractor, None)?
        };
        table.write_csv(path)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            progress = table.annotation_progress(),
            "vocabulário salvo"
        );
        Ok(table)
    }

    /// Copia os campos não vazios de `existing` para as linhas presentes.
    fn overlay(&mut self, existing: &VocabularyTable) {
        let mut kept = 0usize;
        for (token, entry) in self.entries.iter_mut() {
            let Some(old) = existing.get(token) else {
                continue;
            };
            kept += 1;
            if !old.entity_type.is_unclassified() {
                entry.entity_type = old.entity_type.clone();
            }
            if !old.alias.is_empty() {
                entry.alias = old.alias.clone();
            }
            if !old.notes.is_empty() {
                entry.notes = old.notes.clone();
            }
        }
        debug!(
            kept,
            dropped = existing.len().saturating_sub(kept),
            "mesclagem com a tabela anterior"
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&VocabularyEntry> {
        self.entries.get(token)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut VocabularyEntry> {
        self.entries.get_mut(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Insere ou substitui a linha `token`, preservando a posição se já existir.
    pub fn insert(&mut self, token: impl Into<String>, entry: VocabularyEntry) {
        self.entries.insert(token.into(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VocabularyEntry)> {
        self.entries.iter().map(|(t, e)| (t.as_str(), e))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Classificação feita pelo analista. Devolve `false` se o token não existe.
    pub fn set_classification(
        &mut self,
        token: &str,
        entity_type: EntityType,
        alias: impl Into<String>,
    ) -> bool {
        match self.entries.get_mut(token) {
            Some(entry) => {
                entry.entity_type = entity_type;
                entry.alias = alias.into();
                true
            }
            None => false,
        }
    }

    /// Token → alias, só para aliases não vazios.
    pub fn alias_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.alias.is_empty())
            .map(|(t, e)| (t.clone(), e.alias.clone()))
            .collect()
    }

    /// Token → tipo de entidade, para todas as linhas.
    pub fn entity_map(&self) -> HashMap<String, EntityType> {
        self.entries
            .iter()
            .map(|(t, e)| (t.clone(), e.entity_type.clone()))
            .collect()
    }

    /// Concatena `self` e `other`; em tokens repetidos vence a primeira ocorrência.
    pub fn concat_dedup(&self, other: &VocabularyTable) -> VocabularyTable {
        let mut out = self.clone();
        for (token, entry) in &other.entries {
            if !out.entries.contains_key(token) {
                out.entries.insert(token.clone(), entry.clone());
            }
        }
        out
    }

    /// Ordenação estável por `score` decrescente.
    pub fn sort_by_score_desc(&mut self) {
        self.entries.sort_by(|_, a, _, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Fração do vocabulário já classificada, ponderada pelo `score`.
    pub fn annotation_progress(&self) -> f64 {
        let total: f64 = self.entries.values().map(|e| e.score).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let done: f64 = self
            .entries
            .values()
            .filter(|e| !e.entity_type.is_unclassified())
            .map(|e| e.score)
            .sum();
        done / total
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut table = Self::new();
        for row in rdr.deserialize::<CsvRow>() {
            let row = row?;
            table.entries.entry(row.tokens).or_insert(VocabularyEntry {
                entity_type: EntityType::from_code(&row.ne),
                alias: row.alias,
                notes: row.notes,
                score: row.score.unwrap_or(0.0),
            });
        }
        Ok(table)
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TagError::MissingFile(path.to_path_buf()));
        }
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for (token, entry) in &self.entries {
            wtr.serialize(CsvRow {
                tokens: token.clone(),
                ne: entry.entity_type.code().to_string(),
                alias: entry.alias.clone(),
                notes: entry.notes.clone(),
                score: Some(entry.score),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_writer(std::fs::File::create(path)?)
    }
}

impl FromIterator<(String, VocabularyEntry)> for VocabularyTable {
    /// Primeira ocorrência de cada token vence.
    fn from_iter<I: IntoIterator<Item = (String, VocabularyEntry)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (token, entry) in iter {
            table.entries.entry(token).or_insert(entry);
        }
        table
    }
}

//! # Conjunto de Dados Tabular
//!
//! Representação mínima em memória das ordens de serviço brutas: colunas
//! nomeadas e linhas em ordem estável. A posição da linha é o `doc_id` usado
//! por todo o resto do pipeline.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagError};

/// Tabela de documentos: uma linha por ordem de serviço.
///
/// Células ausentes são `None` e nunca causam erro; o normalizador as trata
/// como string vazia.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Adiciona uma linha. Linhas curtas são completadas com `None`;
    /// células excedentes são descartadas.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Célula `(row, col)`; `None` para célula vazia ou fora dos limites.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Lê CSV com cabeçalho. Campos vazios viram células ausentes.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut dataset = Dataset::new(columns);
        for record in rdr.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            dataset.push_row(row);
        }
        Ok(dataset)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TagError::MissingFile(path.to_path_buf()));
        }
        Self::from_csv_reader(std::fs::File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_reader() {
        let data = "id,description,action\n1,Pump leaking,replaced seal\n2,,\n";
        let ds = Dataset::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(ds.columns(), &["id", "description", "action"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.cell(0, 1), Some("Pump leaking"));
        assert_eq!(ds.cell(1, 1), None);
        assert_eq!(ds.column_index("action"), Some(2));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut ds = Dataset::new(vec!["a".into(), "b".into()]);
        ds.push_row(vec![Some("x".into())]);
        assert_eq!(ds.cell(0, 0), Some("x"));
        assert_eq!(ds.cell(0, 1), None);
    }

    #[test]
    fn test_missing_csv_path() {
        let err = Dataset::from_csv_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, TagError::MissingFile(_)));
    }
}

//! # Matriz Esparsa por Linhas
//!
//! Formato mínimo (uma lista ordenada de `(coluna, valor)` por linha) usado
//! para a matriz documento × termo do TF-IDF e para a matriz token × tag do
//! etiquetador. A memória é proporcional ao número de elementos não nulos,
//! nunca a `documentos × vocabulário`.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    n_cols: usize,
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    /// Constrói a partir de linhas já montadas. Cada linha é ordenada por
    /// coluna e zeros explícitos são descartados.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.retain(|&(_, v)| v != 0.0);
                row.sort_by_key(|&(c, _)| c);
                row
            })
            .collect();
        Self { n_cols, rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        self.rows.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row)
            .binary_search_by_key(&col, |&(c, _)| c)
            .map(|pos| self.rows[row][pos].1)
            .unwrap_or(0.0)
    }

    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_cols];
        for row in &self.rows {
            for &(c, v) in row {
                sums[c] += v;
            }
        }
        sums
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(_, v)| v).sum())
            .collect()
    }

    /// Projeta nas colunas `cols`, na ordem dada: a coluna `cols[k]` vira `k`.
    pub fn select_columns(&self, cols: &[usize]) -> SparseMatrix {
        let mut remap = vec![None; self.n_cols];
        for (new, &old) in cols.iter().enumerate() {
            if old < self.n_cols {
                remap[old] = Some(new);
            }
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|&(c, v)| remap[c].map(|nc| (nc, v)))
                    .collect()
            })
            .collect();
        SparseMatrix::from_rows(cols.len(), rows)
    }

    /// Indicadora: 1.0 onde o valor é positivo.
    pub fn binarize(&self) -> SparseMatrix {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|&&(_, v)| v > 0.0)
                    .map(|&(c, _)| (c, 1.0))
                    .collect()
            })
            .collect();
        SparseMatrix {
            n_cols: self.n_cols,
            rows,
        }
    }

    /// Produto `self × other`. Exige `self.n_cols() == other.n_rows()`;
    /// colunas de `self` sem linha correspondente são ignoradas.
    pub fn dot(&self, other: &SparseMatrix) -> SparseMatrix {
        let rows = self
            .rows
            .par_iter()
            .map(|row| {
                let mut acc: BTreeMap<usize, f64> = BTreeMap::new();
                for &(k, v) in row {
                    for &(j, w) in other.row(k) {
                        *acc.entry(j).or_insert(0.0) += v * w;
                    }
                }
                acc.into_iter().filter(|&(_, v)| v != 0.0).collect()
            })
            .collect();
        SparseMatrix {
            n_cols: other.n_cols,
            rows,
        }
    }

    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        (0..self.n_rows())
            .map(|r| {
                let mut dense = vec![0.0; self.n_cols];
                for &(c, v) in self.row(r) {
                    dense[c] = v;
                }
                dense
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_counts() {
        // 2 documentos × 3 tokens
        let docs = SparseMatrix::from_rows(
            3,
            vec![vec![(0, 1.0), (1, 1.0), (2, 1.0)], vec![(2, 1.0)]],
        );
        // tokens 0 e 1 → coluna 0; token 2 → coluna 1
        let membership = SparseMatrix::from_rows(
            2,
            vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(1, 1.0)]],
        );
        let out = docs.dot(&membership);
        assert_eq!(out.to_dense(), vec![vec![2.0, 1.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_select_and_binarize() {
        let m = SparseMatrix::from_rows(3, vec![vec![(0, 0.5), (2, 0.25)]]);
        let picked = m.select_columns(&[2, 0]).binarize();
        assert_eq!(picked.to_dense(), vec![vec![1.0, 1.0]]);
        assert_eq!(m.get(0, 2), 0.25);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.column_sums(), vec![0.5, 0.0, 0.25]);
    }
}

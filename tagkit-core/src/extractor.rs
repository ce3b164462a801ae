//! # Extração de Vocabulário (TF-IDF sublinear)
//!
//! Ordena os tokens (ou n-gramas) do corpus pela soma, sobre todos os
//! documentos, do seu peso TF-IDF. É a etapa que decide **quais** termos o
//! analista vai classificar primeiro.
//!
//! ## Ponderação
//!
//! Para o termo `t` no documento `d`, com `n` documentos e `df(t)` documentos
//! contendo `t`:
//!
//! ```text
//! tf(t, d)  = 1 + ln(count)           (sublinear; senão, count)
//! idf(t)    = ln(n / df) + 1          (sem suavização)
//! idf(t)    = ln((1 + n) / (1 + df)) + 1   (com suavização)
//! w(t, d)   = tf · idf, e cada linha é normalizada em L2
//! ```
//!
//! A ordem das *features* é alfabética. O ranking é a ordenação estável e
//! decrescente das somas por coluna, então empates mantêm a ordem alfabética.
//!
//! ## Exemplo
//!
//! ```rust
//! use tagkit_core::extractor::{ExtractorOptions, StopWords, VocabularyExtractor};
//!
//! let mut extractor = VocabularyExtractor::new(ExtractorOptions {
//!     stop_words: StopWords::None,
//!     ..Default::default()
//! });
//! extractor.fit(&["pump leak".to_string(), "pump".to_string()]).unwrap();
//! assert_eq!(extractor.ranked_tokens().unwrap(), vec!["pump", "leak"]);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_TOKEN_PATTERN;
use crate::error::{Result, TagError};
use crate::matrix::SparseMatrix;
use crate::stop_words::ENGLISH_STOP_WORDS;

/// Conjunto de stop words removido antes da contagem.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWords {
    None,
    #[default]
    English,
    Custom(Vec<String>),
}

impl StopWords {
    fn to_set(&self) -> HashSet<String> {
        match self {
            StopWords::None => HashSet::new(),
            StopWords::English => ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            StopWords::Custom(words) => words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

/// Parâmetros do vetorizador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    /// Tamanhos de n-grama `(mín, máx)`, inclusivos.
    pub ngram_range: (usize, usize),
    pub stop_words: StopWords,
    /// Limite de termos mantidos; `None` mantém todos.
    pub max_features: Option<usize>,
    pub smooth_idf: bool,
    pub sublinear_tf: bool,
    pub token_pattern: String,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            ngram_range: (1, 1),
            stop_words: StopWords::English,
            max_features: Some(5000),
            smooth_idf: false,
            sublinear_tf: true,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
        }
    }
}

impl ExtractorOptions {
    /// Opções padrão com n-gramas de 1 até `max`.
    pub fn with_ngram_max(max: usize) -> Self {
        Self {
            ngram_range: (1, max.max(1)),
            ..Default::default()
        }
    }
}

/// Tokenizador + filtro de stop words + gerador de n-gramas.
struct Analyzer {
    pattern: Regex,
    stop_words: HashSet<String>,
    ngram_range: (usize, usize),
}

impl Analyzer {
    fn new(options: &ExtractorOptions) -> Result<Self> {
        let (lo, hi) = options.ngram_range;
        let lo = lo.max(1);
        Ok(Self {
            pattern: Regex::new(&options.token_pattern)?,
            stop_words: options.stop_words.to_set(),
            ngram_range: (lo, hi.max(lo)),
        })
    }

    /// Contagem de termos de um documento (minúsculas, sem stop words).
    fn count(&self, document: &str) -> HashMap<String, usize> {
        let lowered = document.to_lowercase();
        let tokens: Vec<&str> = self
            .pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        let mut counts = HashMap::new();
        let (lo, hi) = self.ngram_range;
        for n in lo..=hi {
            for window in tokens.windows(n) {
                *counts.entry(window.join(" ")).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Estado aprendido no `fit`.
#[derive(Debug, Clone)]
struct FittedModel {
    /// Termos em ordem alfabética; a posição é o índice da coluna.
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
    /// Matriz documento × termo do último lote processado.
    tfidf: SparseMatrix,
    /// Soma de cada coluna de `tfidf`.
    sums: Vec<f64>,
}

/// Vetorizador TF-IDF que produz o vocabulário ranqueado.
#[derive(Debug, Clone, Default)]
pub struct VocabularyExtractor {
    options: ExtractorOptions,
    model: Option<FittedModel>,
}

impl VocabularyExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self {
            options,
            model: None,
        }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Aprende vocabulário, frequências de documento e idf.
    ///
    /// Corpus sem nenhum termo útil não é erro: o vocabulário fica vazio.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        let analyzer = Analyzer::new(&self.options)?;
        let counts: Vec<HashMap<String, usize>> =
            documents.par_iter().map(|d| analyzer.count(d)).collect();

        let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &counts {
            for (term, &c) in doc {
                *totals.entry(term.as_str()).or_insert(0) += c;
            }
        }

        let mut terms: Vec<(&str, usize)> = totals.into_iter().collect();
        if let Some(limit) = self.options.max_features {
            if terms.len() > limit {
                // ordenação estável: empates de contagem ficam em ordem alfabética
                terms.sort_by(|a, b| b.1.cmp(&a.1));
                terms.truncate(limit);
                terms.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        let vocabulary: Vec<String> = terms.iter().map(|(t, _)| t.to_string()).collect();
        let index: HashMap<String, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        for doc in &counts {
            for term in doc.keys() {
                if let Some(&j) = index.get(term) {
                    df[j] += 1;
                }
            }
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| {
                let d = d as f64;
                if self.options.smooth_idf {
                    ((1.0 + n) / (1.0 + d)).ln() + 1.0
                } else {
                    (n / d).ln() + 1.0
                }
            })
            .collect();

        if vocabulary.is_empty() {
            debug!(
                documents = documents.len(),
                "nenhum termo sobreviveu à tokenização; vocabulário vazio"
            );
        }

        let tfidf = self.weigh(&counts, &index, &idf, vocabulary.len());
        let sums = tfidf.column_sums();
        self.model = Some(FittedModel {
            vocabulary,
            index,
            idf,
            tfidf,
            sums,
        });
        Ok(())
    }

    /// Projeta `documents` no vocabulário aprendido.
    ///
    /// As somas por coluna (e portanto o ranking) passam a refletir este lote.
    pub fn transform(&mut self, documents: &[String]) -> Result<SparseMatrix> {
        let analyzer = Analyzer::new(&self.options)?;
        let model = self.model.as_ref().ok_or(TagError::NotFitted)?;
        let counts: Vec<HashMap<String, usize>> =
            documents.par_iter().map(|d| analyzer.count(d)).collect();
        let tfidf = self.weigh(&counts, &model.index, &model.idf, model.vocabulary.len());
        let sums = tfidf.column_sums();

        let model = self.model.as_mut().ok_or(TagError::NotFitted)?;
        model.tfidf = tfidf.clone();
        model.sums = sums;
        Ok(tfidf)
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<SparseMatrix> {
        self.fit(documents)?;
        self.tfidf().cloned()
    }

    /// Matriz documento × termo do último `fit`/`transform`.
    pub fn tfidf(&self) -> Result<&SparseMatrix> {
        Ok(&self.fitted()?.tfidf)
    }

    /// Termos na ordem das colunas (alfabética).
    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.vocabulary)
    }

    /// Índices de coluna ordenados pela soma TF-IDF decrescente.
    pub fn ranks(&self) -> Result<Vec<usize>> {
        let model = self.fitted()?;
        let mut order: Vec<usize> = (0..model.vocabulary.len()).collect();
        order.sort_by(|&a, &b| {
            model.sums[b]
                .partial_cmp(&model.sums[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        if let Some(limit) = self.options.max_features {
            order.truncate(limit);
        }
        Ok(order)
    }

    pub fn ranked_tokens(&self) -> Result<Vec<String>> {
        let model = self.fitted()?;
        Ok(self
            .ranks()?
            .into_iter()
            .map(|i| model.vocabulary[i].clone())
            .collect())
    }

    /// Somas ranqueadas reescaladas para `[0, 1]`; tudo `1.0` quando não há
    /// variação.
    pub fn normalized_scores(&self) -> Result<Vec<f64>> {
        let model = self.fitted()?;
        let ranked: Vec<f64> = self.ranks()?.into_iter().map(|i| model.sums[i]).collect();
        let max = ranked.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = ranked.iter().copied().fold(f64::INFINITY, f64::min);
        let span = max - min;
        if ranked.is_empty() || span.abs() < f64::EPSILON {
            return Ok(vec![1.0; ranked.len()]);
        }
        Ok(ranked.iter().map(|s| (s - min) / span).collect())
    }

    fn fitted(&self) -> Result<&FittedModel> {
        self.model.as_ref().ok_or(TagError::NotFitted)
    }

    fn weigh(
        &self,
        counts: &[HashMap<String, usize>],
        index: &HashMap<String, usize>,
        idf: &[f64],
        n_cols: usize,
    ) -> SparseMatrix {
        let sublinear = self.options.sublinear_tf;
        let rows: Vec<Vec<(usize, f64)>> = counts
            .par_iter()
            .map(|doc| {
                let mut row: Vec<(usize, f64)> = doc
                    .iter()
                    .filter_map(|(term, &c)| {
                        let j = *index.get(term)?;
                        let tf = if sublinear {
                            1.0 + (c as f64).ln()
                        } else {
                            c as f64
                        };
                        Some((j, tf * idf[j]))
                    })
                    .collect();
                row.sort_by_key(|&(j, _)| j);
                // soma em ordem de magnitude: documentos com o mesmo perfil de
                // contagens recebem exatamente a mesma norma
                let mut squares: Vec<f64> = row.iter().map(|&(_, v)| v * v).collect();
                squares.sort_by(f64::total_cmp);
                let norm = squares.iter().sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|(_, v)| *v /= norm);
                }
                row
            })
            .collect();
        SparseMatrix::from_rows(n_cols, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn plain() -> ExtractorOptions {
        ExtractorOptions {
            stop_words: StopWords::None,
            ..Default::default()
        }
    }

    #[test]
    fn test_not_fitted() {
        let mut ex = VocabularyExtractor::default();
        assert!(matches!(ex.ranked_tokens(), Err(TagError::NotFitted)));
        assert!(matches!(ex.normalized_scores(), Err(TagError::NotFitted)));
        assert!(matches!(ex.transform(&docs(&["x"])), Err(TagError::NotFitted)));
    }

    #[test]
    fn test_tfidf_weights() {
        let mut ex = VocabularyExtractor::new(plain());
        ex.fit(&docs(&["pump leak", "pump"])).unwrap();
        assert_eq!(ex.feature_names().unwrap(), &["leak", "pump"]);

        // idf(leak) = ln 2 + 1, idf(pump) = 1
        let idf_leak = 2f64.ln() + 1.0;
        let norm = (idf_leak * idf_leak + 1.0).sqrt();
        let m = ex.tfidf().unwrap();
        assert!((m.get(0, 0) - idf_leak / norm).abs() < 1e-12);
        assert!((m.get(0, 1) - 1.0 / norm).abs() < 1e-12);
        assert!((m.get(1, 1) - 1.0).abs() < 1e-12);

        assert_eq!(ex.ranks().unwrap(), vec![1, 0]);
        assert_eq!(ex.ranked_tokens().unwrap(), vec!["pump", "leak"]);
        assert_eq!(ex.normalized_scores().unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_sublinear_tf() {
        let mut ex = VocabularyExtractor::new(plain());
        ex.fit(&docs(&["leak leak leak pump", "pump"])).unwrap();
        let idf_leak = 2f64.ln() + 1.0;
        let tf = 1.0 + 3f64.ln();
        let w = tf * idf_leak;
        let norm = (w * w + 1.0).sqrt();
        assert!((ex.tfidf().unwrap().get(0, 0) - w / norm).abs() < 1e-12);
    }

    #[test]
    fn test_english_stop_words_and_lowercase() {
        let mut ex = VocabularyExtractor::default();
        ex.fit(&docs(&["The PUMP is leaking"])).unwrap();
        assert_eq!(ex.feature_names().unwrap(), &["leaking", "pump"]);
    }

    #[test]
    fn test_bigrams_after_stop_words() {
        let mut ex = VocabularyExtractor::new(ExtractorOptions::with_ngram_max(2));
        ex.fit(&docs(&["replaced the hyd hose"])).unwrap();
        assert_eq!(
            ex.feature_names().unwrap(),
            &["hose", "hyd", "hyd hose", "replaced", "replaced hyd"]
        );
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut ex = VocabularyExtractor::new(ExtractorOptions {
            max_features: Some(2),
            ..plain()
        });
        ex.fit(&docs(&["cc aa aa bb", "cc"])).unwrap();
        // contagens: aa=2, bb=1, cc=2 → mantém aa e cc
        assert_eq!(ex.feature_names().unwrap(), &["aa", "cc"]);
        assert_eq!(ex.ranks().unwrap().len(), 2);
    }

    #[test]
    fn test_equal_scores_normalize_to_one() {
        let mut ex = VocabularyExtractor::new(plain());
        ex.fit(&docs(&["aa", "bb"])).unwrap();
        assert_eq!(ex.ranked_tokens().unwrap(), vec!["aa", "bb"]);
        assert_eq!(ex.normalized_scores().unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_empty_vocabulary_is_not_an_error() {
        let mut ex = VocabularyExtractor::default();
        ex.fit(&docs(&["the of", ""])).unwrap();
        assert!(ex.is_fitted());
        assert!(ex.ranked_tokens().unwrap().is_empty());
        assert!(ex.normalized_scores().unwrap().is_empty());
    }

    #[test]
    fn test_transform_recomputes_sums() {
        let mut ex = VocabularyExtractor::new(plain());
        ex.fit(&docs(&["aa bb", "aa"])).unwrap();
        assert_eq!(ex.ranked_tokens().unwrap(), vec!["aa", "bb"]);
        let m = ex.transform(&docs(&["bb", "bb zz"])).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.get(1, 1), 1.0);
        assert_eq!(ex.ranked_tokens().unwrap(), vec!["bb", "aa"]);
    }

    #[test]
    fn test_ties_keep_alphabetical_order_across_fits() {
        // 8 documentos com o mesmo perfil de contagens sob prefixos distintos
        let profile = [
            ('a', 1),
            ('b', 2),
            ('c', 3),
            ('d', 5),
            ('e', 7),
            ('f', 11),
            ('g', 13),
            ('h', 4),
            ('i', 6),
            ('j', 9),
        ];
        let corpus: Vec<String> = "klmnopqr"
            .chars()
            .map(|doc| {
                profile
                    .iter()
                    .flat_map(|&(letter, count)| {
                        std::iter::repeat(format!("{letter}{doc}x")).take(count)
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        let mut expected: Vec<(usize, String)> = profile
            .iter()
            .flat_map(|&(letter, count)| {
                "klmnopqr"
                    .chars()
                    .map(move |doc| (count, format!("{letter}{doc}x")))
            })
            .collect();
        expected.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let expected: Vec<String> = expected.into_iter().map(|(_, t)| t).collect();

        for _ in 0..50 {
            let mut ex = VocabularyExtractor::new(plain());
            ex.fit(&corpus).unwrap();
            assert_eq!(ex.ranked_tokens().unwrap(), expected);
        }
    }

    #[test]
    fn test_invalid_pattern() {
        let mut ex = VocabularyExtractor::new(ExtractorOptions {
            token_pattern: "(".into(),
            ..Default::default()
        });
        assert!(matches!(ex.fit(&docs(&["x"])), Err(TagError::Pattern(_))));
    }
}

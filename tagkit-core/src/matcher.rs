//! # Motor de Casamento por Vocabulário
//!
//! Compila **uma única** regex de alternância sobre um vocabulário arbitrário e
//! a usa para reescrever texto (token → alias, token → tipo de entidade) ou para
//! tokenizar com prioridade ao vocabulário.
//!
//! ## Maior casamento primeiro
//!
//! O motor `regex` escolhe a primeira alternativa que casa numa posição
//! (semântica *leftmost-first*). Por isso as entradas são ordenadas por
//! comprimento decrescente antes da compilação: com o vocabulário
//! `["these", "there", "the"]` e o texto `"there-in"`, o casamento é `"there"`
//! e nunca `"the"`.
//!
//! ```rust
//! use tagkit_core::matcher::VocabMatcher;
//!
//! let matcher = VocabMatcher::compile(["the", "these", "there"]).unwrap();
//! assert_eq!(matcher.find_all("there-in"), vec!["there"]);
//! ```

use std::collections::HashMap;

use rayon::prelude::*;
use regex::{Regex, RegexBuilder};

use crate::error::Result;
use crate::vocabulary::VocabularyTable;

/// Limite de tamanho da regex compilada; vocabulários de milhares de n-gramas
/// estouram o padrão de 10 MB do crate `regex`.
const REGEX_SIZE_LIMIT: usize = 256 * (1 << 20);

/// Regex de alternância compilada sobre um vocabulário.
///
/// `None` representa o vocabulário vazio sem padrão de fallback: não casa nada.
#[derive(Debug, Clone)]
pub struct VocabMatcher {
    regex: Option<Regex>,
}

impl VocabMatcher {
    /// Casamento de palavra inteira sobre o vocabulário (modo substituição).
    pub fn compile<I, S>(vocabulary: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let regex = match alternation(vocabulary) {
            Some(alts) => Some(build_regex(&format!(r"\b(?:{alts})\b"))?),
            None => None,
        };
        Ok(Self { regex })
    }

    /// Modo tokenização: vocabulário primeiro, depois o tokenizador genérico.
    ///
    /// Qualquer entrada do vocabulário tem precedência sobre a tokenização
    /// genérica, mas todo token genérico continua aparecendo. Com vocabulário
    /// vazio cai para o `token_pattern` sozinho.
    pub fn tokenizer<I, S>(vocabulary: I, token_pattern: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pattern = match alternation(vocabulary) {
            Some(alts) => format!(r"\b(?:{alts})\b|(?:{token_pattern})"),
            None => token_pattern.to_string(),
        };
        Ok(Self {
            regex: Some(build_regex(&pattern)?),
        })
    }

    /// `true` se o matcher nunca casa nada.
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    /// Todos os casamentos, sem sobreposição, em ordem de ocorrência.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match &self.regex {
            Some(rx) => rx.find_iter(text).map(|m| m.as_str()).collect(),
            None => Vec::new(),
        }
    }

    /// Substitui cada casamento pelo valor do mapa; casamentos sem entrada
    /// passam inalterados.
    pub fn substitute(&self, text: &str, replacements: &HashMap<String, String>) -> String {
        self.rewrite(text, |matched, out| {
            out.push_str(
                replacements
                    .get(matched)
                    .map(String::as_str)
                    .unwrap_or(matched),
            )
        })
    }

    /// Igual a [`substitute`](Self::substitute), mas casamentos sem entrada
    /// viram `default` (ex: `"U"` na resolução de tipos).
    pub fn substitute_or(
        &self,
        text: &str,
        replacements: &HashMap<String, String>,
        default: &str,
    ) -> String {
        self.rewrite(text, |matched, out| {
            out.push_str(
                replacements
                    .get(matched)
                    .map(String::as_str)
                    .unwrap_or(default),
            )
        })
    }

    /// Passada única: copia trechos não casados e troca os casados.
    fn rewrite<F>(&self, text: &str, mut replace: F) -> String
    where
        F: FnMut(&str, &mut String),
    {
        let Some(rx) = &self.regex else {
            return text.to_string();
        };
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in rx.find_iter(text) {
            out.push_str(&text[last..m.start()]);
            replace(m.as_str(), &mut out);
            last = m.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

/// Alternância escapada, maior entrada primeiro. `None` para vocabulário vazio.
fn alternation<I, S>(vocabulary: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut entries: Vec<String> = vocabulary
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if entries.is_empty() {
        return None;
    }
    // Empates de comprimento em ordem lexicográfica: regex determinística
    entries.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    entries.dedup();
    Some(
        entries
            .iter()
            .map(|e| regex::escape(e))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn build_regex(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()?)
}

/// Reescreve cada documento trocando trechos conhecidos pelo valor do dicionário.
pub fn thesaurus_normalize(
    texts: &[String],
    thesaurus: &HashMap<String, String>,
) -> Result<Vec<String>> {
    let matcher = VocabMatcher::compile(thesaurus.keys())?;
    Ok(texts
        .par_iter()
        .map(|text| matcher.substitute(text, thesaurus))
        .collect())
}

/// Troca tokens conhecidos pelo alias atribuído pelo analista.
///
/// Só entradas com alias não vazio participam. O maior casamento vence, então
/// `"quick brown fox" → fast_animal` tem precedência sobre `"fox" → fox`.
pub fn token_to_alias(texts: &[String], vocabulary: &VocabularyTable) -> Result<Vec<String>> {
    thesaurus_normalize(texts, &vocabulary.alias_map())
}

//! # Entidades Derivadas (n-gramas)
//!
//! O analista usa as tags atômicas como blocos de montar: depois que os
//! 1-gramas têm alias, o texto é reescrito com esses aliases e os **bigramas**
//! do texto reescrito viram candidatos a conceitos compostos
//! (ex: `"hyd_leak pump"` → problema + item → `"P I"`).
//!
//! ## Pipeline
//!
//! ```text
//! texto bruto ──token_to_alias(1-gramas)──▶ replaced_text
//!      │                                         │
//!      │                   (com init) promove n-gramas atômicos com alias
//!      │                                         ▼
//!      │                                   replaced_again
//!      │                                         │
//!      └──────────── extrator (2, 2) ◀───────────┘
//!                         │
//!                  VocabularyTable ──propose(regras)──▶ vocabulário de n-gramas
//! ```
//!
//! [`propose`] só preenche linhas que ainda não têm alias: o que o analista
//! já decidiu nunca é sobrescrito.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::TaggingConfig;
use crate::entity::EntityType;
use crate::error::Result;
use crate::extractor::{ExtractorOptions, VocabularyExtractor};
use crate::matcher::{token_to_alias, VocabMatcher};
use crate::tagger::{tag_documents, TagMatrix, TagOptions};
use crate::vocabulary::VocabularyTable;

/// Resultado de [`build_ngram_vocabulary`].
#[derive(Debug, Clone)]
pub struct NgramVocabulary {
    /// Vocabulário de n-gramas com tipos compostos propostos.
    pub vocabulary: VocabularyTable,
    /// Extrator de bigramas já treinado.
    pub extractor: VocabularyExtractor,
    /// Texto com os 1-gramas trocados pelos aliases.
    pub replaced_text: Vec<String>,
    /// `replaced_text` com os n-gramas atômicos de `init` também trocados.
    pub replaced_again: Option<Vec<String>>,
}

/// Opções do extrator de bigramas, com o padrão de token da configuração.
pub fn bigram_options(config: &TaggingConfig) -> ExtractorOptions {
    ExtractorOptions {
        ngram_range: (2, 2),
        token_pattern: config.token_pattern.clone(),
        ..Default::default()
    }
}

/// Propõe tipos compostos para as linhas de `composite` ainda sem alias.
///
/// Cada palavra do n-grama é trocada pelo tipo que tem em `atomic` (por token
/// ou por alias), formando uma assinatura como `"P I"`. Se a assinatura está
/// em `rules`, vale o tipo da regra; senão, a própria assinatura.
pub fn propose(
    atomic: &VocabularyTable,
    composite: &VocabularyTable,
    rules: &IndexMap<String, EntityType>,
) -> Result<VocabularyTable> {
    let mut lookup: HashMap<String, String> = HashMap::new();
    for (token, entry) in atomic.iter() {
        lookup.insert(token.to_string(), type_code(&entry.entity_type));
    }
    for (_, entry) in atomic.iter().filter(|(_, e)| !e.alias.is_empty()) {
        lookup.insert(entry.alias.clone(), type_code(&entry.entity_type));
    }
    lookup.remove("");

    let matcher = VocabMatcher::compile(lookup.keys())?;
    let mut out = composite.clone();
    let mut proposed = 0usize;
    for (token, _) in composite.iter().filter(|(_, e)| e.alias.is_empty()) {
        let signature = matcher.substitute(token, &lookup);
        let entity_type = rules
            .get(&signature)
            .cloned()
            .unwrap_or_else(|| EntityType::from_code(&signature));
        if let Some(row) = out.get_mut(token) {
            row.entity_type = entity_type;
            proposed += 1;
        }
    }
    debug!(proposed, "tipos compostos propostos");
    Ok(out)
}

fn type_code(entity_type: &EntityType) -> String {
    if entity_type.is_unclassified() {
        EntityType::Untagged.code().to_string()
    } else {
        entity_type.code().to_string()
    }
}

/// Constrói (ou atualiza, com `init`) o vocabulário de n-gramas.
pub fn build_ngram_vocabulary(
    raw_text: &[String],
    vocab_1gram: &VocabularyTable,
    init: Option<&VocabularyTable>,
    config: &TaggingConfig,
) -> Result<NgramVocabulary> {
    let replaced_text = token_to_alias(raw_text, vocab_1gram)?;
    let mut extractor = VocabularyExtractor::new(bigram_options(config));

    let (vocabulary, replaced_again) = match init {
        None => {
            extractor.fit(&replaced_text)?;
            (VocabularyTable::build(&extractor, None)?, None)
        }
        Some(init) => {
            // n-gramas já anotados como atômicos passam a valer como 1-gramas
            let promoted: VocabularyTable = init
                .iter()
                .filter(|(_, e)| config.is_atomic(&e.entity_type) && !e.alias.is_empty())
                .map(|(t, e)| (t.to_string(), e.clone()))
                .collect();
            let combined = vocab_1gram.concat_dedup(&promoted);
            let replaced_again = token_to_alias(&replaced_text, &combined)?;

            extractor.fit(&replaced_again)?;
            let fresh = VocabularyTable::build(&extractor, Some(init))?;
            let mut merged = init.concat_dedup(&fresh);
            merged.sort_by_score_desc();
            (merged, Some(replaced_again))
        }
    };

    let vocabulary = propose(vocab_1gram, &vocabulary, &config.entity_rules)?;
    Ok(NgramVocabulary {
        vocabulary,
        extractor,
        replaced_text,
        replaced_again,
    })
}

/// Só as linhas com alias.
fn aliased(table: &VocabularyTable) -> VocabularyTable {
    table
        .iter()
        .filter(|(_, e)| !e.alias.is_empty())
        .map(|(t, e)| (t.to_string(), e.clone()))
        .collect()
}

/// Etiquetagem completa em 1-gramas e n-gramas.
///
/// Devolve `(atômicas, derivadas)`: a primeira matriz tem as colunas de tipos
/// atômicos, *holes* e `NA`; a segunda, as de tipos derivados.
pub fn keyword_pipeline(
    raw_text: &[String],
    vocab_1gram: &VocabularyTable,
    vocab_ngram: &VocabularyTable,
    config: &TaggingConfig,
) -> Result<(TagMatrix, TagMatrix)> {
    let options = TagOptions::default();

    let mut unigrams = VocabularyExtractor::new(ExtractorOptions {
        token_pattern: config.token_pattern.clone(),
        ..Default::default()
    });
    let tags_1gram = tag_documents(&mut unigrams, raw_text, Some(&aliased(vocab_1gram)), &options)?;

    let mut ngram = build_ngram_vocabulary(raw_text, vocab_1gram, Some(vocab_ngram), config)?;

    let mut bigrams = VocabularyExtractor::new(bigram_options(config));
    let tags_2gram = tag_documents(
        &mut bigrams,
        &ngram.replaced_text,
        Some(&aliased(vocab_ngram)),
        &options,
    )?;

    let settled: VocabularyTable = ngram
        .vocabulary
        .iter()
        .filter(|(t, _)| vocab_ngram.get(t).is_some_and(|e| !e.alias.is_empty()))
        .map(|(t, e)| (t.to_string(), e.clone()))
        .collect();
    let replaced_again = ngram
        .replaced_again
        .clone()
        .unwrap_or_else(|| ngram.replaced_text.clone());
    let tags_promoted = tag_documents(&mut ngram.extractor, &replaced_again, Some(&settled), &options)?;

    let tags = tags_1gram
        .combine_first(&tags_2gram)
        .combine_first(&tags_promoted);

    let derived = tags.pick_types(&config.derived);
    let mut basic = config.atomics.clone();
    basic.extend(config.holes.iter().cloned());
    basic.push(EntityType::Untagged);
    let atomic = tags.pick_types(&basic);

    Ok((atomic, derived))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyEntry;

    fn row(ne: &str, alias: &str) -> VocabularyEntry {
        VocabularyEntry::classified(EntityType::from_code(ne), alias)
    }

    fn animals() -> VocabularyTable {
        [
            ("fox", row("I", "fox")),
            ("brown fox", row("I", "brown_animal")),
            ("quick brown fox", row("I", "fast_animal")),
            ("jumped", row("V", "jump")),
            ("dog", row("I", "dog")),
            ("lazy dog", row("I", "slow_animal")),
            ("the", row("X", "")),
            ("over", row("U", "")),
        ]
        .into_iter()
        .map(|(t, e)| (t.to_string(), e))
        .collect()
    }

    fn text() -> Vec<String> {
        vec![
            "the quick brown fox jumped over the lazy dog".to_string(),
            "the fox jumped over the dog".to_string(),
        ]
    }

    #[test]
    fn test_propose_signatures() {
        let composite: VocabularyTable = [
            ("fast_animal jump", row("", "")),
            ("fox dog", row("", "")),
            ("fox jump", row("S", "fox_jump")),
        ]
        .into_iter()
        .map(|(t, e)| (t.to_string(), e))
        .collect();

        let out = propose(&animals(), &composite, &TaggingConfig::default().entity_rules).unwrap();
        // sem regra: fica a assinatura crua
        assert_eq!(out.get("fast_animal jump").unwrap().entity_type.code(), "I V");
        // "I I" → I pela regra padrão
        assert_eq!(out.get("fox dog").unwrap().entity_type, EntityType::Item);
        assert_eq!(out.get("fox jump").unwrap(), composite.get("fox jump").unwrap());
    }

    #[test]
    fn test_propose_untagged_words() {
        let atomic: VocabularyTable = [("pump", row("", "")), ("leak", row("P", ""))]
            .into_iter()
            .map(|(t, e)| (t.to_string(), e))
            .collect();
        let composite: VocabularyTable = [("leak pump", row("", ""))]
            .into_iter()
            .map(|(t, e)| (t.to_string(), e))
            .collect();
        let out = propose(&atomic, &composite, &IndexMap::new()).unwrap();
        assert_eq!(out.get("leak pump").unwrap().entity_type.code(), "P NA");
    }

    #[test]
    fn test_build_without_init() {
        let ngram =
            build_ngram_vocabulary(&text(), &animals(), None, &TaggingConfig::default()).unwrap();
        assert_eq!(
            ngram.replaced_text,
            vec![
                "the fast_animal jump over the slow_animal".to_string(),
                "the fox jump over the dog".to_string(),
            ]
        );
        assert!(ngram.replaced_again.is_none());
        assert!(ngram.extractor.is_fitted());
        let entry = ngram.vocabulary.get("fast_animal jump").unwrap();
        assert_eq!(entry.entity_type.code(), "I V");
        assert_eq!(
            ngram.vocabulary.get("jump slow_animal").unwrap().entity_type.code(),
            "V I"
        );
    }

    #[test]
    fn test_build_with_init_promotes_atomic_ngrams() {
        let init: VocabularyTable = [(
            "fast_animal jump",
            VocabularyEntry {
                score: 0.5,
                ..row("I", "fast_jump")
            },
        )]
        .into_iter()
        .map(|(t, e)| (t.to_string(), e))
        .collect();

        let ngram = build_ngram_vocabulary(&text(), &animals(), Some(&init), &TaggingConfig::default())
            .unwrap();
        let again = ngram.replaced_again.unwrap();
        assert_eq!(again[0], "the fast_jump over the slow_animal");
        assert_eq!(
            ngram.vocabulary.get("fast_animal jump").unwrap(),
            init.get("fast_animal jump").unwrap()
        );
        assert!(ngram.vocabulary.contains("fast_jump slow_animal"));
        assert_eq!(ngram.vocabulary.get("fox jump").unwrap().entity_type.code(), "I V");
    }

    #[test]
    fn test_keyword_pipeline_splits_types() {
        let vocab_ngram: VocabularyTable = [("fox jump", row("P I", "fox_jump"))]
            .into_iter()
            .map(|(t, e)| (t.to_string(), e))
            .collect();
        let (atomic, derived) =
            keyword_pipeline(&text(), &animals(), &vocab_ngram, &TaggingConfig::default())
                .unwrap();

        assert!(atomic
            .columns
            .iter()
            .all(|(ty, _)| !matches!(ty, EntityType::Derived(_))));
        assert_eq!(atomic.get(0, &EntityType::Item, "fox"), 1.0);
        assert_eq!(atomic.get(1, &EntityType::Item, "dog"), 1.0);
        assert_eq!(derived.columns, vec![(EntityType::from_code("P I"), "fox_jump".to_string())]);
        assert_eq!(derived.get(1, &EntityType::from_code("P I"), "fox_jump"), 1.0);
        assert_eq!(derived.get(0, &EntityType::from_code("P I"), "fox_jump"), 0.0);
    }
}

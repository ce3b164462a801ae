//! # tagkit-core — Anotação de Vocabulário em Ordens de Serviço
//!
//! Este crate implementa o pipeline de curadoria de texto de manutenção: textos
//! curtos, cheios de jargão e abreviações ("hyd lk @ pump 3, repl seal"), são
//! transformados em um vocabulário ranqueado que o analista classifica, e esse
//! vocabulário é usado para etiquetar cada documento.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Normalização** ([`normalize`]): junta as colunas de texto livre e limpa
//!     pontuação, quebras de linha e abreviações conhecidas.
//! 2.  **Extração** ([`extractor`]): TF-IDF sublinear ranqueia tokens e n-gramas
//!     pela importância somada no corpus.
//! 3.  **Vocabulário** ([`vocabulary`]): tabela token → (tipo, alias, notas,
//!     score) mantida pelo analista, mesclada entre rodadas e salva em CSV.
//! 4.  **Casamento** ([`matcher`]): uma única regex "maior casamento primeiro"
//!     para trocar tokens por aliases ou tokenizar com prioridade ao vocabulário.
//! 5.  **Etiquetagem** ([`tagger`], [`iob`]): matriz documento × tag e sequência
//!     de rótulos IOB.
//! 6.  **Derivadas** ([`derived`]): bigramas sobre o texto já normalizado
//!     propõem tipos compostos (`"P I"`, `"S I"`).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use tagkit_core::{EntityType, TagOptions, VocabularyExtractor, VocabularyTable};
//! use tagkit_core::tagger::tag_documents;
//!
//! let text = vec!["hyd leak at pump".to_string(), "replaced pump seal".to_string()];
//!
//! // 1. Ranqueia o vocabulário
//! let mut extractor = VocabularyExtractor::default();
//! extractor.fit(&text).unwrap();
//! let mut vocab = VocabularyTable::build(&extractor, None).unwrap();
//!
//! // 2. O analista classifica
//! vocab.set_classification("pump", EntityType::Item, "pump");
//! vocab.set_classification("leak", EntityType::Problem, "leak");
//!
//! // 3. Etiqueta os documentos
//! let tags = tag_documents(&mut extractor, &text, Some(&vocab), &TagOptions::default()).unwrap();
//! assert_eq!(tags.get(0, &EntityType::Item, "pump"), 1.0);
//! ```
//!
//! ## Módulos de Suporte
//!
//! - [`config`]: parâmetros explícitos do pipeline (nada de estado global).
//! - [`dataset`]: tabela de documentos brutos, lida de CSV.
//! - [`entity`]: códigos de tipo de entidade.
//! - [`error`]: taxonomia de erros.
//! - [`matrix`]: matriz esparsa usada pelo extrator e pelo etiquetador.

pub mod config;
pub mod dataset;
pub mod derived;
pub mod entity;
pub mod error;
pub mod extractor;
pub mod iob;
pub mod matcher;
pub mod matrix;
pub mod normalize;
pub mod stop_words;
pub mod tagger;
pub mod vocabulary;

pub use config::TaggingConfig;
pub use dataset::Dataset;
pub use derived::{build_ngram_vocabulary, keyword_pipeline, propose, NgramVocabulary};
pub use entity::EntityType;
pub use error::{Result, TagError};
pub use extractor::{ExtractorOptions, StopWords, VocabularyExtractor};
pub use iob::{iob_labels, IobRow, IobTag};
pub use matcher::{thesaurus_normalize, token_to_alias, VocabMatcher};
pub use normalize::{ColumnSelector, NormalizedText, TextNormalizer};
pub use tagger::{completeness, TagCompleteness, TagMatrix, TagOptions};
pub use vocabulary::{VocabularyEntry, VocabularyTable};

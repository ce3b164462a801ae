//! Cenários de ponta a ponta do pipeline de anotação.

use tagkit_core::derived::propose;
use tagkit_core::normalize::{ColumnSelector, TextNormalizer};
use tagkit_core::tagger::tag_documents;
use tagkit_core::{
    completeness, iob_labels, token_to_alias, Dataset, EntityType, ExtractorOptions, StopWords,
    TagOptions, TaggingConfig, VocabMatcher, VocabularyEntry, VocabularyExtractor,
    VocabularyTable,
};

fn entry(ne: &str, alias: &str) -> VocabularyEntry {
    VocabularyEntry::classified(EntityType::from_code(ne), alias)
}

fn table(rows: &[(&str, &str, &str)]) -> VocabularyTable {
    rows.iter()
        .map(|(t, ne, alias)| (t.to_string(), entry(ne, alias)))
        .collect()
}

fn animals() -> VocabularyTable {
    table(&[
        ("fox", "I", "fox"),
        ("brown fox", "I", "brown_animal"),
        ("quick brown fox", "I", "fast_animal"),
        ("jumped", "V", "jump"),
        ("dog", "I", "dog"),
        ("lazy dog", "I", "slow_animal"),
        ("the", "X", ""),
        ("over", "U", ""),
    ])
}

fn documents() -> Vec<String> {
    vec![
        "the quick brown fox jumped over the lazy dog".to_string(),
        "the fox jumped over the dog".to_string(),
    ]
}

#[test]
fn test_longest_match_precedence() {
    let matcher = VocabMatcher::compile(["these", "there", "the"]).unwrap();
    assert_eq!(matcher.find_all("there-in"), vec!["there"]);
}

#[test]
fn test_alias_substitution_scenario() {
    let replaced = token_to_alias(&documents(), &animals()).unwrap();
    assert_eq!(
        replaced,
        vec![
            "the fast_animal jump over the slow_animal".to_string(),
            "the fox jump over the dog".to_string(),
        ]
    );
    // aliases não são tokens do vocabulário: reaplicar não muda nada
    assert_eq!(token_to_alias(&replaced, &animals()).unwrap(), replaced);
}

#[test]
fn test_iob_scenario() {
    let rows = iob_labels(&documents(), &animals(), None, &TaggingConfig::default()).unwrap();
    let doc0: Vec<(String, String)> = rows
        .iter()
        .filter(|r| r.doc_id == 0)
        .map(|r| (r.token.clone(), r.ne.label()))
        .collect();
    let expected: Vec<(String, String)> = [
        ("the", "O"),
        ("quick", "B-I"),
        ("brown", "I-I"),
        ("fox", "I-I"),
        ("jumped", "B-V"),
        ("over", "O"),
        ("the", "O"),
        ("lazy", "B-I"),
        ("dog", "I-I"),
    ]
    .iter()
    .map(|(t, l)| (t.to_string(), l.to_string()))
    .collect();
    assert_eq!(doc0, expected);
    assert!(rows.iter().skip(doc0.len()).all(|r| r.doc_id == 1));
}

#[test]
fn test_vocabulary_round_trip_keeps_manual_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.csv");

    let text = vec![
        "hyd leak at pump".to_string(),
        "replaced hyd hose".to_string(),
        "pump noisy".to_string(),
    ];
    let mut extractor = VocabularyExtractor::default();
    extractor.fit(&text).unwrap();

    let mut vocab = VocabularyTable::build(&extractor, None).unwrap();
    vocab.set_classification("hyd", EntityType::Item, "hydraulic");
    vocab.get_mut("hyd").unwrap().notes = "abreviação".to_string();
    vocab.write_csv(&path).unwrap();

    let saved = VocabularyTable::read_csv(&path).unwrap();
    let merged = VocabularyTable::build(&extractor, Some(&saved)).unwrap();

    let hyd = merged.get("hyd").unwrap();
    assert_eq!(hyd.entity_type, EntityType::Item);
    assert_eq!(hyd.alias, "hydraulic");
    assert_eq!(hyd.notes, "abreviação");
    for (token, entry) in merged.iter().filter(|(t, _)| *t != "hyd") {
        assert!(entry.entity_type.is_unclassified(), "{token} mudou");
        assert!(entry.alias.is_empty());
    }
}

#[test]
fn test_zero_hit_document_row_is_zero() {
    let mut extractor = VocabularyExtractor::new(ExtractorOptions {
        stop_words: StopWords::None,
        ..Default::default()
    });
    extractor.fit(&["pump leak".to_string()]).unwrap();
    let vocab = table(&[("pump", "I", "pump"), ("leak", "P", "leak")]);
    let text = vec!["pump leak".to_string(), "no match here".to_string()];
    let tags = tag_documents(&mut extractor, &text, Some(&vocab), &TagOptions::default()).unwrap();

    assert!((0..tags.columns.len()).all(|c| tags.data.get(1, c) == 0.0));
    let stats = completeness(&tags, &TaggingConfig::default());
    assert_eq!(stats.per_document[1], None);
    assert!(stats
        .per_document
        .iter()
        .flatten()
        .all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_propose_on_settled_table_is_noop() {
    let composite = table(&[
        ("fast_animal jump", "I", "fast_jump"),
        ("fox jump", "P I", "fox_jump"),
    ]);
    let rules = TaggingConfig::default().entity_rules;
    let once = propose(&animals(), &composite, &rules).unwrap();
    let twice = propose(&animals(), &once, &rules).unwrap();
    assert_eq!(once, composite);
    assert_eq!(twice, composite);
}

#[test]
fn test_normalize_then_extract() {
    let csv = "id,problem,action\n1,HYD. leak @ pump,repl. seal\n2,Pump noisy!,\n";
    let dataset = Dataset::from_csv_reader(csv.as_bytes()).unwrap();
    let text = TextNormalizer::new(ColumnSelector::ByName(vec![
        "problem".into(),
        "action".into(),
    ]))
    .transform(&dataset)
    .unwrap();

    let mut extractor = VocabularyExtractor::default();
    extractor.fit(&text.cleaned).unwrap();
    let tokens = extractor.ranked_tokens().unwrap();
    assert_eq!(tokens.len(), 6);
    assert!(tokens.contains(&"repl".to_string()));
    assert!(tokens.contains(&"pump".to_string()));
}

mod common;

use common::{BrokenModel, CountingModel, FlakyTokenizer, WordTokenizer};
use predict_core::model::Tokenizer;
use predict_core::core::rules::LanguageRuleSet;
use predict_core::{CustomDictionary, EngineConfig, Error, PredictionEngine, SuggestionSource};
use std::sync::atomic::Ordering;

fn texts(suggestions: &[predict_core::Suggestion]) -> Vec<&str> {
    suggestions.iter().map(|s| s.text.as_str()).collect()
}

#[test]
fn dictionary_expansion_leads_and_is_not_repeated() {
    let tok = WordTokenizer::new(&["thank you", "you", "the", "to"]);
    let model = CountingModel::scoring(&tok, &[("thank you", 9.0), ("the", 5.0), ("you", 4.0)]);
    let dict = CustomDictionary::new();
    dict.add("ty", "thank you", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();

    let out = engine.get_suggestions("ty", &["en"], "", 3).unwrap();
    assert_eq!(texts(&out), vec!["thank you", "the", "you"]);
    assert_eq!(out[0].source, SuggestionSource::Dictionary);
    assert!(out[1..].iter().all(|s| s.source == SuggestionSource::Model));
    assert_eq!(out.iter().filter(|s| s.text == "thank you").count(), 1);
    assert_eq!(model.calls(), 1);
}

#[test]
fn completed_keys_still_rank_first() {
    let tok = WordTokenizer::new(&["you", "the"]);
    let model = CountingModel::scoring(&tok, &[("you", 3.0), ("the", 2.0)]);
    let dict = CustomDictionary::new();
    dict.add("ty", "thank you", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();

    for top_n in 1..4 {
        let out = engine.get_suggestions("tyx", &["en"], "", top_n).unwrap();
        assert_eq!(out[0].text, "thank you", "top_n = {top_n}");
        assert_eq!(out[0].source, SuggestionSource::Dictionary);
    }
}

#[test]
fn mashing_never_reaches_the_model() {
    let tok = WordTokenizer::new(&["the"]);
    let model = CountingModel::scoring(&tok, &[("the", 1.0)]);
    let dict = CustomDictionary::new();
    dict.add("xd", "laughing", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();
    let encodes = tok.encode_count();

    for input in ["xdxd123", "asdfghjkl", "zzzzzzzz", "hahaha"] {
        assert!(engine.get_suggestions(input, &["en"], "", 5).unwrap().is_empty(), "{input}");
    }
    assert_eq!(model.calls(), 0);
    assert_eq!(tok.encode_count(), encodes);
}

#[test]
fn japanese_rules_lift_polite_forms() {
    let tok = WordTokenizer::new(&["the", "です", "ます", "だ", "hello"]);
    let model = CountingModel::scoring(
        &tok,
        &[("the", 1.0), ("です", 0.8), ("ます", 0.7), ("だ", 0.9), ("hello", 0.6)],
    );
    let mut config = EngineConfig::default();
    config.languages.insert("plain".into(), LanguageRuleSet::neutral("plain"));
    let engine = PredictionEngine::new(&config, &tok, &model, CustomDictionary::new()).unwrap();

    let ja = engine.get_suggestions("ね", &["ja"], "", 5).unwrap();
    let plain = engine.get_suggestions("ね", &["plain"], "", 5).unwrap();
    assert_eq!(texts(&plain), vec!["the", "だ", "です", "ます", "hello"]);
    assert_eq!(texts(&ja), vec!["です", "ます", "the", "hello", "だ"]);

    let rank = |list: &[predict_core::Suggestion], word: &str| list.iter().position(|s| s.text == word);
    for word in ["です", "ます"] {
        assert!(rank(&ja, word) < rank(&plain, word), "{word}");
    }
}

#[test]
fn zero_top_n_touches_no_collaborator() {
    let tok = WordTokenizer::new(&["the"]);
    let model = CountingModel::scoring(&tok, &[("the", 1.0)]);
    let dict = CustomDictionary::new();
    dict.add("th", "thanks", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();
    let encodes = tok.encode_count();

    assert!(engine.get_suggestions("th", &["en"], "hi", 0).unwrap().is_empty());
    assert_eq!(model.calls(), 0);
    assert_eq!(tok.encode_count(), encodes);
}

#[test]
fn language_set_must_be_known_and_non_empty() {
    let tok = WordTokenizer::new(&["the"]);
    let model = CountingModel::scoring(&tok, &[("the", 1.0)]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();

    assert!(matches!(engine.get_suggestions("th", &[], "", 3), Err(Error::UnknownLanguage(_))));
    assert!(matches!(
        engine.get_suggestions("th", &["en", "fr"], "", 3),
        Err(Error::UnknownLanguage(l)) if l == "fr"
    ));
    assert_eq!(model.calls(), 0);
}

#[test]
fn empty_input_yields_nothing() {
    let tok = WordTokenizer::new(&["the"]);
    let model = CountingModel::scoring(&tok, &[("the", 1.0)]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();
    assert!(engine.get_suggestions("", &["en"], "some context", 3).unwrap().is_empty());
    assert!(engine.get_suggestions("   ", &["en"], "", 3).unwrap().is_empty());
    assert_eq!(model.calls(), 0);
}

#[test]
fn model_input_is_left_padded_window() {
    let tok = WordTokenizer::new(&["going", "to"]);
    let model = CountingModel::scoring(&tok, &[("to", 1.0)]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();
    engine.get_suggestions("to", &["en"], "going ", 1).unwrap();

    let input = model.last_input.lock().clone();
    assert_eq!(input.len(), 50);
    assert!(input[..48].iter().all(|&id| id == 0));
    assert_eq!(&input[48..], &[tok.id("going"), tok.id("to")]);
}

#[test]
fn model_failures_propagate_unless_dictionary_suffices() {
    let tok = WordTokenizer::new(&["the"]);
    let model = BrokenModel;
    let dict = CustomDictionary::new();
    dict.add("th", "thanks", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();

    assert!(matches!(engine.get_suggestions("th", &["en"], "", 2), Err(Error::ModelInvocation(_))));
    let out = engine.get_suggestions("th", &["en"], "", 1).unwrap();
    assert_eq!(texts(&out), vec!["thanks"]);
}

#[test]
fn selections_break_score_ties() {
    let tok = WordTokenizer::new(&["you", "the"]);
    let model = CountingModel::scoring(&tok, &[("you", 2.0), ("the", 2.0)]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();

    let before = engine.get_suggestions("x", &["en"], "I see", 2).unwrap();
    assert_eq!(texts(&before), vec!["you", "the"]);

    engine.record_selection("we see", "the").unwrap();
    let after = engine.get_suggestions("x", &["en"], "I see", 2).unwrap();
    assert_eq!(texts(&after), vec!["the", "you"]);

    // Another bucket is unaffected.
    let other = engine.get_suggestions("x", &["en"], "hello", 2).unwrap();
    assert_eq!(texts(&other), vec!["you", "the"]);
    assert!(matches!(engine.record_selection("", " "), Err(Error::InvalidArgument(_))));
}

#[test]
fn selections_recorded_while_predicting() {
    let tok = WordTokenizer::new(&["you", "the"]);
    let model = CountingModel::scoring(&tok, &[("you", 2.0), ("the", 2.0)]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| {
                for _ in 0..200 {
                    engine.record_selection("see", "the").unwrap();
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..200 {
                let out = engine.get_suggestions("x", &["en"], "see", 2).unwrap();
                assert_eq!(out.len(), 2);
            }
        });
    });
    assert_eq!(engine.learner().frequency("see", "the"), 400);
}

#[test]
fn keys_sharing_an_expansion_show_it_once() {
    let tok = WordTokenizer::new(&["thank you", "the", "you"]);
    let model = CountingModel::scoring(&tok, &[("thank you", 9.0), ("the", 5.0), ("you", 4.0)]);
    let dict = CustomDictionary::new();
    dict.add("ty", "thank you", 1).unwrap();
    dict.add("tyvm", "thank you", 1).unwrap();
    dict.add("tyl", "thank you lots", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();

    let out = engine.get_suggestions("ty", &["en"], "", 3).unwrap();
    assert_eq!(texts(&out), vec!["thank you", "thank you lots", "the"]);
    assert_eq!(out[1].source, SuggestionSource::Dictionary);

    let out = engine.get_suggestions("ty", &["en"], "", 2).unwrap();
    assert_eq!(texts(&out), vec!["thank you", "thank you lots"]);
    assert_eq!(model.calls(), 1);
}

#[test]
fn tokenizer_failures_propagate() {
    let tok = FlakyTokenizer::new(&["the", "you"]);
    let model = CountingModel::scoring(tok.inner(), &[("the", 2.0), ("you", 1.0)]);
    let dict = CustomDictionary::new();
    dict.add("th", "thanks", 1).unwrap();
    let engine = PredictionEngine::new(&EngineConfig::default(), &tok, &model, dict).unwrap();
    engine.record_selection("see", "you").unwrap();
    let entries = engine.dictionary().entries();

    tok.fail_encode.store(true, Ordering::SeqCst);
    assert!(matches!(engine.get_suggestions("th", &["en"], "", 3), Err(Error::Tokenizer(_))));
    assert_eq!(model.calls(), 0);

    tok.fail_encode.store(false, Ordering::SeqCst);
    tok.fail_decode.store(true, Ordering::SeqCst);
    assert!(matches!(engine.get_suggestions("th", &["en"], "see", 3), Err(Error::Tokenizer(_))));
    assert_eq!(model.calls(), 1);

    assert_eq!(engine.dictionary().entries(), entries);
    assert_eq!(engine.learner().total_selections(), 1);

    tok.fail_decode.store(false, Ordering::SeqCst);
    let out = engine.get_suggestions("th", &["en"], "", 3).unwrap();
    assert_eq!(texts(&out), vec!["thanks", "the", "you"]);
}

fn flat_vocab(size: usize) -> Vec<String> {
    (0..size).map(|i| format!("w{:03}", i)).collect()
}

#[test]
fn flat_scores_decode_only_what_is_shown() {
    let words = flat_vocab(300);
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    let tok = WordTokenizer::new(&refs);
    let model = CountingModel::new(vec![1.0; tok.vocab_size()]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();
    let decodes = tok.decode_count();

    let out = engine.get_suggestions("x", &["en"], "", 3).unwrap();
    assert_eq!(texts(&out), vec!["w000", "w001", "w002"]);
    assert!(tok.decode_count() - decodes <= 6, "decoded {}", tok.decode_count() - decodes);
}

#[test]
fn recorded_selection_wins_anywhere_in_a_tie() {
    let words = flat_vocab(300);
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    let tok = WordTokenizer::new(&refs);
    let model = CountingModel::new(vec![1.0; tok.vocab_size()]);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();

    engine.record_selection("", "w250").unwrap();
    let out = engine.get_suggestions("x", &["en"], "", 3).unwrap();
    assert_eq!(texts(&out), vec!["w250", "w000", "w001"]);
}

#[test]
fn repeated_texts_widen_the_pool() {
    // Several ids decode to the same text; only the first of them counts.
    let tok = WordTokenizer::new(&["a", "a", "a", "a", "a", "a", "b"]);
    let mut logits = vec![9.0; tok.vocab_size()];
    logits[tok.vocab_size() - 1] = 1.0;
    let model = CountingModel::new(logits);
    let engine =
        PredictionEngine::new(&EngineConfig::default(), &tok, &model, CustomDictionary::new()).unwrap();

    let out = engine.get_suggestions("x", &["en"], "", 2).unwrap();
    assert_eq!(texts(&out), vec!["a", "b"]);
    assert_eq!(out[1].score, 1.0);
}

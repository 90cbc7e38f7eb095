use predict_core::core::dictionary::default_entries;
use predict_core::persistence::{load_dictionary, save_dictionary};
use predict_core::{CustomDictionary, DictionaryEntry};

fn table(tag: &str, size: usize) -> Vec<DictionaryEntry> {
    (0..size).map(|i| DictionaryEntry::new(format!("k{:03}", i), format!("{}-{}", tag, i), 1)).collect()
}

#[test]
fn added_entry_is_visible_immediately() {
    let dict = CustomDictionary::with_entries(default_entries()).unwrap();
    dict.remove("brb");
    assert!(dict.prefix_search("br").is_empty());

    dict.add("brb", "be right back", 1).unwrap();
    assert!(dict.prefix_search("br").contains(&"be right back".to_string()));
}

#[test]
fn concurrent_readers_never_see_a_mixed_table() {
    let dict = CustomDictionary::new();
    let (old, new) = (table("old", 200), table("new", 150));
    dict.reload(old.clone()).unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for round in 0..100 {
                let next = if round % 2 == 0 { new.clone() } else { old.clone() };
                dict.reload(next).unwrap();
            }
        });
        for _ in 0..3 {
            scope.spawn(|| {
                for _ in 0..300 {
                    let found = dict.prefix_search("k");
                    let all_old = found.len() == 200 && found.iter().all(|e| e.starts_with("old-"));
                    let all_new = found.len() == 150 && found.iter().all(|e| e.starts_with("new-"));
                    assert!(all_old || all_new, "mixed table of {} entries", found.len());
                }
            });
        }
    });
}

#[test]
fn saved_table_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_dictionary.json");
    let dict = CustomDictionary::with_entries(default_entries()).unwrap();
    dict.add("gm", "good morning", 3).unwrap();
    dict.add("ty", "thank you so much", 2).unwrap();
    save_dictionary(&path, &dict.entries()).unwrap();

    let reloaded = CustomDictionary::new();
    reloaded.reload(load_dictionary(&path).unwrap()).unwrap();
    for prefix in ["t", "ty", "g", "gm", "b", "x", "a"] {
        assert_eq!(reloaded.prefix_search(prefix), dict.prefix_search(prefix), "{prefix}");
    }
    assert_eq!(reloaded.stats(), dict.stats());
}

#[test]
fn shipped_sample_table_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/custom_dictionary.json");
    let dict = CustomDictionary::new();
    dict.reload_from_file(&path).unwrap();
    assert_eq!(dict.get("ty"), Some("thank you".to_string()));
    assert_eq!(dict.prefix_search("g"), vec!["good morning", "good night"]);
}

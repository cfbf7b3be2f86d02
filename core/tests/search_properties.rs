use proptest::prelude::*;
use search_core::{InvertedIndex, SearchServer};

const VOCAB: &[&str] = &["milk", "Milk", "WATER", "water", "tea", "TeA", "sugar"];

fn corpus() -> impl Strategy<Value = Vec<String>> {
    let doc = prop::collection::vec(prop::sample::select(VOCAB), 0..12).prop_map(|w| w.join(" "));
    prop::collection::vec(doc, 1..24)
}

fn built(docs: &[String]) -> InvertedIndex {
    let idx = InvertedIndex::new();
    idx.build(docs.to_vec()).unwrap();
    idx
}

proptest! {
    #[test]
    fn lookup_ignores_case(docs in corpus()) {
        let idx = built(&docs);
        for word in ["milk", "water", "tea", "sugar"] {
            let lower = idx.lookup(word);
            prop_assert_eq!(&idx.lookup(&word.to_uppercase()), &lower);
            prop_assert_eq!(&idx.lookup(&format!("{}{}", &word[..1].to_uppercase(), &word[1..])), &lower);
        }
    }

    #[test]
    fn entries_are_sorted_and_counted(docs in corpus()) {
        let idx = built(&docs);
        let snapshot = idx.snapshot();
        for term in snapshot.terms() {
            let entries = snapshot.entries(term);
            prop_assert!(entries.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
            for entry in entries {
                let expected = docs[entry.doc_id as usize]
                    .split_whitespace()
                    .filter(|w| w.to_lowercase() == term)
                    .count() as u32;
                prop_assert_eq!(entry.count, expected);
            }
        }
        prop_assert!(idx.lookup("coffee").is_empty());
    }

    #[test]
    fn rebuild_is_idempotent(docs in corpus()) {
        let idx = built(&docs);
        let first = idx.snapshot();
        idx.build(docs.clone()).unwrap();
        let second = idx.snapshot();
        prop_assert_eq!(first.term_count(), second.term_count());
        for term in first.terms() {
            prop_assert_eq!(first.entries(term), second.entries(term));
        }
    }

    #[test]
    fn ranks_are_normalized_and_ordered(docs in corpus(), query in prop::collection::vec(prop::sample::select(VOCAB), 1..4)) {
        let idx = built(&docs);
        let ranked = SearchServer::new(&idx).search_query(&query.join(" "));
        if let Some(top) = ranked.first() {
            prop_assert_eq!(top.rank, 1.0);
        }
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].rank > pair[1].rank
                || (pair[0].rank == pair[1].rank && pair[0].doc_id < pair[1].doc_id));
        }
        for hit in &ranked {
            prop_assert!(hit.rank > 0.0 && hit.rank <= 1.0);
            let doc = docs[hit.doc_id as usize].to_lowercase();
            let words: Vec<&str> = doc.split_whitespace().collect();
            for term in &query {
                prop_assert!(words.contains(&term.to_lowercase().as_str()));
            }
        }
    }
}

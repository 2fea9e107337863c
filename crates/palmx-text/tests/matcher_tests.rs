use palmx_text::LexicalMatcher;

#[test]
fn extract_orders_by_score_then_key() {
    let keys = ["hacienda_west", "hacienda_bay", "marassi", "hacienda_heneish"];
    let m = LexicalMatcher::new();
    let hits = m.extract("hacienda bay villas", &keys, 10, 60.0);
    assert!(!hits.is_empty());
    assert_eq!(hits[0].key, "hacienda_bay");
    for pair in hits.windows(2) {
        assert!(pair[0].score > pair[1].score || (pair[0].score == pair[1].score && pair[0].key < pair[1].key));
    }
    assert!(hits.iter().all(|h| h.score >= 60.0));
    assert!(hits.iter().all(|h| h.key != "marassi"));
}

#[test]
fn extract_respects_limit_and_cutoff() {
    let keys = ["p1", "p2", "p3"];
    let m = LexicalMatcher::new();
    assert!(m.extract("p2", &keys, 0, 0.0).is_empty());
    let hits = m.extract("p2", &keys, 1, 0.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, "p2");
    assert_eq!(hits[0].index, 1);
    assert!((hits[0].score - 100.0).abs() < 1e-9);
    assert!(m.extract("zzzz", &keys, 3, 60.0).is_empty());
}

#[test]
fn ties_break_by_key_ascending() {
    let keys = ["b", "a", "c"];
    let hits = LexicalMatcher::new().extract("q", &keys, 3, 0.0);
    let order: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"], "all score zero, so key order decides");
}

#[test]
fn extract_is_deterministic() {
    let keys: Vec<String> = (0..40).map(|i| format!("project_{}", i % 7)).collect();
    let m = LexicalMatcher::new();
    let a = m.extract("project 3", &keys, 10, 50.0);
    let b = m.extract("project 3", &keys, 10, 50.0);
    assert_eq!(a, b);
}

#[test]
fn office_query_matches_only_named_key() {
    let keys = ["p1", "p2"];
    let hits = LexicalMatcher::new().extract("p2 office", &keys, 5, 60.0);
    let order: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
    assert_eq!(order, vec!["p2"]);
}

#[test]
fn verbatim_matching_is_case_sensitive() {
    let m = LexicalMatcher::verbatim();
    assert!(m.score("PALM", "palm") < LexicalMatcher::new().score("PALM", "palm"));
}

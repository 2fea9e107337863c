use crate::fuzz::{default_process, wratio};

/// One scored key. `index` points into the `keys` slice passed to `extract`.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalMatch {
    pub index: usize,
    pub key: String,
    pub score: f64,
}

/// Weighted-ratio matcher over a set of candidate keys.
#[derive(Debug, Clone, Copy)]
pub struct LexicalMatcher {
    preprocess: bool,
}

impl Default for LexicalMatcher {
    fn default() -> Self { Self { preprocess: true } }
}

impl LexicalMatcher {
    pub fn new() -> Self { Self::default() }

    /// Compare strings verbatim: case and punctuation count.
    pub fn verbatim() -> Self { Self { preprocess: false } }

    fn prepare(&self, s: &str) -> String { if self.preprocess { default_process(s) } else { s.to_string() } }

    pub fn score(&self, query: &str, key: &str) -> f64 { wratio(&self.prepare(query), &self.prepare(key)) }

    /// Up to `limit` keys scoring at least `score_cutoff`, best first.
    /// Ties are broken by key, then by position, so output is deterministic.
    pub fn extract<K: AsRef<str>>(&self, query: &str, keys: &[K], limit: usize, score_cutoff: f64) -> Vec<LexicalMatch> {
        if limit == 0 {
            return Vec::new();
        }
        let query = self.prepare(query);
        let mut matches: Vec<LexicalMatch> = keys
            .iter()
            .enumerate()
            .filter_map(|(index, key)| {
                let key = key.as_ref();
                let score = wratio(&query, &self.prepare(key));
                (score >= score_cutoff).then(|| LexicalMatch { index, key: key.to_string(), score })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)).then_with(|| a.index.cmp(&b.index))
        });
        matches.truncate(limit);
        tracing::trace!(candidates = keys.len(), kept = matches.len(), "lexical extract");
        matches
    }
}

//! Token-aware string similarity scorers, all on a `0..=100` scale.
//!
//! `ratio` is rapidfuzz's normalized Indel similarity, rescaled to percent.
//! `wratio` combines plain, partial and token-based scores so that reordered
//! words and partial mentions of a name score high.
//!
//! Scorers compare their inputs verbatim; run [`default_process`] first for
//! case- and punctuation-insensitive matching.

use std::collections::BTreeSet;

use rapidfuzz::fuzz;

const UNBASE_SCALE: f64 = 0.95;

/// Lowercase, turn every non-alphanumeric character into a space, trim.
pub fn default_process(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalized Indel similarity (`2 * LCS / (len1 + len2)`) over chars.
/// Two empty inputs are identical.
fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    fuzz::ratio(a.iter().copied(), b.iter().copied()) * 100.0
}

pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    fuzz::ratio(a.chars(), b.chars()) * 100.0
}

/// Best `ratio` between the shorter string and any equally long window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() == b.len() {
        return ratio_chars(&a, &b);
    }
    let (short, long) = if a.len() < b.len() { (&a, &b) } else { (&b, &a) };
    if short.is_empty() {
        return 0.0;
    }
    long.windows(short.len())
        .filter(|window| window.iter().any(|c| short.contains(c)))
        .map(|window| ratio_chars(short, window))
        .fold(0.0, f64::max)
}

fn tokens(s: &str) -> Vec<&str> {
    let mut t: Vec<&str> = s.split_whitespace().collect();
    t.sort_unstable();
    t
}

fn token_set(s: &str) -> BTreeSet<&str> { s.split_whitespace().collect() }

fn join(set: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    set.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(" ")
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 { ratio(&tokens(a).join(" "), &tokens(b).join(" ")) }

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let (sa, sb) = (token_set(a), token_set(b));
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let sect: Vec<&str> = sa.intersection(&sb).copied().collect();
    let diff_ab: Vec<&str> = sa.difference(&sb).copied().collect();
    let diff_ba: Vec<&str> = sb.difference(&sa).copied().collect();
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }
    let sect = join(&sect);
    let (ab, ba) = (join(&diff_ab), join(&diff_ba));
    if sect.is_empty() {
        return ratio(&ab, &ba);
    }
    let sect_ab = format!("{} {}", sect, ab);
    let sect_ba = format!("{} {}", sect, ba);
    ratio(&sect, &sect_ab).max(ratio(&sect, &sect_ba)).max(ratio(&sect_ab, &sect_ba))
}

pub fn token_ratio(a: &str, b: &str) -> f64 { token_sort_ratio(a, b).max(token_set_ratio(a, b)) }

pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let (sa, sb) = (token_set(a), token_set(b));
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    if sa.intersection(&sb).next().is_some() {
        return 100.0;
    }
    let sorted = partial_ratio(&tokens(a).join(" "), &tokens(b).join(" "));
    let diff_ab = join(sa.difference(&sb));
    let diff_ba = join(sb.difference(&sa));
    sorted.max(partial_ratio(&diff_ab, &diff_ba))
}

/// Weighted ratio: picks the strongest of the plain, partial and token-based
/// scores, scaling the partial ones down as the length ratio grows.
pub fn wratio(a: &str, b: &str) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la == 0 || lb == 0 {
        return 0.0;
    }
    let len_ratio = la.max(lb) as f64 / la.min(lb) as f64;
    let end_ratio = ratio(a, b);
    if len_ratio < 1.5 {
        return end_ratio.max(token_ratio(a, b) * UNBASE_SCALE);
    }
    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let end_ratio = end_ratio.max(partial_ratio(a, b) * partial_scale);
    end_ratio.max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool { (a - b).abs() < 1e-6 }

    #[test]
    fn ratio_is_indel_similarity() {
        assert!(approx(ratio("abcd", "abcd"), 100.0));
        assert!(approx(ratio("p1", "p2"), 50.0));
        assert!(approx(ratio("", ""), 100.0));
        assert!(approx(ratio("abc", ""), 0.0));
    }

    #[test]
    fn partial_ratio_finds_embedded_needle() {
        assert!(approx(partial_ratio("bay", "hacienda bay"), 100.0));
        assert!(approx(partial_ratio("p1", "p2 office"), 50.0));
        assert!(approx(partial_ratio("", "x"), 0.0));
    }

    #[test]
    fn token_scores_ignore_order() {
        assert!(approx(token_sort_ratio("bay hacienda", "hacienda bay"), 100.0));
        assert!(approx(token_set_ratio("hacienda bay villas", "bay hacienda"), 100.0));
        assert!(approx(token_set_ratio("p1", "p2"), 50.0));
    }

    #[test]
    fn default_process_normalises() {
        assert_eq!(default_process("  Hacienda_Bay! "), "hacienda bay");
        assert_eq!(default_process("6th-of-October"), "6th of october");
    }

    #[test]
    fn wratio_scores_partial_mentions() {
        assert!(approx(wratio("p2 office", "p2"), 90.0));
        assert!(wratio("p2 office", "p1") < 60.0);
        assert!(approx(wratio("hacienda bay villas", "hacienda bay"), 90.0));
        assert!(approx(wratio("bay hacienda", "hacienda bay"), 95.0));
        assert!(approx(wratio("x", ""), 0.0));
    }

    #[test]
    fn wratio_beats_plain_ratio_on_reordering() {
        let (a, b) = ("villas hacienda bay", "hacienda bay");
        assert!(wratio(a, b) > ratio(a, b));
    }
}

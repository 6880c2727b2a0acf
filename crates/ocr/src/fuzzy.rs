/// Length of the longest common subsequence, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Keep the shorter slice in the inner loop.
    let (a, b) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized indel similarity in [0, 1]: `2·LCS / (|a| + |b|)`.
pub fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Substring-tolerant similarity in [0, 1].
///
/// The shorter string is aligned against every window of the longer one,
/// including windows that hang off either end, and the best [`ratio_chars`]
/// wins. An exact substring scores 1.0. Either side empty scores 0.0.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (needle, hay) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    let (m, n) = (needle.len(), hay.len());
    if m == 0 {
        return 0.0;
    }

    let mut best = 0.0f64;
    let mut consider = |window: &[char]| {
        let score = ratio_chars(needle, window);
        if score > best {
            best = score;
        }
        best >= 1.0
    };

    // Full-width windows first; a perfect hit short-circuits.
    for start in 0..=(n - m) {
        if consider(&hay[start..start + m]) {
            return 1.0;
        }
    }
    // Partial overlaps at the edges.
    for k in 1..m.min(n + 1) {
        if consider(&hay[..k]) || consider(&hay[n - k..]) {
            return 1.0;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn lcs_basic() {
        assert_eq!(lcs_len(&chars("abcde"), &chars("ace")), 3);
        assert_eq!(lcs_len(&chars(""), &chars("abc")), 0);
        assert_eq!(lcs_len(&chars("abc"), &chars("xyz")), 0);
    }

    #[test]
    fn ratio_identical_is_one() {
        assert_eq!(ratio_chars(&chars("total"), &chars("total")), 1.0);
    }

    #[test]
    fn exact_substring_scores_one() {
        assert_eq!(partial_ratio("total", "invoice total: 1,250.00"), 1.0);
    }

    #[test]
    fn argument_order_does_not_matter() {
        assert_eq!(
            partial_ratio("invoice total", "total"),
            partial_ratio("total", "invoice total")
        );
    }

    #[test]
    fn disjoint_alphabets_score_zero() {
        assert_eq!(partial_ratio("vat", "12345"), 0.0);
    }

    #[test]
    fn near_miss_scores_between() {
        let s = partial_ratio("tax", "text");
        assert!(s > 0.5 && s < 1.0, "score was {s}");
    }

    #[test]
    fn arabic_labels_match_by_character() {
        assert_eq!(partial_ratio("المجموع", "المجموع ١٢٠"), 1.0);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(partial_ratio("total", ""), 0.0);
        assert_eq!(partial_ratio("", "total"), 0.0);
    }

    #[test]
    fn edge_windows_are_considered() {
        // "otal" only appears clipped at the start of the haystack.
        let s = partial_ratio("total", "otal due");
        assert!(s >= 0.8, "score was {s}");
    }
}

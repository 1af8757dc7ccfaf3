//! Sequence similarity ratio over characters.
//!
//! Matches the longest-matching-block ratio `2 * M / (len(a) + len(b))`,
//! where `M` is the total size of the matching blocks found by recursively
//! taking the longest common run and recursing on both sides. No junk
//! heuristic is applied.

use std::collections::HashMap;

/// Character-level matcher between a candidate `a` and an anchor `b`.
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    /// Positions of each character in `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }
        Self { a, b, b2j }
    }

    fn total_len(&self) -> usize {
        self.a.len() + self.b.len()
    }

    fn ratio_of(&self, matches: usize) -> f64 {
        let total = self.total_len();
        if total == 0 {
            1.0
        } else {
            2.0 * matches as f64 / total as f64
        }
    }

    /// Upper bound from lengths alone.
    pub fn real_quick_ratio(&self) -> f64 {
        self.ratio_of(self.a.len().min(self.b.len()))
    }

    /// Upper bound from character multiset intersection.
    pub fn quick_ratio(&self) -> f64 {
        let mut avail: HashMap<char, isize> = HashMap::new();
        for c in &self.b {
            *avail.entry(*c).or_insert(0) += 1;
        }
        let mut matches = 0;
        for c in &self.a {
            let n = avail.entry(*c).or_insert(0);
            if *n > 0 {
                matches += 1;
            }
            *n -= 1;
        }
        self.ratio_of(matches)
    }

    /// Exact ratio from matching blocks.
    pub fn ratio(&self) -> f64 {
        let matches: usize = self.matching_blocks().iter().map(|&(_, _, k)| k).sum();
        self.ratio_of(matches)
    }

    /// Longest matching run in `a[alo..ahi]` × `b[blo..bhi]`.
    ///
    /// Ties resolve to the earliest start in `a`, then the earliest in `b`.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        // Run lengths indexed by j + 1, so index j holds the run ending at j - 1.
        let mut prev = vec![0usize; self.b.len() + 1];
        let mut cur = vec![0usize; self.b.len() + 1];
        let mut prev_touched: Vec<usize> = Vec::new();
        let mut cur_touched: Vec<usize> = Vec::new();

        for i in alo..ahi {
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = prev[j] + 1;
                    cur[j + 1] = k;
                    cur_touched.push(j + 1);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            for idx in prev_touched.drain(..) {
                prev[idx] = 0;
            }
            std::mem::swap(&mut prev, &mut cur);
            std::mem::swap(&mut prev_touched, &mut cur_touched);
        }

        (besti, bestj, bestsize)
    }

    /// Matching blocks `(i, j, size)`, sorted, without the terminating sentinel.
    pub fn matching_blocks(&self) -> Vec<(usize, usize, usize)> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            blocks.push((i, j, k));
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort_unstable();
        blocks
    }
}

/// Similarity ratio of two strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}

/// Whether `candidate` is at least `threshold` similar to `anchor`.
///
/// Empty strings are never similar to anything. The two quick ratios are
/// upper bounds of the full ratio, so they only short-circuit rejections.
pub fn is_similar(candidate: &str, anchor: &str, threshold: f64) -> bool {
    if candidate.is_empty() || anchor.is_empty() {
        return false;
    }
    let matcher = SequenceMatcher::new(candidate, anchor);
    if matcher.real_quick_ratio() < threshold {
        return false;
    }
    if matcher.quick_ratio() < threshold {
        return false;
    }
    matcher.ratio() >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical() {
        assert!(approx(ratio("buy now", "buy now"), 1.0));
    }

    #[test]
    fn test_known_ratios() {
        // 2 * 3 / 8
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        // "ab" + "d": 2 * 3 / 7... blocks "ab" then "d"
        assert!(approx(ratio("abxd", "abd"), 6.0 / 7.0));
        assert!(approx(ratio("abc", "xyz"), 0.0));
        assert!(approx(ratio("", ""), 1.0));
    }

    #[test]
    fn test_matching_blocks_order() {
        let m = SequenceMatcher::new("abxcd", "abcd");
        assert_eq!(m.matching_blocks(), vec![(0, 0, 2), (3, 2, 2)]);
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        let m = SequenceMatcher::new("ab ab", "ab");
        assert_eq!(m.find_longest_match(0, 5, 0, 2), (0, 0, 2));
    }

    #[test]
    fn test_quick_ratios_are_upper_bounds() {
        let pairs = [
            ("promo hoje no app", "promo amanha no site"),
            ("ola maria seu bonus", "ola joao seu bonus chegou"),
            ("aaaa", "a"),
            ("abc", "cba"),
        ];
        for (a, b) in pairs {
            let m = SequenceMatcher::new(a, b);
            let r = m.ratio();
            assert!(m.quick_ratio() >= r, "quick_ratio below ratio for {:?}", (a, b));
            assert!(m.real_quick_ratio() >= m.quick_ratio());
        }
    }

    #[test]
    fn test_is_similar_matches_full_ratio() {
        let pairs = [
            ("seu codigo e 1234", "seu codigo e 9876"),
            ("abc", "cba"),
            ("hello world", "hello"),
        ];
        for (a, b) in pairs {
            for t in [0.3, 0.5, 0.7, 0.9, 1.0] {
                assert_eq!(is_similar(a, b, t), ratio(a, b) >= t, "{:?} at {}", (a, b), t);
            }
        }
    }

    #[test]
    fn test_empty_never_similar() {
        assert!(!is_similar("", "", 0.1));
        assert!(!is_similar("", "x", 0.1));
        assert!(!is_similar("x", "", 0.1));
    }

    #[test]
    fn test_unicode_chars_not_bytes() {
        // Each accented character counts once.
        assert!(approx(ratio("ação", "acao"), 0.5));
    }
}

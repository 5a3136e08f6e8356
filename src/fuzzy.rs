//! Edit-distance helpers for name lookup.
//!
//! Distances are computed over `char`s, not bytes, so accented names cost one
//! edit per letter.

/// Levenshtein distance: insertions, deletions and substitutions cost 1.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein(&a, &b)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Minimum edit distance between the shorter string and every equal-length
/// window of the longer one, ignoring case.
pub fn min_substring_distance(a: &str, b: &str) -> usize {
    min_substring_distance_with_case(a, b, true)
}

pub fn min_substring_distance_with_case(a: &str, b: &str, ignore_case: bool) -> usize {
    let fold = |s: &str| -> Vec<char> {
        if ignore_case {
            s.chars().flat_map(char::to_lowercase).collect()
        } else {
            s.chars().collect()
        }
    };
    let a = fold(a);
    let b = fold(b);
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    long.windows(short.len())
        .map(|window| levenshtein(&short, window))
        .min()
        .unwrap_or(0)
}

#![warn(clippy::all, clippy::pedantic)]

//! String similarity used to decide whether two history entries are
//! "the same command, give or take a typo".

/// Similarity ratio between two strings: `2 * LCS(a, b) / (len(a) + len(b))`,
/// computed over chars. Symmetric, in the range [0, 1]. A string compared
/// with itself scores 1.0, as do two empty strings.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();

    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    let matched = lcs_length(&a_chars, &b_chars);
    2.0 * to_f64(matched) / to_f64(total)
}

/// Checks whether `ratio(a, b) >= threshold` without always paying for the
/// quadratic matcher: a length-based upper bound rejects early, and the
/// normalized Levenshtein score accepts early.
#[must_use]
pub fn meets_threshold(a: &str, b: &str, threshold: f64) -> bool {
    if threshold <= 0.0 {
        return true;
    }
    if a == b {
        return threshold <= 1.0;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let total = a_len + b_len;
    if a_len == 0 || b_len == 0 {
        return false;
    }

    // Even a full match of the shorter string cannot beat this bound.
    let upper = 2.0 * to_f64(a_len.min(b_len)) / to_f64(total);
    if upper < threshold {
        return false;
    }

    // Levenshtein needs at least max(len) - LCS edits, so the normalized
    // score can never exceed the subsequence ratio.
    if strsim::normalized_levenshtein(a, b) >= threshold {
        return true;
    }

    ratio(a, b) >= threshold
}

/// Length of the longest common subsequence, with two rolling rows.
fn lcs_length(a: &[char], b: &[char]) -> usize {
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
        curr[0] = 0;
    }

    prev[b.len()]
}

/// Convert through u32 to avoid precision loss in the f64 conversion.
fn to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

use std::collections::HashMap;

/// Comparison form of a display name: lowercased, everything outside
/// `[a-z0-9]` removed. "McDonald's #42" and "mcdonalds 42" collapse to
/// the same key.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Bigram Dice similarity in [0, 1].
///
/// Equal strings score 1.0 before any length check, so two empty strings
/// are equal rather than incomparable; unequal strings shorter than two
/// characters score 0.0 since they have no bigrams. Bigrams are counted
/// as a multiset, so a bigram occurring twice on both sides contributes
/// twice to the overlap.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut counts: HashMap<[char; 2], u32> = HashMap::new();
    for w in a.windows(2) {
        *counts.entry([w[0], w[1]]).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for w in b.windows(2) {
        if let Some(n) = counts.get_mut(&[w[0], w[1]]) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }

    2.0 * shared as f64 / (a.len() + b.len() - 2) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("McDonald's #42"), "mcdonalds42");
        assert_eq!(normalize("Jollibee - Makati Ave."), "jollibeemakatiave");
        assert_eq!(normalize("***"), "");
    }

    #[test]
    fn dice_equal_and_degenerate() {
        assert_eq!(dice_coefficient("", ""), 1.0);
        assert_eq!(dice_coefficient("a", "a"), 1.0);
        assert_eq!(dice_coefficient("", "x"), 0.0);
        assert_eq!(dice_coefficient("a", "b"), 0.0);
        assert_eq!(dice_coefficient("ab", "ab"), 1.0);
    }

    #[test]
    fn dice_known_values() {
        assert_eq!(dice_coefficient("night", "nacht"), 0.25);
        // repeated bigrams count per occurrence: "aaa" has {aa: 2},
        // "aaaa" has {aa: 3}, overlap 2, denominator 3 + 4 - 2
        assert_eq!(dice_coefficient("aaa", "aaaa"), 0.8);
    }

    #[test]
    fn dice_symmetric_and_bounded() {
        let pairs = [
            ("starbckscoffee", "starbuckscoffee"),
            ("jollibee", "jollibeemakati"),
            ("kfc", "mcdonalds"),
        ];
        for (a, b) in pairs {
            let x = dice_coefficient(a, b);
            let y = dice_coefficient(b, a);
            assert_eq!(x, y);
            assert!((0.0..=1.0).contains(&x));
        }
    }
}

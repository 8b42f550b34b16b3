use std::cmp::Ordering;

use semver::Version;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
/// A leading `v` or `=` is ignored.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "v1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version
        .trim()
        .trim_start_matches('=')
        .trim_start_matches('v');
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// A version is treated as a pre-release when it contains a `-`
pub fn is_prerelease(version: &str) -> bool {
    version.contains('-')
}

/// Major version number: the leading run of digits, or 0 when there is none
pub fn major_of(version: &str) -> u64 {
    let digits: String = version.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Strip range operators and other leading non-digit characters
///
/// `^1.2.3` -> `1.2.3`, `~>=2.0.0` -> `2.0.0`
pub fn clean_version(version: &str) -> &str {
    version.trim_start_matches(|c: char| !c.is_ascii_digit())
}

/// Compare two version strings with numeric-aware ordering
///
/// Runs of digits compare by numeric value, so `10.0.0` sorts after `9.0.0`.
/// Other runs compare case-insensitively. A string that is a prefix of the
/// other sorts first, which places `2.0.0` before `2.0.0-beta.1`.
pub fn compare_numeric(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = compare_chunk(l, r);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len())
}

/// Split into alternating digit / non-digit runs
fn chunks(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                result.push(&s[start..i]);
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }

    if start < s.len() {
        result.push(&s[start..]);
    }
    result
}

fn compare_chunk(a: &str, b: &str) -> Ordering {
    let a_digits = a.starts_with(|c: char| c.is_ascii_digit());
    let b_digits = b.starts_with(|c: char| c.is_ascii_digit());

    match (a_digits, b_digits) {
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        // punctuation < digits < letters
        (true, false) => {
            if b.starts_with(|c: char| c.is_alphabetic()) {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => compare_chunk(b, a).reverse(),
        (false, false) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

//! Segment-wise version ordering
//!
//! Versions are split into numeric and alphabetic segments. Any run of
//! characters that is not alphanumeric acts as a separator, and a change
//! between digits and letters starts a new segment (`1.0rc2` -> `1`, `0`,
//! `rc`, `2`). Segments are then compared pairwise:
//!
//! - number vs number: numeric value, with no width limit
//! - number vs tag: the number is greater
//! - tag vs tag: by tag rank (`dev` < `alpha` < `beta` < `rc` < unknown <
//!   post-release), then alphabetically
//! - missing vs number: missing is lower (`1.0` < `1.0.1`)
//! - missing vs pre-release tag: the tag is lower (`1.0a1` < `1.0`)
//! - missing vs post-release tag: the tag is greater (`1.0` < `1.0.post1`)
//!
//! A leading `v` directly followed by a digit is ignored. Input that yields
//! no segments at all sorts below any input that does, and two such inputs
//! compare as plain strings.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    /// Digits with leading zeros stripped (`"0"` for all-zero runs)
    Number(&'a str),
    /// Lowercased alphabetic run
    Tag(String),
}

/// Ordering class of an alphabetic segment.
fn tag_rank(tag: &str) -> u8 {
    match tag {
        "dev" => 0,
        "a" | "alpha" => 1,
        "b" | "beta" => 2,
        "c" | "rc" | "pre" | "preview" => 3,
        "post" | "rev" | "r" | "pl" | "patch" => 5,
        _ => 4,
    }
}

fn is_post_release(tag: &str) -> bool {
    tag_rank(tag) == 5
}

fn strip_prefix(version: &str) -> &str {
    let trimmed = version.trim();
    match trimmed.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    }
}

fn make_segment(run: &str, numeric: bool) -> Segment<'_> {
    if numeric {
        let stripped = run.trim_start_matches('0');
        Segment::Number(if stripped.is_empty() { "0" } else { stripped })
    } else {
        Segment::Tag(run.to_lowercase())
    }
}

fn segments(version: &str) -> Vec<Segment<'_>> {
    let version = strip_prefix(version);
    let mut out = Vec::new();
    let mut start: Option<(usize, bool)> = None;

    for (idx, ch) in version.char_indices() {
        let class = if ch.is_ascii_digit() {
            Some(true)
        } else if ch.is_alphabetic() {
            Some(false)
        } else {
            None
        };

        match (start, class) {
            (Some((from, numeric)), Some(is_num)) if numeric != is_num => {
                out.push(make_segment(&version[from..idx], numeric));
                start = Some((idx, is_num));
            }
            (Some(_), Some(_)) => {}
            (Some((from, numeric)), None) => {
                out.push(make_segment(&version[from..idx], numeric));
                start = None;
            }
            (None, Some(is_num)) => start = Some((idx, is_num)),
            (None, None) => {}
        }
    }
    if let Some((from, numeric)) = start {
        out.push(make_segment(&version[from..], numeric));
    }

    out
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_segments(a: Option<&Segment<'_>>, b: Option<&Segment<'_>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Segment::Number(x)), Some(Segment::Number(y))) => compare_numbers(x, y),
        (Some(Segment::Number(_)), Some(Segment::Tag(_))) => Ordering::Greater,
        (Some(Segment::Tag(_)), Some(Segment::Number(_))) => Ordering::Less,
        (Some(Segment::Tag(x)), Some(Segment::Tag(y))) => {
            tag_rank(x).cmp(&tag_rank(y)).then_with(|| x.cmp(y))
        }
        (Some(Segment::Number(_)), None) => Ordering::Greater,
        (None, Some(Segment::Number(_))) => Ordering::Less,
        (Some(Segment::Tag(x)), None) => {
            if is_post_release(x) {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (None, Some(Segment::Tag(_))) => compare_segments(b, a).reverse(),
    }
}

/// Compare two version strings. Never fails.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    match (left.is_empty(), right.is_empty()) {
        (true, true) => return a.cmp(b),
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    let len = left.len().max(right.len());
    (0..len)
        .map(|i| compare_segments(left.get(i), right.get(i)))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Whether `new` counts as an update over `old`.
///
/// A missing or empty `old` is a first observation and always counts.
pub fn is_newer(old: Option<&str>, new: &str) -> bool {
    match old {
        None => true,
        Some(old) if old.is_empty() => true,
        Some(old) => compare_versions(old, new) == Ordering::Less,
    }
}

/// Pick the greatest version. Ties keep the first occurrence.
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().fold(None, |best, candidate| match best {
        Some(current) if compare_versions(candidate, current) != Ordering::Greater => {
            Some(current)
        }
        _ => Some(candidate),
    })
}

use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-'.,]").expect("disallowed-chars pattern"));

// Edition-variant suffixes, in priority order. Anchored at end-of-string so a
// title like "Salem's Lot: Special Edition Tour" is left alone.
static COMPLETE_UNCUT_EDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*:\s*the\s+complete\s+(?:&|and)\s+uncut\s+edition\s*$")
        .expect("complete-uncut pattern")
});
static VARIANT_EDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*:\s*(?:expanded|limited|special|collector's|collectors)\s+edition\s*$")
        .expect("variant-edition pattern")
});
static BARE_EDITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+edition\s*$").expect("bare-edition pattern"));

static TRAILING_PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("parenthetical pattern"));

/// Canonical comparison key for a scraped title. Two raw titles with the same
/// key describe the same work and get merged by the reconciler.
///
/// Parenthetical suffixes ("IT (2017 Movie Tie-In)") are dropped before
/// anything else; the paren characters themselves would otherwise be eaten by
/// the character strip and leave the suffix text behind.
pub fn canonical_key(title: &str) -> String {
    normalize_title(strip_trailing_parenthetical(title))
}

/// Normalize a title for comparison: strip everything but alphanumerics,
/// whitespace and `- ' . ,`; lowercase; drop edition-variant suffixes; collapse
/// whitespace. Pure and total.
pub fn normalize_title(title: &str) -> String {
    let cleaned = DISALLOWED_CHARS.replace_all(title, "");
    let cleaned = cleaned.to_lowercase();

    let cleaned = COMPLETE_UNCUT_EDITION.replace(&cleaned, "");
    let cleaned = VARIANT_EDITION.replace(&cleaned, "");
    let cleaned = BARE_EDITION.replace(&cleaned, "");

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove one trailing parenthetical group, e.g. "(2017 Movie Tie-In)".
pub fn strip_trailing_parenthetical(title: &str) -> &str {
    match TRAILING_PARENTHETICAL.find(title) {
        Some(found) => title[..found.start()].trim_end(),
        None => title.trim_end(),
    }
}

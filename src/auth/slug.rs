use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

/// Separator placed between slug words and before a disambiguating suffix.
pub const SEPARATOR: char = '-';

/// Exclusive upper bound of the disambiguating suffix.
pub const SUFFIX_RANGE: u32 = 1000;

/// Used when a name contains no allowed characters at all.
const FALLBACK_SLUG: &str = "user";

/// Derives the candidate slug for a display name.
///
/// The name is lower-cased, every character outside ASCII letters, digits and
/// the Ukrainian alphabet becomes a separator, runs of separators collapse and
/// leading/trailing separators are removed.
pub fn slugify(name: &str) -> String {
    lazy_static! {
        static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9а-яіїєґ]").unwrap();
        static ref REPEATED_SEP: Regex = Regex::new(r"-+").unwrap();
    }
    let lowered = name.to_lowercase();
    let replaced = DISALLOWED.replace_all(&lowered, "-");
    let collapsed = REPEATED_SEP.replace_all(&replaced, "-");
    let slug = collapsed.trim_matches(SEPARATOR);
    // An empty slug is never stored; such names share the `user` base instead.
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Appends a numeric suffix to a taken slug.
pub fn with_suffix(slug: &str, suffix: u32) -> String {
    format!("{slug}{SEPARATOR}{suffix}")
}

/// Source of disambiguating suffixes in `[0, SUFFIX_RANGE)`.
pub trait SuffixSource: Send + Sync {
    fn next_suffix(&self) -> u32;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self) -> u32 {
        rand::thread_rng().gen_range(0..SUFFIX_RANGE)
    }
}

/// Always yields the same suffix.
#[derive(Debug, Clone, Copy)]
pub struct FixedSuffix(pub u32);

impl SuffixSource for FixedSuffix {
    fn next_suffix(&self) -> u32 {
        self.0 % SUFFIX_RANGE
    }
}

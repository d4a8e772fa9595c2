//! Folder-name slugging for naming overrides and prefixes.
//!
//! Overrides are user-supplied strings that end up as directory names, so
//! they are folded to lowercase ASCII with `-` separators. Transliteration
//! depends on an explicit [`Locale`]; nothing is read from the process
//! environment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Locale used for locale-sensitive transliteration.
///
/// Accepts POSIX-style identifiers (`de_DE.UTF-8`, `fr_FR@euro`) and
/// BCP 47 tags (`de-AT`). Encoding and modifier suffixes are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    /// Two or three letter language code, lowercase.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Region code, uppercase, if present.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn is_german(&self) -> bool {
        self.language == "de"
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            region: Some("US".to_string()),
        }
    }
}

impl FromStr for Locale {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = s
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();
        let mut parts = base.split(['_', '-']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();

        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CacheError::ConfigInvalid(format!("invalid locale '{s}'")));
        }

        let region = parts
            .next()
            .filter(|r| !r.is_empty())
            .map(str::to_ascii_uppercase);

        Ok(Self { language, region })
    }
}

impl TryFrom<String> for Locale {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}_{region}", self.language),
            None => f.write_str(&self.language),
        }
    }
}

/// Fold one character to its ASCII spelling for `locale`.
fn transliterate(c: char, locale: &Locale) -> Option<&'static str> {
    let german = locale.is_german();
    let s = match c {
        'ä' | 'Ä' if german => "ae",
        'ö' | 'Ö' if german => "oe",
        'ü' | 'Ü' if german => "ue",
        'ß' => "ss",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        _ => return None,
    };
    Some(s)
}

/// Slug a single path segment: lowercase ASCII alphanumerics joined by `-`.
///
/// Returns an empty string when nothing survives.
pub fn slugify(input: &str, locale: &Locale) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        let mut buf = [0; 4];
        let piece: &str = if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase().encode_utf8(&mut buf)
        } else if let Some(ascii) = transliterate(c, locale) {
            ascii
        } else {
            pending_dash = true;
            continue;
        };

        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push_str(piece);
    }

    out
}

/// Slug a `/`-separated name, keeping the separators between segments.
///
/// Empty segments (including leading and trailing separators) are dropped.
pub fn slugify_path(input: &str, locale: &Locale) -> String {
    input
        .split('/')
        .map(|segment| slugify(segment, locale))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

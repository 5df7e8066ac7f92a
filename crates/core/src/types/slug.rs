//! URL slugs derived from post titles.

use core::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Errors that can occur when deriving a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The title has no characters that survive slugification.
    #[error("title must contain at least one letter or digit")]
    Empty,
}

/// A lowercase, dash-separated URL segment.
///
/// The title is NFC-normalised, then accented Latin letters and a handful of
/// symbols are transliterated (`é` to `e`, `ß` to `ss`, `&` to `and`,
/// `€` to `euro`). Whitespace and `-` separate words; every other character
/// that is not an ASCII letter or digit is dropped, `_` included. Runs of
/// separators collapse to one `-` and the result never starts or ends with
/// a dash.
///
/// ```
/// use ritwrites_core::Slug;
///
/// let slug = Slug::from_title("Don't Panic: Rust & Tokio, part 2!").unwrap();
/// assert_eq!(slug.as_str(), "dont-panic-rust-and-tokio-part-2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a title.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing is left after slugification.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut out = Builder::with_capacity(title.len());

        for c in title.nfc() {
            match transliterate(c) {
                Some(replacement) => replacement.chars().for_each(|r| out.push(r)),
                None => out.push(c),
            }
        }

        if out.slug.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(out.slug))
    }

    /// Wrap a slug read back from storage or a URL without re-deriving it.
    #[must_use]
    pub fn from_stored(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Builder {
    slug: String,
    pending_dash: bool,
}

impl Builder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slug: String::with_capacity(capacity),
            pending_dash: false,
        }
    }

    fn push(&mut self, c: char) {
        if c.is_ascii_alphanumeric() {
            // A separator is only owed between words, never at the start.
            if self.pending_dash && !self.slug.is_empty() {
                self.slug.push('-');
            }
            self.pending_dash = false;
            self.slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            self.pending_dash = true;
        }
    }
}

/// Replacement text for letters and symbols that have a readable ASCII form.
///
/// Replacements are lowercase; the slug is lowercased anyway.
const fn transliterate(c: char) -> Option<&'static str> {
    let replacement = match c {
        '&' => "and",
        '$' => "dollar",
        '%' => "percent",
        '<' => "less",
        '>' => "greater",
        '|' => "or",
        '¢' => "cent",
        '£' => "pound",
        '¤' => "currency",
        '¥' => "yen",
        '€' => "euro",
        '∆' => "delta",
        '∑' => "sum",
        '∞' => "infinity",
        '♥' => "love",
        'ª' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'Ā' | 'ā'
        | 'Ă' | 'ă' | 'Ą' | 'ą' => "a",
        'Æ' | 'æ' => "ae",
        '©' | 'Ç' | 'ç' | 'Ć' | 'ć' | 'Č' | 'č' => "c",
        'Ð' | 'ð' | 'Ď' | 'ď' => "d",
        'Đ' | 'đ' => "dj",
        'È' | 'É' | 'Ê' | 'Ë' | 'è' | 'é' | 'ê' | 'ë' | 'Ē' | 'ē' | 'Ė' | 'ė' | 'Ę' | 'ę' | 'Ě'
        | 'ě' => "e",
        'Ğ' | 'ğ' | 'Ģ' | 'ģ' => "g",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'ì' | 'í' | 'î' | 'ï' | 'Ĩ' | 'ĩ' | 'Ī' | 'ī' | 'Į' | 'į' | 'İ'
        | 'ı' => "i",
        'Ķ' | 'ķ' => "k",
        'Ļ' | 'ļ' | 'Ľ' | 'ľ' | 'Ł' | 'ł' => "l",
        'Ñ' | 'ñ' | 'Ń' | 'ń' | 'Ņ' | 'ņ' | 'Ň' | 'ň' => "n",
        'º' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ō' | 'ō'
        | 'Ő' | 'ő' => "o",
        'Œ' | 'œ' => "oe",
        '®' | 'Ŕ' | 'ŕ' | 'Ř' | 'ř' => "r",
        'Ś' | 'ś' | 'Ş' | 'ş' | 'Š' | 'š' | 'Ș' | 'ș' => "s",
        'ß' => "ss",
        'Ţ' | 'ţ' | 'Ť' | 'ť' | 'Ț' | 'ț' => "t",
        'Þ' | 'þ' => "th",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'ù' | 'ú' | 'û' | 'ü' | 'Ũ' | 'ũ' | 'Ū' | 'ū' | 'Ů' | 'ů' | 'Ű'
        | 'ű' | 'Ų' | 'ų' => "u",
        'Ŵ' | 'ŵ' => "w",
        'Ý' | 'ý' | 'ÿ' | 'Ÿ' | 'Ŷ' | 'ŷ' => "y",
        'Ź' | 'ź' | 'Ż' | 'ż' | 'Ž' | 'ž' => "z",
        _ => return None,
    };
    Some(replacement)
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn slug(title: &str) -> String {
        Slug::from_title(title).unwrap().as_str().to_owned()
    }

    #[test]
    fn test_basic_title() {
        assert_eq!(slug("Hello World"), "hello-world");
    }

    #[test]
    fn test_collapses_separators_and_trims() {
        assert_eq!(slug("  --Hello   -- World--  "), "hello-world");
    }

    #[test]
    fn test_drops_punctuation_without_splitting_words() {
        assert_eq!(slug("It's (almost) done."), "its-almost-done");
    }

    #[test]
    fn test_ampersand_is_spelled_out_in_place() {
        assert_eq!(slug("Salt & Pepper"), "salt-and-pepper");
        assert_eq!(slug("R&D"), "randd");
    }

    #[test]
    fn test_underscore_joins_words() {
        assert_eq!(slug("snake_case"), "snakecase");
    }

    #[test]
    fn test_accents_are_transliterated() {
        assert_eq!(slug("Café Über 2024"), "cafe-uber-2024");
        assert_eq!(slug("Straße, Łódź & Œuvre"), "strasse-lodz-and-oeuvre");
    }

    #[test]
    fn test_decomposed_accents_are_normalised() {
        assert_eq!(slug("Cafe\u{301} Crème"), "cafe-creme");
    }

    #[test]
    fn test_symbols_are_spelled_out() {
        assert_eq!(slug("100% Rust for 5€"), "100percent-rust-for-5euro");
    }

    #[test]
    fn test_unmapped_script_is_dropped() {
        assert_eq!(slug("日本 Trip"), "trip");
    }

    #[test]
    fn test_empty_title_rejected() {
        assert_eq!(Slug::from_title("!!! ???"), Err(SlugError::Empty));
        assert_eq!(Slug::from_title(""), Err(SlugError::Empty));
    }
}

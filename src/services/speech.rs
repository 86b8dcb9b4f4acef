//! Speech markup helpers
//!
//! Pure string transforms: escaping, `say-as` tagging so numbers, fractions
//! and units are pronounced correctly, and stripping markup for text cards.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// `say-as` interpretations used in narratives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SayAs {
    Cardinal,
    Fraction,
    Unit,
    Address,
    Interjection,
}

impl SayAs {
    pub fn as_str(&self) -> &'static str {
        match self {
            SayAs::Cardinal => "cardinal",
            SayAs::Fraction => "fraction",
            SayAs::Unit => "unit",
            SayAs::Address => "address",
            SayAs::Interjection => "interjection",
        }
    }
}

/// Wrap text in a `say-as` tag
pub fn say_as(text: &str, kind: SayAs) -> String {
    format!("<say-as interpret-as=\"{}\">{}</say-as>", kind.as_str(), text)
}

/// Escape XML special characters
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Alternation order matters: fractions, then quantities with units, then bare numbers
        Regex::new(
            r"(?x)
            (?P<fraction>\b(?:(?P<whole>\d+)[+\s]+)?(?P<ratio>\d+/\d+)\b)
            | (?P<unit>\b\d+(?:\.\d+)?\s*(?:[cmk]?[glm]|(?:sq)?ft|in|mi|yd|lbs?|oz|gal|qt|pt|h|min|m?s)\b)
            | (?P<number>\b\d+\b)",
        )
        .unwrap_or_else(|e| panic!("invalid number pattern: {e}"))
    })
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<[^>]+>").unwrap_or_else(|e| panic!("invalid markup pattern: {e}"))
    })
}

/// Escape free text and tag numbers, fractions and units for pronunciation
pub fn escape_and_tag_numbers(text: &str) -> String {
    let escaped = escape(text);
    number_pattern()
        .replace_all(&escaped, |caps: &Captures| {
            if caps.name("fraction").is_some() {
                let ratio = caps.name("ratio").map_or("", |m| m.as_str());
                match caps.name("whole") {
                    Some(whole) => say_as(&format!("{}+{}", whole.as_str(), ratio), SayAs::Fraction),
                    None => say_as(ratio, SayAs::Fraction),
                }
            } else if let Some(unit) = caps.name("unit") {
                say_as(unit.as_str(), SayAs::Unit)
            } else {
                say_as(&caps[0], SayAs::Cardinal)
            }
        })
        .into_owned()
}

/// Remove all tags and decode escaped characters
pub fn strip_markup(text: &str) -> String {
    unescape(&markup_pattern().replace_all(text, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_say_as() {
        assert_eq!(say_as("2", SayAs::Cardinal), "<say-as interpret-as=\"cardinal\">2</say-as>");
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape("Tom & Jerry's <box>"), "Tom &amp; Jerry&apos;s &lt;box&gt;");
    }

    #[test]
    fn test_tag_bare_numbers() {
        assert_eq!(
            escape_and_tag_numbers("Order 42"),
            "Order <say-as interpret-as=\"cardinal\">42</say-as>"
        );
    }

    #[test]
    fn test_tag_fraction_with_whole_part() {
        assert_eq!(
            escape_and_tag_numbers("Pipe 1 1/2 inch"),
            "Pipe <say-as interpret-as=\"fraction\">1+1/2</say-as> inch"
        );
        assert_eq!(
            escape_and_tag_numbers("3/4 cup"),
            "<say-as interpret-as=\"fraction\">3/4</say-as> cup"
        );
    }

    #[test]
    fn test_tag_units() {
        assert_eq!(
            escape_and_tag_numbers("Dog food 30 lbs"),
            "Dog food <say-as interpret-as=\"unit\">30 lbs</say-as>"
        );
        assert_eq!(
            escape_and_tag_numbers("Cable 2m"),
            "Cable <say-as interpret-as=\"unit\">2m</say-as>"
        );
    }

    #[test]
    fn test_no_numbers_only_escaped() {
        assert_eq!(escape_and_tag_numbers("Books & more"), "Books &amp; more");
    }

    #[test]
    fn test_strip_markup_round_trip() {
        let marked = format!("<p>{} from {}</p>", say_as("2", SayAs::Cardinal), escape("A&B"));
        assert_eq!(strip_markup(&marked), "2 from A&B");
    }
}

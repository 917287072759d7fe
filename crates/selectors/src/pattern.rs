//! Property pattern compilation for `:-abp-properties(...)`.
//!
//! An argument delimited by `/.../` is a regular-expression source; anything
//! else is a literal `name: value` declaration whose name may contain `*`
//! wildcards. Compilation happens once, when the selector is registered.

use log::warn;
use regex::{Regex, RegexBuilder};

/// How a declaration name is matched.
#[derive(Clone, Debug)]
pub enum NamePattern {
    /// Exact (lowercased) property name.
    Exact(String),
    /// A name containing `*`, compiled to an anchored name-only regex.
    Wildcard(Regex),
}

impl NamePattern {
    /// Test a declaration name against the pattern.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name.eq_ignore_ascii_case(exact),
            Self::Wildcard(regex) => regex.is_match(name),
        }
    }
}

/// A compiled `:-abp-properties` argument.
#[derive(Clone, Debug)]
pub enum PropertyPattern {
    /// A literal `name: value` declaration pair.
    Literal { name: NamePattern, value: String },
    /// A regular expression tested against the serialized declaration block.
    Regex(Regex),
    /// A pattern whose source did not survive compilation. It matches
    /// nothing, on purpose: authors get exactly what they wrote.
    NeverMatching,
}

impl PropertyPattern {
    /// Compile a pattern from the raw predicate argument.
    pub fn parse(text: &str) -> Self {
        if text.len() >= 2 && text.starts_with('/') && text.ends_with('/') {
            let source = decode_css_escapes(&text[1..text.len() - 1]);
            return match case_insensitive(&source) {
                Ok(regex) => Self::Regex(regex),
                Err(error) => {
                    warn!("property pattern /{source}/ does not compile: {error}");
                    Self::NeverMatching
                }
            };
        }
        let (raw_name, raw_value) = text.split_once(':').unwrap_or((text, ""));
        let name_text = raw_name.trim().to_ascii_lowercase();
        let value = raw_value.trim().to_string();
        let name = if name_text.contains('*') {
            match case_insensitive(&wildcard_to_regex(&name_text)) {
                Ok(regex) => NamePattern::Wildcard(regex),
                Err(error) => {
                    warn!("wildcard name `{name_text}` does not compile: {error}");
                    return Self::NeverMatching;
                }
            }
        } else {
            NamePattern::Exact(name_text)
        };
        Self::Literal { name, value }
    }
}

fn case_insensitive(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

/// Turn a wildcard property name into an anchored regex source, `*`
/// becoming `.*` and everything else matched literally.
fn wildcard_to_regex(name: &str) -> String {
    let mut out = String::from("^");
    for (index, piece) in name.split('*').enumerate() {
        if index > 0 {
            out.push_str(".*");
        }
        out.push_str(&regex::escape(piece));
    }
    out.push('$');
    out
}

/// Decode CSS hex escapes (`\` + 1..6 hex digits + one whitespace
/// terminator) in a regex source.
///
/// The terminator is required here: an escape whose digit run is not
/// followed by whitespace is left byte-for-byte undecoded, which usually
/// yields a source the regex engine rejects. That selector then matches
/// nothing — the malformed escape is the author's mistake and is not
/// papered over.
fn decode_css_escapes(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut index = 0;
    while index < chars.len() {
        let current = chars[index];
        if current != '\\' {
            out.push(current);
            index += 1;
            continue;
        }
        let mut end = index + 1;
        while end < chars.len() && end - index <= 6 && chars[end].is_ascii_hexdigit() {
            end += 1;
        }
        let has_digits = end > index + 1;
        let terminated = chars.get(end).is_some_and(|ch| ch.is_whitespace());
        if has_digits && terminated {
            let hex: String = chars[index + 1..end].iter().collect();
            if let Some(decoded) = u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
            {
                out.push(decoded);
                index = end + 1;
                continue;
            }
        }
        out.push('\\');
        index += 1;
    }
    out
}

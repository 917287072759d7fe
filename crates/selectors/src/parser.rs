//! Extended selector parsing.
//!
//! Plain tokens follow Selectors Level 3
//! (<https://www.w3.org/TR/selectors-3/>); a `:-abp-name(argument)` token
//! introduces a predicate. The closing parenthesis of an argument is located
//! by counting nested parentheses while honoring quoted strings and
//! backslash escapes, since a `has` argument may itself contain nested
//! predicates.

use crate::{
    Combinator, ExtendedSelector, Predicate, PropertyPattern, SelectorPart, SimpleSelector,
};
use core::mem::take;
use thiserror::Error;

/// Reasons a selector string is rejected. A rejected selector is dropped by
/// the caller; it never aborts the rest of a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A predicate argument ran out of input before its parentheses balanced.
    #[error("unbalanced predicate argument")]
    UnbalancedArgument,
    /// A `:-abp-` pseudo-class with a name this grammar does not know.
    #[error("unknown predicate `:-abp-{0}`")]
    UnknownPredicate(String),
    /// A pseudo-class outside the `-abp-` namespace. The compound matcher
    /// has no dynamic-state inputs, so these cannot be honored.
    #[error("unsupported pseudo-class `:{0}`")]
    UnsupportedPseudoClass(String),
    /// A predicate name that is not followed by `(`.
    #[error("predicate `:-abp-{0}` is missing its argument")]
    MissingArgument(String),
    /// A combinator with no selector part on one of its sides.
    #[error("combinator with an empty selector part")]
    DanglingCombinator,
    /// A simple selector or second predicate directly after a predicate;
    /// parts are only ever linked through combinators.
    #[error("token follows a predicate without a combinator")]
    TrailingPredicate,
    /// The input was empty or all whitespace.
    #[error("empty selector")]
    EmptySelector,
    /// A byte no selector production starts with.
    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),
}

/// Parse an extended selector string into its part chain.
pub fn parse(input: &str) -> Result<ExtendedSelector, ParseError> {
    let mut cursor = Cursor::new(input);
    let selector = cursor.parse_selector()?;
    if selector.parts.is_empty() {
        return Err(ParseError::EmptySelector);
    }
    Ok(selector)
}

/// Byte cursor over a selector string.
struct Cursor {
    input_bytes: Vec<u8>,
    index: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Self {
            input_bytes: input.as_bytes().to_vec(),
            index: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input_bytes.get(self.index).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Skip ASCII whitespace, reporting whether any was consumed.
    fn skip_spaces(&mut self) -> bool {
        let start = self.index;
        while matches!(self.peek(), Some(byte) if byte.is_ascii_whitespace()) {
            self.bump();
        }
        self.index > start
    }

    /// Consume an identifier of ASCII alphanumerics, '-' and '_'.
    fn consume_ident(&mut self) -> String {
        let start = self.index;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                self.bump();
            } else {
                break;
            }
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        String::from_utf8_lossy(slice).to_string()
    }

    /// Parse the whole input as one part chain.
    fn parse_selector(&mut self) -> Result<ExtendedSelector, ParseError> {
        let mut parts: Vec<SelectorPart> = Vec::new();
        let mut current = SelectorPart::default();

        loop {
            let saw_whitespace = self.skip_spaces();
            let Some(byte) = self.peek() else { break };

            match byte {
                b'>' | b'+' | b'~' => {
                    self.bump();
                    let combinator = match byte {
                        b'>' => Combinator::Child,
                        b'+' => Combinator::AdjacentSibling,
                        _ => Combinator::GeneralSibling,
                    };
                    Self::finish_part(&mut parts, &mut current, Some(combinator))?;
                }
                _ => {
                    // Whitespace between two compounds implies a descendant
                    // combinator; whitespace around explicit combinators or
                    // at the start of the input does not.
                    if saw_whitespace
                        && (!current.compound.is_empty() || current.predicate.is_some())
                    {
                        Self::finish_part(&mut parts, &mut current, Some(Combinator::Descendant))?;
                    }
                    self.consume_simple_or_predicate(&mut current)?;
                }
            }
        }

        if !current.compound.is_empty() || current.predicate.is_some() {
            Self::finish_part(&mut parts, &mut current, None)?;
        } else if !parts.is_empty() {
            // "div >" — the trailing combinator has nothing to link to.
            return Err(ParseError::DanglingCombinator);
        }
        Ok(ExtendedSelector { parts })
    }

    /// Close the current part and link it with `combinator`.
    fn finish_part(
        parts: &mut Vec<SelectorPart>,
        current: &mut SelectorPart,
        combinator: Option<Combinator>,
    ) -> Result<(), ParseError> {
        if current.compound.is_empty() && current.predicate.is_none() {
            return Err(ParseError::DanglingCombinator);
        }
        let mut part = take(current);
        part.combinator = combinator;
        parts.push(part);
        Ok(())
    }

    /// Consume one simple selector, or a predicate pseudo-class.
    fn consume_simple_or_predicate(&mut self, current: &mut SelectorPart) -> Result<(), ParseError> {
        let Some(byte) = self.peek() else {
            return Ok(());
        };
        if byte == b':' {
            self.bump();
            let predicate = self.consume_predicate()?;
            if current.predicate.is_some() {
                return Err(ParseError::TrailingPredicate);
            }
            current.predicate = Some(predicate);
            return Ok(());
        }
        // A part reads compound-then-predicate; once the predicate is seen
        // only a combinator may follow.
        if current.predicate.is_some() {
            return Err(ParseError::TrailingPredicate);
        }
        let simple = match byte {
            b'*' => {
                self.bump();
                SimpleSelector::Universal
            }
            b'.' => {
                self.bump();
                SimpleSelector::Class(self.consume_ident())
            }
            b'#' => {
                self.bump();
                SimpleSelector::IdSelector(self.consume_ident())
            }
            b'[' => self.consume_attr(),
            _ => {
                let ident = self.consume_ident();
                if ident.is_empty() {
                    return Err(ParseError::UnexpectedCharacter(char::from(byte)));
                }
                SimpleSelector::Type(ident.to_ascii_lowercase())
            }
        };
        current.compound.simples.push(simple);
        Ok(())
    }

    /// Parse an attribute selector, supporting `[name]` and `[name=value]`
    /// (quoted or unquoted).
    fn consume_attr(&mut self) -> SimpleSelector {
        // skip '['
        self.bump();
        self.skip_spaces();
        let name = self.consume_ident().to_ascii_lowercase();
        self.skip_spaces();
        let value = if self.peek() == Some(b'=') {
            self.bump();
            self.skip_spaces();
            if let Some(quote) = self.peek().filter(|&byte| byte == b'"' || byte == b'\'') {
                self.bump();
                self.consume_quoted_attr_value(quote)
            } else {
                self.consume_unquoted_attr_value()
            }
        } else {
            String::new()
        };
        self.skip_spaces();
        if self.peek() == Some(b']') {
            self.bump();
        }
        SimpleSelector::AttrEquals { name, value }
    }

    /// Consume an unquoted attribute value until whitespace or `]`.
    fn consume_unquoted_attr_value(&mut self) -> String {
        let start = self.index;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || byte == b']' {
                break;
            }
            self.bump();
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        String::from_utf8_lossy(slice).to_string()
    }

    /// Consume a quoted attribute value until the matching quote byte.
    fn consume_quoted_attr_value(&mut self, quote: u8) -> String {
        let start = self.index;
        while matches!(self.peek(), Some(byte) if byte != quote) {
            self.bump();
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        let out = String::from_utf8_lossy(slice).to_string();
        if self.peek().is_some() {
            self.bump();
        }
        out
    }

    /// Parse a pseudo-class after `:` into a predicate.
    fn consume_predicate(&mut self) -> Result<Predicate, ParseError> {
        let name = self.consume_ident().to_ascii_lowercase();
        let Some(predicate_name) = name.strip_prefix("-abp-") else {
            return Err(ParseError::UnsupportedPseudoClass(name));
        };
        if self.peek() != Some(b'(') {
            return Err(ParseError::MissingArgument(predicate_name.to_string()));
        }
        self.bump();
        let argument = self.consume_argument()?;
        match predicate_name {
            "properties" => Ok(Predicate::Properties(PropertyPattern::parse(&argument))),
            "has" => parse_has_argument(&argument),
            "contains" => Ok(Predicate::Contains { text: argument }),
            _ => Err(ParseError::UnknownPredicate(predicate_name.to_string())),
        }
    }

    /// Consume a predicate argument up to its balancing `)`, honoring nested
    /// parentheses, quoted strings and backslash escapes.
    fn consume_argument(&mut self) -> Result<String, ParseError> {
        let start = self.index;
        let mut depth = 1usize;
        let mut quote: Option<u8> = None;
        while let Some(byte) = self.peek() {
            if byte == b'\\' {
                self.bump();
                self.bump();
                continue;
            }
            if let Some(open) = quote {
                if byte == open {
                    quote = None;
                }
            } else if byte == b'"' || byte == b'\'' {
                quote = Some(byte);
            } else if byte == b'(' {
                depth = depth.saturating_add(1);
            } else if byte == b')' {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
                    let text = String::from_utf8_lossy(slice).to_string();
                    self.bump();
                    return Ok(text);
                }
            }
            self.bump();
        }
        Err(ParseError::UnbalancedArgument)
    }
}

/// Parse the argument of `:-abp-has(...)`. A leading bare `>` scopes the
/// search to direct children and is consumed before the recursive parse.
fn parse_has_argument(argument: &str) -> Result<Predicate, ParseError> {
    let trimmed = argument.trim_start();
    let (scoped_to_children, inner_text) = match trimmed.strip_prefix('>') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let inner = parse(inner_text)?;
    Ok(Predicate::Has {
        inner: Box::new(inner),
        scoped_to_children,
    })
}

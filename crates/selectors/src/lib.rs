//! Extended selector grammar — element hiding emulation.
//!
//! This crate implements the selector subset a content filter needs to
//! describe elements that plain stylesheet rules cannot reach:
//! - Type, class, id, and attribute equals selectors
//! - Combinators: descendant, child, adjacent sibling, general sibling
//! - The `-abp-` predicate pseudo-classes: `:-abp-properties(...)`,
//!   `:-abp-has(...)` and `:-abp-contains(...)`
//!
//! Plain selector parts follow Selectors Level 3
//! (<https://www.w3.org/TR/selectors-3/>); the predicates are the extension.
//! Parsing happens exactly once per selector, at registration, including the
//! compilation of any property patterns.

mod parser;
mod pattern;

// Re-export public API
pub use parser::{ParseError, parse};
pub use pattern::{NamePattern, PropertyPattern};

/// Simple selectors (subset).
/// Spec: Section 5, 6, 7, 8
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    /// Spec: Section 5 — Type selectors
    Type(String),
    /// Spec: Section 6 — Class selectors
    Class(String),
    /// Spec: Section 7 — ID selectors
    IdSelector(String),
    /// Spec: Section 8 — Attribute selectors [attr=value]
    AttrEquals { name: String, value: String },
    /// Universal selector '*'. Parsed, always matches.
    Universal,
}

/// A compound selector is a sequence of simple selectors (no combinators).
/// Spec: Section 5 — Simple selector sequences
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

impl CompoundSelector {
    /// An empty compound places no structural condition on the element.
    pub fn is_empty(&self) -> bool {
        self.simples.is_empty()
    }
}

/// Combinators between parts.
/// Spec: Section 11 — Combinators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

/// A predicate condition a native query engine cannot express.
///
/// Closed set; the evaluator matches on it exhaustively.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// `:-abp-properties(pattern)` — the element's resolved style
    /// declarations satisfy the pattern.
    Properties(PropertyPattern),
    /// `:-abp-has(inner)` — a qualifying descendant exists. When the inner
    /// selector led with a bare `>`, only direct children qualify.
    Has {
        inner: Box<ExtendedSelector>,
        scoped_to_children: bool,
    },
    /// `:-abp-contains(text)` — the element's rendered text contains the
    /// literal, case-sensitive substring.
    Contains { text: String },
}

/// One link of an extended selector chain: a plain compound filter (possibly
/// empty), an optional predicate on the same element, and the combinator
/// connecting it to the next part (`None` terminates the chain).
#[derive(Clone, Debug, Default)]
pub struct SelectorPart {
    pub compound: CompoundSelector,
    pub predicate: Option<Predicate>,
    pub combinator: Option<Combinator>,
}

/// An ordered chain of [`SelectorPart`]s, produced by [`parse`].
#[derive(Clone, Debug, Default)]
pub struct ExtendedSelector {
    pub parts: Vec<SelectorPart>,
}

impl ExtendedSelector {
    /// True if any part carries a predicate. Predicate-bearing selectors can
    /// never be expressed as stylesheet rules and are always resolved to
    /// concrete elements instead.
    pub fn has_predicate(&self) -> bool {
        self.parts.iter().any(|part| part.predicate.is_some())
    }
}

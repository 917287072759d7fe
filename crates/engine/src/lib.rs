//! Element-hiding emulation engine.
//!
//! Filter lists can ask for elements a plain stylesheet rule cannot
//! describe: "hide the container whose resolved background is black", "hide
//! the block that has an ad marker somewhere inside", "hide whatever says
//! 'sponsored'". This crate evaluates such extended selectors over a live
//! document and keeps the results current as the document changes, at most
//! once per configured interval.
//!
//! The document itself is a collaborator, reached through the adapter
//! traits below; one engine instance serves one document, and independent
//! instances (one per frame) share no state.

mod emulator;
mod evaluate;
mod matchers;
mod throttle;

use anyhow::Error;
use core::fmt;
use core::hash::Hash;

pub use elemhide_selectors::{ExtendedSelector, ParseError, parse};
pub use emulator::{DEFAULT_MIN_INVOCATION_INTERVAL, EmulationConfig, HidingEmulator};
pub use evaluate::{Scope, evaluate};

/// An adapter that abstracts document access for selector matching.
/// Implement this for your DOM layer.
///
/// All methods are element-scoped; text nodes surface only through
/// [`DocumentAdapter::text_content`].
pub trait DocumentAdapter {
    /// Stable element identity for the lifetime of the document.
    type Handle: Copy + Eq + Hash + fmt::Debug;

    /// The document root. Matching starts below it; the root itself is
    /// never a candidate.
    fn root(&self) -> Self::Handle;

    /// Parent element if any.
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Child elements in document order.
    fn children(&self, element: Self::Handle) -> Vec<Self::Handle>;

    /// The next element sibling, skipping non-element nodes.
    fn next_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Tag name in ASCII lowercase (per HTML parsing conventions).
    fn tag_name(&self, element: Self::Handle) -> String;

    /// The `id` attribute if present.
    fn element_id(&self, element: Self::Handle) -> Option<String>;

    /// True if the element carries the given class token.
    fn has_class(&self, element: Self::Handle, class: &str) -> bool;

    /// The attribute value if present.
    fn attribute(&self, element: Self::Handle, name: &str) -> Option<String>;

    /// The rendered text of the element's subtree, concatenated in
    /// document order. Markup never appears here.
    fn text_content(&self, element: Self::Handle) -> String;
}

/// One resolved style declaration in the collaborator's canonical form.
///
/// Canonical numeric and color forms are the resolver's responsibility;
/// the matcher compares strings and nothing else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.name, self.value)
    }
}

/// Resolves an element's fully computed style as an ordered declaration
/// block. Failures propagate to the evaluation caller untouched.
pub trait StyleResolver<H> {
    fn resolved_style(&self, element: H) -> Result<Vec<Declaration>, Error>;
}

/// A document mutation notification. The engine does not replay these; any
/// of them marks the match state dirty and the next throttled pass re-reads
/// the live document.
#[derive(Clone, Debug)]
pub enum DomMutation<H> {
    ChildInserted { parent: H, node: H },
    NodeRemoved { node: H },
    AttributeChanged { node: H, name: String },
    CharacterDataChanged { node: H },
}

/// Receives the selector texts that need no emulation and can be registered
/// as native stylesheet hide rules.
pub trait RuleSink {
    fn add_selectors(&mut self, selectors: &[String]);
}

impl<F: FnMut(&[String])> RuleSink for F {
    fn add_selectors(&mut self, selectors: &[String]) {
        self(selectors);
    }
}

/// Hides concrete elements directly. Must tolerate repeated calls with
/// overlapping element sets.
pub trait HideSink<H> {
    fn hide_elements(&mut self, elements: &[H]);
}

impl<H, F: FnMut(&[H])> HideSink<H> for F {
    fn hide_elements(&mut self, elements: &[H]) {
        self(elements);
    }
}

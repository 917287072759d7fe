//! Tree evaluation: compound filtering, combinator navigation, and
//! predicate matching composed over a part chain.
//!
//! Parts are processed left to right. The first part draws its candidates
//! from the search root's subtree; every later part derives candidates from
//! the previous match set through its linking combinator. A part without a
//! predicate behaves exactly like a plain structural query.

use crate::matchers::{matches_compound, matches_predicate};
use crate::{DocumentAdapter, StyleResolver};
use anyhow::Error;
use elemhide_selectors::{Combinator, ExtendedSelector, SelectorPart};
use std::collections::HashSet;

/// Which elements under the search root seed the first part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// All descendants of the root (the root itself is not a candidate).
    Subtree,
    /// Direct children only; used by child-scoped `has` predicates.
    Children,
}

/// Compute the set of elements under `root` matching `selector`, in
/// document order and deduplicated. The result is complete for this pass;
/// it is never diffed against earlier passes.
pub fn evaluate<D, S>(
    document: &D,
    styles: &S,
    root: D::Handle,
    scope: Scope,
    selector: &ExtendedSelector,
) -> Result<Vec<D::Handle>, Error>
where
    D: DocumentAdapter,
    S: StyleResolver<D::Handle>,
{
    let mut parts = selector.parts.iter();
    let Some(first) = parts.next() else {
        return Ok(Vec::new());
    };

    let seeds = match scope {
        Scope::Subtree => collect_descendants(document, root),
        Scope::Children => document.children(root),
    };
    let mut current = filter_part(document, styles, seeds, first)?;
    let mut link = first.combinator;

    for part in parts {
        // The parser links every non-terminal part; descendant is the
        // neutral fallback.
        let combinator = link.unwrap_or(Combinator::Descendant);
        let derived = navigate(document, &current, combinator);
        current = filter_part(document, styles, derived, part)?;
        link = part.combinator;
    }
    Ok(current)
}

/// Derive the next candidate set from a match set via a combinator,
/// preserving first-seen order and dropping duplicates.
fn navigate<D: DocumentAdapter>(
    document: &D,
    matches: &[D::Handle],
    combinator: Combinator,
) -> Vec<D::Handle> {
    let mut seen: HashSet<D::Handle> = HashSet::new();
    let mut out = Vec::new();
    let mut push = |element: D::Handle, out: &mut Vec<D::Handle>| {
        if seen.insert(element) {
            out.push(element);
        }
    };
    for &element in matches {
        match combinator {
            Combinator::Descendant => {
                for descendant in collect_descendants(document, element) {
                    push(descendant, &mut out);
                }
            }
            Combinator::Child => {
                for child in document.children(element) {
                    push(child, &mut out);
                }
            }
            Combinator::AdjacentSibling => {
                if let Some(next) = document.next_sibling_element(element) {
                    push(next, &mut out);
                }
            }
            Combinator::GeneralSibling => {
                let mut cursor = document.next_sibling_element(element);
                while let Some(sibling) = cursor {
                    push(sibling, &mut out);
                    cursor = document.next_sibling_element(sibling);
                }
            }
        }
    }
    out
}

/// Narrow candidates by the part's compound filter, then by its predicate.
fn filter_part<D, S>(
    document: &D,
    styles: &S,
    candidates: Vec<D::Handle>,
    part: &SelectorPart,
) -> Result<Vec<D::Handle>, Error>
where
    D: DocumentAdapter,
    S: StyleResolver<D::Handle>,
{
    let mut out = Vec::new();
    for element in candidates {
        if !matches_compound(document, element, &part.compound) {
            continue;
        }
        if let Some(predicate) = &part.predicate
            && !matches_predicate(document, styles, element, predicate)?
        {
            continue;
        }
        out.push(element);
    }
    Ok(out)
}

/// All descendants of `root` in document order, excluding `root`.
fn collect_descendants<D: DocumentAdapter>(document: &D, root: D::Handle) -> Vec<D::Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<D::Handle> = document.children(root);
    stack.reverse();
    while let Some(element) = stack.pop() {
        out.push(element);
        let children = document.children(element);
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

//! Per-predicate matchers, plus plain compound matching.
//!
//! The predicate set is a closed sum; [`matches_predicate`] handles every
//! variant exhaustively so a new predicate cannot be forgotten here.

use crate::evaluate::{Scope, evaluate};
use crate::{Declaration, DocumentAdapter, StyleResolver};
use anyhow::Error;
use elemhide_selectors::{CompoundSelector, Predicate, PropertyPattern, SimpleSelector};

/// Match a compound selector against a single element.
/// Spec: <https://www.w3.org/TR/selectors-3/> Section 5–8
pub fn matches_compound<D: DocumentAdapter>(
    document: &D,
    element: D::Handle,
    compound: &CompoundSelector,
) -> bool {
    for simple in &compound.simples {
        match simple {
            SimpleSelector::Universal => {}
            SimpleSelector::Type(type_name) => {
                if document.tag_name(element) != *type_name {
                    return false;
                }
            }
            SimpleSelector::Class(class_name) => {
                if !document.has_class(element, class_name) {
                    return false;
                }
            }
            SimpleSelector::IdSelector(id_value) => {
                if document
                    .element_id(element)
                    .is_none_or(|value| value != *id_value)
                {
                    return false;
                }
            }
            SimpleSelector::AttrEquals { name, value } => {
                if document
                    .attribute(element, name)
                    .is_none_or(|attr_value| attr_value != *value)
                {
                    return false;
                }
            }
        }
    }
    true
}

/// Test one predicate against an element.
pub fn matches_predicate<D, S>(
    document: &D,
    styles: &S,
    element: D::Handle,
    predicate: &Predicate,
) -> Result<bool, Error>
where
    D: DocumentAdapter,
    S: StyleResolver<D::Handle>,
{
    match predicate {
        Predicate::Properties(pattern) => test_properties(styles, element, pattern),
        Predicate::Has {
            inner,
            scoped_to_children,
        } => {
            let scope = if *scoped_to_children {
                Scope::Children
            } else {
                Scope::Subtree
            };
            let found = evaluate(document, styles, element, scope, inner)?;
            Ok(!found.is_empty())
        }
        Predicate::Contains { text } => Ok(document.text_content(element).contains(text.as_str())),
    }
}

/// Test an element's resolved declaration block against a property pattern.
fn test_properties<H, S: StyleResolver<H>>(
    styles: &S,
    element: H,
    pattern: &PropertyPattern,
) -> Result<bool, Error> {
    let declarations = styles.resolved_style(element)?;
    Ok(match pattern {
        PropertyPattern::Literal { name, value } => declarations.iter().any(|declaration| {
            name.matches(&declaration.name)
                && declaration.value.trim().eq_ignore_ascii_case(value)
        }),
        PropertyPattern::Regex(regex) => regex.is_match(&serialize_block(&declarations)),
        PropertyPattern::NeverMatching => false,
    })
}

/// Serialize a declaration block the way a style attribute reads,
/// `name: value; name: value; ...`.
fn serialize_block(declarations: &[Declaration]) -> String {
    let lines: Vec<String> = declarations
        .iter()
        .map(ToString::to_string)
        .collect();
    lines.join("; ")
}

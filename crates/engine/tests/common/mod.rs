//! In-memory document fixture for engine tests: an element arena with
//! per-element resolved styles, mutation notifications, and a visibility
//! bit driven by the hide sink.

use anyhow::Error;
use elemhide_engine::{
    Declaration, DocumentAdapter, DomMutation, EmulationConfig, HidingEmulator, StyleResolver,
};
use indextree::{Arena, NodeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Interval the timed scenarios wait for; the engine throttle runs at half
/// of it so one wait always covers a full throttle window.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Default)]
struct ElementData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    /// Direct rendered text of this element (children contribute their own).
    text: String,
    style: Vec<Declaration>,
}

struct Inner {
    arena: Arena<ElementData>,
    root: NodeId,
    body: NodeId,
    hidden: HashSet<NodeId>,
    updates: mpsc::UnboundedSender<Vec<DomMutation<NodeId>>>,
}

/// Cheap-clone handle to the fixture document; the engine and the test own
/// clones of the same tree.
#[derive(Clone)]
pub struct TestDocument {
    inner: Rc<RefCell<Inner>>,
}

impl TestDocument {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<DomMutation<NodeId>>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut arena = Arena::new();
        let root = arena.new_node(ElementData {
            tag: "html".to_string(),
            ..ElementData::default()
        });
        let body = arena.new_node(ElementData {
            tag: "body".to_string(),
            ..ElementData::default()
        });
        root.append(body, &mut arena);
        let document = Self {
            inner: Rc::new(RefCell::new(Inner {
                arena,
                root,
                body,
                hidden: HashSet::new(),
                updates: sender,
            })),
        };
        (document, receiver)
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    pub fn insert_element(&self, parent: NodeId, tag: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let node = inner.arena.new_node(ElementData {
            tag: tag.to_string(),
            ..ElementData::default()
        });
        parent.append(node, &mut inner.arena);
        let _ = inner
            .updates
            .send(vec![DomMutation::ChildInserted { parent, node }]);
        node
    }

    pub fn insert_div(&self, parent: NodeId) -> NodeId {
        self.insert_element(parent, "div")
    }

    pub fn set_id(&self, node: NodeId, id: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.arena[node].get_mut().id = Some(id.to_string());
        let _ = inner.updates.send(vec![DomMutation::AttributeChanged {
            node,
            name: "id".to_string(),
        }]);
    }

    pub fn add_class(&self, node: NodeId, class: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.arena[node].get_mut().classes.push(class.to_string());
        let _ = inner.updates.send(vec![DomMutation::AttributeChanged {
            node,
            name: "class".to_string(),
        }]);
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        inner
            .arena[node]
            .get_mut()
            .attributes
            .push((name.to_string(), value.to_string()));
        let _ = inner.updates.send(vec![DomMutation::AttributeChanged {
            node,
            name: name.to_string(),
        }]);
    }

    /// Replace the element's resolved declarations, as a stylesheet change
    /// affecting it would.
    pub fn set_style(&self, node: NodeId, declarations: &[(&str, &str)]) {
        let mut inner = self.inner.borrow_mut();
        inner.arena[node].get_mut().style = declarations
            .iter()
            .map(|(name, value)| Declaration::new(*name, *value))
            .collect();
        let _ = inner.updates.send(vec![DomMutation::AttributeChanged {
            node,
            name: "style".to_string(),
        }]);
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.arena[node].get_mut().text = text.to_string();
        let _ = inner
            .updates
            .send(vec![DomMutation::CharacterDataChanged { node }]);
    }

    pub fn remove(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        node.remove_subtree(&mut inner.arena);
        let _ = inner.updates.send(vec![DomMutation::NodeRemoved { node }]);
    }

    pub fn hide(&self, node: NodeId) {
        self.inner.borrow_mut().hidden.insert(node);
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.inner.borrow().hidden.contains(&node)
    }
}

impl DocumentAdapter for TestDocument {
    type Handle = NodeId;

    fn root(&self) -> NodeId {
        self.inner.borrow().root
    }

    fn parent(&self, element: NodeId) -> Option<NodeId> {
        self.inner.borrow().arena[element].parent()
    }

    fn children(&self, element: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        element.children(&inner.arena).collect()
    }

    fn next_sibling_element(&self, element: NodeId) -> Option<NodeId> {
        self.inner.borrow().arena[element].next_sibling()
    }

    fn tag_name(&self, element: NodeId) -> String {
        self.inner.borrow().arena[element].get().tag.clone()
    }

    fn element_id(&self, element: NodeId) -> Option<String> {
        self.inner.borrow().arena[element].get().id.clone()
    }

    fn has_class(&self, element: NodeId, class: &str) -> bool {
        self.inner.borrow().arena[element]
            .get()
            .classes
            .iter()
            .any(|token| token == class)
    }

    fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        self.inner.borrow().arena[element]
            .get()
            .attributes
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.clone())
    }

    fn text_content(&self, element: NodeId) -> String {
        let inner = self.inner.borrow();
        element
            .descendants(&inner.arena)
            .map(|node| inner.arena[node].get().text.as_str())
            .collect()
    }
}

impl StyleResolver<NodeId> for TestDocument {
    fn resolved_style(&self, element: NodeId) -> Result<Vec<Declaration>, Error> {
        Ok(self.inner.borrow().arena[element].get().style.clone())
    }
}

/// A document, an engine wired to it, and recorders for both sinks.
pub struct Harness {
    pub doc: TestDocument,
    pub emulator: HidingEmulator<TestDocument, TestDocument>,
    pub native_rules: Rc<RefCell<Vec<String>>>,
    pub hide_calls: Rc<RefCell<usize>>,
}

impl Harness {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let (doc, updates) = TestDocument::new();
        let native_rules: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let hide_calls: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));

        let rules = Rc::clone(&native_rules);
        let rule_sink = move |selectors: &[String]| {
            rules.borrow_mut().extend(selectors.iter().cloned());
        };
        let hide_doc = doc.clone();
        let calls = Rc::clone(&hide_calls);
        let hide_sink = move |elements: &[NodeId]| {
            *calls.borrow_mut() += 1;
            for &element in elements {
                hide_doc.hide(element);
            }
        };

        let emulator = HidingEmulator::new(
            doc.clone(),
            doc.clone(),
            updates,
            rule_sink,
            hide_sink,
            EmulationConfig {
                min_invocation_interval: REFRESH_INTERVAL / 2,
            },
        );
        Self {
            doc,
            emulator,
            native_rules,
            hide_calls,
        }
    }

    pub async fn apply(&mut self, selectors: &[&str]) {
        let texts: Vec<String> = selectors.iter().map(ToString::to_string).collect();
        self.emulator
            .apply(&texts)
            .await
            .expect("apply should succeed");
    }

    /// Deliver pending notifications and wait out the throttle.
    pub async fn refresh(&mut self) {
        self.emulator.drain_mutations();
        self.emulator
            .run_due()
            .await
            .expect("re-evaluation should succeed");
    }

    pub fn expect_hidden(&self, element: NodeId) {
        assert!(
            self.doc.is_hidden(element),
            "element {element:?} should be hidden"
        );
    }

    pub fn expect_visible(&self, element: NodeId) {
        assert!(
            !self.doc.is_hidden(element),
            "element {element:?} should not be hidden"
        );
    }
}

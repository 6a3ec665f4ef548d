// Read-only navigation over tree document nodes

use crate::error::{DocumentError, DocumentResult};
use crate::scalar::{coerce, coerce_map, Scalar};
use crate::tree::Node;
use indexmap::IndexMap;

/// Read view of one tree node with coerced attribute and text access.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    node: &'a Node,
}

/// Result of a child lookup by name; the shape follows the match count.
#[derive(Debug, Clone)]
pub enum Lookup<'a> {
    Absent,
    One(Element<'a>),
    Many(Vec<Element<'a>>),
}

impl<'a> Lookup<'a> {
    pub fn len(&self) -> usize {
        match self {
            Lookup::Absent => 0,
            Lookup::One(_) => 1,
            Lookup::Many(all) => all.len(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Flatten to a list, for callers that do not care about the shape.
    pub fn into_vec(self) -> Vec<Element<'a>> {
        match self {
            Lookup::Absent => Vec::new(),
            Lookup::One(e) => vec![e],
            Lookup::Many(all) => all,
        }
    }

    /// The single match, if there is exactly one.
    pub fn one(self) -> Option<Element<'a>> {
        match self {
            Lookup::One(e) => Some(e),
            _ => None,
        }
    }
}

impl<'a> Element<'a> {
    pub fn new(node: &'a Node) -> Self {
        Self { node }
    }

    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    /// Children called `name`: absent, one, or many in document order.
    pub fn child(&self, name: &str) -> Lookup<'a> {
        let mut matches: Vec<Element<'a>> = self
            .node
            .children
            .iter()
            .filter(|c| c.name == name)
            .map(Element::new)
            .collect();
        match matches.len() {
            0 => Lookup::Absent,
            1 => Lookup::One(matches.remove(0)),
            _ => Lookup::Many(matches),
        }
    }

    /// Exactly-one child lookup for sections a layout requires.
    pub fn require(&self, name: &str) -> DocumentResult<Element<'a>> {
        self.node
            .children
            .iter()
            .find(|c| c.name == name)
            .map(Element::new)
            .ok_or_else(|| DocumentError::MissingChild {
                node: self.node.name.clone(),
                child: name.to_string(),
            })
    }

    pub fn attr(&self, key: &str) -> DocumentResult<Scalar> {
        self.node
            .attributes
            .get(key)
            .map(|raw| coerce(raw))
            .ok_or_else(|| DocumentError::MissingAttribute {
                node: self.node.name.clone(),
                key: key.to_string(),
            })
    }

    /// Coerced text content; `None` for nodes without text.
    pub fn value(&self) -> Option<Scalar> {
        self.node.text.as_deref().map(coerce)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.node.text.as_deref()
    }

    pub fn parameters(&self) -> IndexMap<String, Scalar> {
        coerce_map(&self.node.attributes)
    }

    /// One-paragraph summary of the node: tag, attribute keys, child tags, text.
    pub fn info(&self) -> String {
        let keys: Vec<&str> = self.node.attributes.keys().map(String::as_str).collect();
        let children: Vec<&str> = self.node.children.iter().map(|c| c.name.as_str()).collect();
        format!(
            "tag:       {}\nparameter: {:?}\nchildren:  {:?}\nvalue:     {}",
            self.node.name,
            keys,
            children,
            self.node.text.as_deref().unwrap_or("")
        )
    }
}

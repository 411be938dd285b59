//! Rendered result nodes.
//!
//! Cards are captured in a single page evaluation: for every card, each
//! [`Lookup`] is run with `querySelectorAll` and the matches are reduced to
//! strings. Extraction rules then work on the captured [`CardSnapshot`]s
//! through the [`ResultNode`] trait and never touch the live page.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::error::NodeError;

/// One query run against every card: the text of each match, or an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Lookup {
    pub key: String,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Lookup {
    pub fn text(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            key: text_key(&selector),
            selector,
            attribute: None,
        }
    }

    pub fn attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        let selector = selector.into();
        let attribute = attribute.into();
        Self {
            key: attribute_key(&selector, &attribute),
            selector,
            attribute: Some(attribute),
        }
    }
}

fn text_key(selector: &str) -> String {
    selector.to_string()
}

// Selectors never contain a NUL, so the key cannot collide with a text lookup.
fn attribute_key(selector: &str, attribute: &str) -> String {
    format!("{selector}\u{0}{attribute}")
}

/// Read access to one rendered result node.
pub trait ResultNode {
    /// Trimmed text of every descendant matching `selector`, in document order.
    fn texts(&self, selector: &str) -> Result<Vec<String>, NodeError>;

    /// `attribute` of every descendant matching `selector` that carries it.
    fn attributes(&self, selector: &str, attribute: &str) -> Result<Vec<String>, NodeError>;

    /// Whether any descendant matches `selector`.
    fn contains(&self, selector: &str) -> Result<bool, NodeError> {
        Ok(!self.texts(selector)?.is_empty())
    }
}

/// Lookup results captured for one card of the feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardSnapshot {
    /// Position of the card in the feed.
    pub index: usize,
    #[serde(default)]
    values: Map<String, Value>,
}

impl CardSnapshot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            values: Map::new(),
        }
    }

    /// Record the texts matched by `selector`.
    pub fn with_texts<S: Into<String>>(
        mut self,
        selector: &str,
        texts: impl IntoIterator<Item = S>,
    ) -> Self {
        self.values.insert(text_key(selector), strings(texts));
        self
    }

    /// Record the `attribute` values matched by `selector`.
    pub fn with_attributes<S: Into<String>>(
        mut self,
        selector: &str,
        attribute: &str,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.values
            .insert(attribute_key(selector, attribute), strings(values));
        self
    }

    /// Store a raw captured value, as the page evaluation would.
    pub fn with_raw(mut self, lookup: &Lookup, value: Value) -> Self {
        self.values.insert(lookup.key.clone(), value);
        self
    }

    fn read(&self, key: &str, selector: &str) -> Result<Vec<String>, NodeError> {
        let Some(value) = self.values.get(key) else {
            return Ok(Vec::new());
        };
        let malformed = |reason: &str| NodeError::Malformed {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };
        let items = value
            .as_array()
            .ok_or_else(|| malformed("expected an array of matches"))?;
        items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| malformed("match is not a string"))
            })
            .collect()
    }
}

fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|s| Value::String(s.into()))
            .collect(),
    )
}

impl ResultNode for CardSnapshot {
    fn texts(&self, selector: &str) -> Result<Vec<String>, NodeError> {
        self.read(&text_key(selector), selector)
    }

    fn attributes(&self, selector: &str, attribute: &str) -> Result<Vec<String>, NodeError> {
        self.read(&attribute_key(selector, attribute), selector)
    }
}

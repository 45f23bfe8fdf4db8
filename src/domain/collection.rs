//! Collection (form) definition
//!
//! A collection describes the elements whose values appear in each
//! submission. Column layout and value formatting are derived from it.

use super::ids::CollectionId;
use serde::{Deserialize, Serialize};

/// Kind of element in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Free text or any scalar value
    #[default]
    Text,
    /// Value(s) picked from a fixed list of options
    Options,
    /// Group of named sub-values
    Composite,
    /// Uploaded file(s) stored as attachments
    File,
}

/// One selectable option of an options element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Stored value
    pub key: String,
    /// Human-readable label
    pub label: String,
}

impl OptionItem {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Sub-element of a composite element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubElement {
    pub key: String,
    pub title: String,
}

impl SubElement {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

/// Element definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Machine name, also the key of the value in submission data
    pub key: String,

    /// Human-readable title
    pub title: String,

    /// Element kind
    #[serde(rename = "type", default)]
    pub element_type: ElementType,

    /// Whether the element accepts multiple values
    #[serde(default)]
    pub multiple: bool,

    /// Options (options elements only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionItem>,

    /// Sub-elements (composite elements only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composite: Vec<SubElement>,
}

impl Element {
    /// Creates a single-valued text element
    pub fn text(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            element_type: ElementType::Text,
            multiple: false,
            options: Vec::new(),
            composite: Vec::new(),
        }
    }

    /// Creates an options element
    pub fn options(
        key: impl Into<String>,
        title: impl Into<String>,
        options: Vec<OptionItem>,
    ) -> Self {
        Self {
            element_type: ElementType::Options,
            options,
            ..Self::text(key, title)
        }
    }

    /// Creates a composite element
    pub fn composite(
        key: impl Into<String>,
        title: impl Into<String>,
        composite: Vec<SubElement>,
    ) -> Self {
        Self {
            element_type: ElementType::Composite,
            composite,
            ..Self::text(key, title)
        }
    }

    /// Creates a file element
    pub fn file(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            element_type: ElementType::File,
            ..Self::text(key, title)
        }
    }

    /// Marks the element as multi-valued
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Label of an option key, if the key is known
    pub fn option_label(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.label.as_str())
    }
}

/// Collection definition
///
/// # Examples
///
/// ```
/// use quarry::domain::collection::{Collection, Element};
/// use quarry::domain::ids::CollectionId;
///
/// let collection = Collection::new(CollectionId::new("contact").unwrap(), "Contact")
///     .with_element(Element::text("name", "Your name"));
/// assert!(collection.export_enabled);
/// assert_eq!(collection.elements.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,

    pub title: String,

    /// Administrative switch; when false the collection cannot be exported
    #[serde(default = "default_true")]
    pub export_enabled: bool,

    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Collection {
    pub fn new(id: CollectionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            export_enabled: true,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_export_enabled(mut self, enabled: bool) -> Self {
        self.export_enabled = enabled;
        self
    }

    /// Looks up an element by key
    pub fn element(&self, key: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.key == key)
    }
}

fn default_true() -> bool {
    true
}

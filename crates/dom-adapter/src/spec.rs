//! Declarative element trees, used both for snapshot files and for building documents in
//! code.

use std::collections::BTreeMap;

use elementscan_core_types::{Rect, Viewport};
use serde::{Deserialize, Serialize};

use crate::errors::DomError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_root: Option<Vec<ElementSpec>>,
    /// Root element of the content document when this element is a frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Box<ElementSpec>>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Some(Rect::new(x, y, width, height));
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ElementSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn shadow(mut self, children: impl IntoIterator<Item = ElementSpec>) -> Self {
        self.shadow_root = Some(children.into_iter().collect());
        self
    }

    pub fn frame(mut self, root: ElementSpec) -> Self {
        self.frame = Some(Box::new(root));
        self
    }
}

/// On-disk page capture: viewport plus the root element (normally `html`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub viewport: Viewport,
    pub root: ElementSpec,
}

impl DocumentSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, DomError> {
        serde_json::from_str(raw).map_err(|err| DomError::Snapshot(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DomError> {
        serde_json::to_string_pretty(self).map_err(|err| DomError::Snapshot(err.to_string()))
    }
}

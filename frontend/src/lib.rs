//! Placeholder view for the greeting client.
//!
//! Builds a tiny in-memory visual tree: a root container hung off the
//! document body with one fixed-size black box inside it. Nothing here talks
//! to the network side.

use log::debug;
use serde::Serialize;
use std::fmt;

/// Named colours the stub knows how to paint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Black => "black",
            Color::White => "white",
        })
    }
}

/// Inline style of an element. Sizes are in pixels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

impl Style {
    fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.background.is_none()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(w) = self.width {
            write!(f, "width: {w}px; ")?;
        }
        if let Some(h) = self.height {
            write!(f, "height: {h}px; ")?;
        }
        if let Some(c) = self.background {
            write!(f, "background-color: {c}; ")?;
        }
        Ok(())
    }
}

/// A node in the visual tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub style: Style,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            style: Style::default(),
            children: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Append a child and hand back a reference to it.
    pub fn append(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        if !self.style.is_empty() {
            write!(f, " style=\"{}\"", self.style.to_string().trim_end())?;
        }
        f.write_str(">")?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.tag)
    }
}

/// The host environment's visual tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Document {
    pub body: Element,
    #[serde(skip)]
    container: Option<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            body: Element::new("body"),
            container: None,
        }
    }

    /// The container the program lives in, created on first use.
    pub fn root_container(&mut self) -> &mut Element {
        let idx = match self.container {
            Some(idx) => idx,
            None => {
                self.body.children.push(Element::new("div"));
                let idx = self.body.children.len() - 1;
                self.container = Some(idx);
                idx
            }
        };
        &mut self.body.children[idx]
    }

    /// Serialize the tree for logging.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.body)
    }
}

/// Side length of the placeholder box.
pub const PLACEHOLDER_SIZE: u32 = 100;

/// Attach the placeholder box to the document's root container.
pub fn mount_placeholder(doc: &mut Document) -> &Element {
    let placeholder = Element::new("div").with_style(Style {
        width: Some(PLACEHOLDER_SIZE),
        height: Some(PLACEHOLDER_SIZE),
        background: Some(Color::Black),
    });
    let mounted = doc.root_container().append(placeholder);
    debug!("mounted placeholder {mounted}");
    mounted
}

//! Remote element query contract and test doubles.
//!
//! The engine never talks to a browser directly: it consumes the
//! [`ElementQuery`] trait (find matches, read the viewport) and interrogates
//! the returned [`Element`] handles (text, displayed flag, CSS, attributes,
//! geometry). All handle operations are pure reads; nothing here mutates the
//! remote document.
//!
//! [`MockQuery`] scripts a sequence of result snapshots so polling behavior
//! can be tested deterministically, and records every query it serves.

use crate::result::{EsperarError, EsperarResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// On-page location of an element's top-left corner, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset from the viewport origin
    pub x: f32,
    /// Vertical offset from the viewport origin
    pub y: f32,
}

/// Width and height in CSS pixels; also describes the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Size {
    /// Create a size
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Point {
    /// Create a point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Shared handle to one remote element.
///
/// Handles are owned by the query result that produced them and are not
/// comparable by identity across separate queries.
pub type ElementRef = Arc<dyn Element>;

/// One remote element: asynchronous, read-only interrogation.
#[async_trait]
pub trait Element: Debug + Send + Sync {
    /// Rendered text content
    async fn text(&self) -> EsperarResult<String>;

    /// The document's own displayed flag
    async fn is_displayed(&self) -> EsperarResult<bool>;

    /// Computed CSS value for `property`
    async fn css_value(&self, property: &str) -> EsperarResult<String>;

    /// Attribute value, `None` when absent
    async fn attribute(&self, name: &str) -> EsperarResult<Option<String>>;

    /// Bounding size
    async fn size(&self) -> EsperarResult<Size>;

    /// On-page location
    async fn location(&self) -> EsperarResult<Point>;
}

/// Selector resolution against the remote document.
///
/// Implementations report matches as they are at the moment of the call; the
/// polling resolver layers the retry policy on top.
#[async_trait]
pub trait ElementQuery: Debug + Send + Sync {
    /// Every element currently matching `selector`, in document order
    /// (possibly empty).
    async fn find_all(&self, selector: &str) -> EsperarResult<Vec<ElementRef>>;

    /// The first element matching `selector`, or `ElementNotFound` when
    /// nothing matches right now.
    async fn find_one(&self, selector: &str) -> EsperarResult<ElementRef> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EsperarError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    /// Current viewport dimensions
    async fn viewport_size(&self) -> EsperarResult<Size>;
}

// =============================================================================
// Test doubles
// =============================================================================

/// Scriptable element for unit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    text: String,
    displayed: bool,
    css: HashMap<String, String>,
    attributes: HashMap<String, String>,
    location: Point,
    size: Size,
}

impl Default for MockElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MockElement {
    /// A displayed 100×20 element at the viewport origin with no text.
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: String::new(),
            displayed: true,
            css: HashMap::new(),
            attributes: HashMap::new(),
            location: Point::new(0.0, 0.0),
            size: Size::new(100.0, 20.0),
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the displayed flag
    #[must_use]
    pub fn with_displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set a computed CSS value
    #[must_use]
    pub fn with_css(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.css.insert(property.into(), value.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the location
    #[must_use]
    pub fn with_location(mut self, x: f32, y: f32) -> Self {
        self.location = Point::new(x, y);
        self
    }

    /// Set the size
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Size::new(width, height);
        self
    }
}

#[async_trait]
impl Element for MockElement {
    async fn text(&self) -> EsperarResult<String> {
        Ok(self.text.clone())
    }

    async fn is_displayed(&self) -> EsperarResult<bool> {
        Ok(self.displayed)
    }

    async fn css_value(&self, property: &str) -> EsperarResult<String> {
        Ok(self.css.get(property).cloned().unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> EsperarResult<Option<String>> {
        Ok(self.attributes.get(name).cloned())
    }

    async fn size(&self) -> EsperarResult<Size> {
        Ok(self.size)
    }

    async fn location(&self) -> EsperarResult<Point> {
        Ok(self.location)
    }
}

/// Mock query for unit testing.
///
/// Serves a scripted sequence of result snapshots: each `find_all` consumes
/// the next snapshot, and the last one repeats once the script is exhausted.
/// An empty script always serves empty results. Every call is recorded for
/// verification.
#[derive(Debug)]
pub struct MockQuery {
    snapshots: Vec<Vec<MockElement>>,
    cursor: AtomicUsize,
    viewport: Size,
    calls: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl Default for MockQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQuery {
    /// A query that never matches anything, viewport 800×600.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: AtomicUsize::new(0),
            viewport: Size::new(800.0, 600.0),
            calls: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// A query that always serves the same matches.
    #[must_use]
    pub fn with_elements(elements: Vec<MockElement>) -> Self {
        Self::with_snapshots(vec![elements])
    }

    /// A query serving `snapshots` in order, repeating the last forever.
    #[must_use]
    pub fn with_snapshots(snapshots: Vec<Vec<MockElement>>) -> Self {
        Self {
            snapshots,
            ..Self::new()
        }
    }

    /// A query whose every call fails at the transport level.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    /// Override the viewport dimensions
    #[must_use]
    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    /// Every recorded call, in order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Check if a method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Number of selector queries served so far
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("find_all"))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ElementQuery for MockQuery {
    async fn find_all(&self, selector: &str) -> EsperarResult<Vec<ElementRef>> {
        self.record(format!("find_all:{selector}"));
        if let Some(message) = &self.failure {
            return Err(EsperarError::Transport {
                message: message.clone(),
            });
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let snapshot = match self.snapshots.len() {
            0 => Vec::new(),
            len => self.snapshots[index.min(len - 1)].clone(),
        };
        Ok(snapshot
            .into_iter()
            .map(|el| Arc::new(el) as ElementRef)
            .collect())
    }

    async fn viewport_size(&self) -> EsperarResult<Size> {
        self.record("viewport_size".to_string());
        Ok(self.viewport)
    }
}

//! Chrome DevTools Protocol query backend.
//!
//! Compiled with the `browser` feature. Wraps an already-connected
//! chromiumoxide [`Page`]: each selector query pins its matches into a
//! uniquely-keyed entry of a `window` registry, and element reads
//! evaluate one expression per read against the pinned node. Interleaved
//! queries on one page therefore never address each other's nodes; an
//! entry is released when the last handle from its query is dropped.
//! Protocol and evaluation failures surface as transport errors and are
//! never retried.

use crate::bridge::transport;
use crate::driver::{Element, ElementQuery, ElementRef, Point, Size};
use crate::result::EsperarResult;
use async_trait::async_trait;
use chromiumoxide::page::Page;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Registry on `window` holding each live query's pinned nodes by id.
const PINS_REGISTRY: &str = "window.__esperarPins";

static PIN_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_pin_id() -> u64 {
    PIN_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

fn pin_script(id: u64, selector: &str) -> String {
    format!(
        "(({PINS_REGISTRY} ??= {{}})[{id}] = \
         Array.from(document.querySelectorAll({}))).length",
        js_string(selector)
    )
}

fn node_path(id: u64, index: usize) -> String {
    format!("{PINS_REGISTRY}[{id}][{index}]")
}

fn release_script(id: u64) -> String {
    format!("delete {PINS_REGISTRY}[{id}]")
}

async fn eval<T: DeserializeOwned>(page: &Page, expression: String) -> EsperarResult<T> {
    let outcome = page.evaluate(expression.as_str()).await.map_err(transport)?;
    outcome.into_value().map_err(transport)
}

/// [`ElementQuery`] over a live page.
///
/// Holds a shared handle to a connected page; the browser and its CDP
/// event loop are managed by the caller.
#[derive(Debug, Clone)]
pub struct CdpQuery {
    page: Arc<Page>,
}

impl CdpQuery {
    /// Wrap an already-connected page.
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            page: Arc::new(page),
        }
    }
}

#[async_trait]
impl ElementQuery for CdpQuery {
    async fn find_all(&self, selector: &str) -> EsperarResult<Vec<ElementRef>> {
        let id = next_pin_id();
        let count: usize = eval(&self.page, pin_script(id, selector)).await?;
        let pin = Arc::new(Pin {
            page: Arc::clone(&self.page),
            id,
        });
        Ok((0..count)
            .map(|index| {
                Arc::new(CdpElement {
                    pin: Arc::clone(&pin),
                    index,
                }) as ElementRef
            })
            .collect())
    }

    async fn viewport_size(&self) -> EsperarResult<Size> {
        let (width, height): (f32, f32) = eval(
            &self.page,
            "[window.innerWidth, window.innerHeight]".to_string(),
        )
        .await?;
        Ok(Size::new(width, height))
    }
}

/// One query's registry entry. Ids are process-unique, so entries from
/// interleaved queries on the same page never collide.
#[derive(Debug)]
struct Pin {
    page: Arc<Page>,
    id: u64,
}

impl Drop for Pin {
    fn drop(&mut self) {
        // Without a runtime there is nowhere to run the release; the
        // entry then lives until the page does.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let page = Arc::clone(&self.page);
        let script = release_script(self.id);
        handle.spawn(async move {
            let _ = page.evaluate(script.as_str()).await;
        });
    }
}

/// Handle to one pinned node, addressed by its query's registry entry
/// and its index within it.
///
/// Reads evaluate against the pinned node, so they observe the document
/// as of the query that produced this handle.
#[derive(Debug)]
pub struct CdpElement {
    pin: Arc<Pin>,
    index: usize,
}

impl CdpElement {
    fn node(&self) -> String {
        node_path(self.pin.id, self.index)
    }

    fn page(&self) -> &Page {
        &self.pin.page
    }
}

#[async_trait]
impl Element for CdpElement {
    async fn text(&self) -> EsperarResult<String> {
        eval(self.page(), format!("({}.textContent ?? '')", self.node())).await
    }

    async fn is_displayed(&self) -> EsperarResult<bool> {
        let script = format!(
            "(el => {{ const cs = window.getComputedStyle(el); \
             return cs.display !== 'none' && cs.visibility !== 'hidden'; }})({})",
            self.node()
        );
        eval(self.page(), script).await
    }

    async fn css_value(&self, property: &str) -> EsperarResult<String> {
        let script = format!(
            "window.getComputedStyle({}).getPropertyValue({})",
            self.node(),
            js_string(property)
        );
        eval(self.page(), script).await
    }

    async fn attribute(&self, name: &str) -> EsperarResult<Option<String>> {
        let script = format!("{}.getAttribute({})", self.node(), js_string(name));
        eval(self.page(), script).await
    }

    async fn size(&self) -> EsperarResult<Size> {
        let script = format!(
            "(r => [r.width, r.height])({}.getBoundingClientRect())",
            self.node()
        );
        let (width, height): (f32, f32) = eval(self.page(), script).await?;
        Ok(Size::new(width, height))
    }

    async fn location(&self) -> EsperarResult<Point> {
        // Viewport-relative coordinates, matching what the geometry check
        // compares against.
        let script = format!(
            "(r => [r.x, r.y])({}.getBoundingClientRect())",
            self.node()
        );
        let (x, y): (f32, f32) = eval(self.page(), script).await?;
        Ok(Point::new(x, y))
    }
}

//! Esperar: Eventual-Resolution Assertions for Rendered Documents
//!
//! Esperar (Spanish: "to wait / to hope for") asserts over a remote,
//! dynamically-rendered web document. Selectors are re-queried until they
//! resolve or a deadline passes, so assertions hold against content that
//! scripts render after load. Predicates settle with messages embedding
//! the observed values.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ESPERAR Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Expectation│    │ Polling    │    │ Element    │            │
//! │   │ (flags +   │───►│ Resolver   │───►│ Query      │            │
//! │   │ predicate) │    │ (deadline) │    │ (CDP/mock) │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use esperar::prelude::*;
//! use std::sync::Arc;
//!
//! let dom = DomAssertions::new(Arc::new(CdpQuery::new(page)));
//!
//! // One query, settled immediately
//! dom.expect(".button").dom().text("OK").await?;
//!
//! // Poll until the element renders or the timeout passes
//! dom.expect("#status").dom().eventually().html_class("ready").await?;
//!
//! // Negation and visibility
//! dom.expect(".spinner").dom().not().visible().await?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod bridge;
#[cfg(feature = "browser")]
mod cdp;
mod driver;
mod engine;
mod resolver;
mod result;
mod visibility;

pub use bridge::{transport, Resolved};
#[cfg(feature = "browser")]
pub use cdp::{CdpElement, CdpQuery};
pub use driver::{Element, ElementQuery, ElementRef, MockElement, MockQuery, Point, Size};
pub use engine::{DomAssertions, Expectation, QueryRef};
pub use resolver::{
    resolve_all, resolve_one, RetryPolicy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
pub use result::{EsperarError, EsperarResult};
pub use visibility::{intersects_viewport, is_visible};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::bridge::*;
    #[cfg(feature = "browser")]
    pub use super::cdp::*;
    pub use super::driver::*;
    pub use super::engine::*;
    pub use super::resolver::*;
    pub use super::result::*;
    pub use super::visibility::*;
}

//! Abstract browser automation boundary.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BrowserDriver (abstract trait)                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐      ┌──────────────────────────┐  │
//! │  │  ChromiumDriver      │      │  MockDriver              │  │
//! │  │  CDP via             │      │  in-memory DOM with      │  │
//! │  │  chromiumoxide       │      │  scripted flakiness      │  │
//! │  └──────────────────────┘      └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wait primitives, the interaction layer and page objects only ever talk to
//! this trait, so the whole core can be exercised against [`MockDriver`]
//! without a browser.
//!
//! [`MockDriver`]: crate::mock::MockDriver

use crate::locator::Locator;
use crate::result::ShopwalkResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque reference to a DOM element resolved by a driver.
///
/// Handles go stale when the page re-renders; drivers then answer
/// [`ShopwalkError::StaleReference`](crate::ShopwalkError::StaleReference).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-specific identifier
    pub id: String,
    /// Description of the locator that produced this handle
    pub origin: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
        }
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.origin, self.id)
    }
}

/// Point-in-time view of an element's state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lower-case tag name
    pub tag: String,
    /// Rendered text; the value for inputs, the selected option for selects
    pub text: String,
    /// Rendered with a non-empty box and not hidden by CSS
    pub displayed: bool,
    /// Not disabled
    pub enabled: bool,
}

impl ElementSnapshot {
    /// Visible and enabled
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// Capability set the harness needs from a browser automation library.
#[async_trait]
pub trait BrowserDriver: Send + Sync + std::fmt::Debug {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> ShopwalkResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ShopwalkResult<String>;

    /// Resolve every element matching the locator, in document order
    async fn find_all(&self, locator: &Locator) -> ShopwalkResult<Vec<ElementHandle>>;

    /// Read the element's current state
    async fn inspect(&self, element: &ElementHandle) -> ShopwalkResult<ElementSnapshot>;

    /// Read an attribute
    async fn attribute(&self, element: &ElementHandle, name: &str)
        -> ShopwalkResult<Option<String>>;

    /// Scroll the element to the centre of the viewport
    async fn scroll_into_view(&self, element: &ElementHandle) -> ShopwalkResult<()>;

    /// Native click at the element's centre point (subject to hit-testing)
    async fn click(&self, element: &ElementHandle) -> ShopwalkResult<()>;

    /// Programmatic `element.click()` bypassing hit-testing
    async fn js_click(&self, element: &ElementHandle) -> ShopwalkResult<()>;

    /// Move the pointer over the element
    async fn hover(&self, element: &ElementHandle) -> ShopwalkResult<()>;

    /// Clear an input
    async fn clear(&self, element: &ElementHandle) -> ShopwalkResult<()>;

    /// Type text into a focused input
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ShopwalkResult<()>;

    /// Press Enter on the element
    async fn press_enter(&self, element: &ElementHandle) -> ShopwalkResult<()>;

    /// Select a `<select>` option by its visible text
    async fn select_option(&self, element: &ElementHandle, label: &str) -> ShopwalkResult<()>;

    /// Set an input's value directly and fire `input`/`change`
    async fn set_value_js(&self, element: &ElementHandle, text: &str) -> ShopwalkResult<()>;

    /// Dispatch a bubbling DOM event (e.g. `mouseover`) on the element
    async fn dispatch_event(&self, element: &ElementHandle, event: &str) -> ShopwalkResult<()>;

    /// Dispatch synthetic `keydown`/`keyup` events for `key`; Enter also
    /// submits the enclosing form
    async fn dispatch_key(&self, element: &ElementHandle, key: &str) -> ShopwalkResult<()>;

    /// Evaluate a JavaScript expression in the page
    async fn execute_script(&self, script: &str) -> ShopwalkResult<serde_json::Value>;

    /// Capture a PNG screenshot of the viewport
    async fn screenshot(&self) -> ShopwalkResult<Vec<u8>>;

    /// Terminate the browser
    async fn quit(&self) -> ShopwalkResult<()>;
}

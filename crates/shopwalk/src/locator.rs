//! Locator abstraction for element selection.
//!
//! A [`Locator`] pairs a human name with a [`Selector`] (strategy + value).
//! Locators are declarative: they never hold an element, so every wait and
//! interaction re-resolves them against the live DOM. That is what keeps
//! stale handles from leaking past a single poll or attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    #[serde(rename = "xpath")]
    XPath(String),
    /// Element id attribute
    Id(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector filtered by contained text
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::XPath(selector.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Strategy tag used in messages and config files
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::TestId(_) => "test_id",
            Self::CssWithText { .. } => "css_with_text",
        }
    }

    /// Raw selector value
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Css(s) | Self::XPath(s) | Self::Id(s) | Self::TestId(s) => s.clone(),
            Self::CssWithText { css, text } => format!("{css} ~ {text:?}"),
        }
    }

    /// JavaScript expression evaluating to an `Array` of every matching element,
    /// in document order.
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()",
                js_string(s)
            ),
            Self::Id(id) => format!(
                "[document.getElementById({})].filter(Boolean)",
                js_string(id)
            ),
            Self::TestId(id) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_string(&format!("[data-testid=\"{id}\"]"))
            ),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_string(css),
                js_string(text)
            ),
        }
    }

    /// Static sanity check, run when locator sets are loaded
    pub fn validate(&self) -> Result<(), String> {
        let raw = match self {
            Self::Css(s) | Self::XPath(s) | Self::Id(s) | Self::TestId(s) => s,
            Self::CssWithText { css, text } => {
                if text.trim().is_empty() {
                    return Err("css_with_text needs a non-empty text filter".to_string());
                }
                css
            }
        };
        if raw.trim().is_empty() {
            return Err(format!("{} selector is empty", self.strategy()));
        }
        match self {
            Self::XPath(x) if !x.starts_with(['/', '(', '.']) => {
                Err(format!("xpath {x:?} must start with '/', '(' or '.'"))
            }
            Self::Css(c) | Self::CssWithText { css: c, .. } if c.starts_with('/') => {
                Err(format!("css {c:?} looks like an xpath"))
            }
            Self::Id(id) | Self::TestId(id) if id.contains(char::is_whitespace) => {
                Err(format!("{} {id:?} contains whitespace", self.strategy()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy(), self.value())
    }
}

/// Encode a Rust string as a JavaScript string literal
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// A named, immutable element description owned by a page object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Human-readable name used in logs and failures
    #[serde(default)]
    name: String,
    /// How to find the element
    #[serde(flatten)]
    selector: Selector,
}

impl Locator {
    /// Create a named locator
    #[must_use]
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        Self {
            name: name.into(),
            selector,
        }
    }

    /// Named CSS locator
    #[must_use]
    pub fn css(name: impl Into<String>, css: impl Into<String>) -> Self {
        Self::new(name, Selector::css(css))
    }

    /// Named XPath locator
    #[must_use]
    pub fn xpath(name: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self::new(name, Selector::xpath(xpath))
    }

    /// Named id locator
    #[must_use]
    pub fn id(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(name, Selector::id(id))
    }

    /// Locator name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Give an unnamed locator (e.g. one loaded from config) a name
    pub(crate) fn ensure_name(&mut self, name: &str) {
        if self.name.is_empty() {
            self.name = name.to_string();
        }
    }

    /// JavaScript expression for every match
    #[must_use]
    pub fn to_query_all(&self) -> String {
        self.selector.to_query_all()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.selector)
    }
}

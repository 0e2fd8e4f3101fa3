//! Safe interaction layer.
//!
//! Every action resolves its element through a hard wait, scrolls it to the
//! viewport centre and runs the native action. Overlays and re-renders
//! ([`ShopwalkError::is_transient`]) are retried with a fresh element up to
//! [`RetryPolicy::attempts`] times; after that exactly one DOM-level
//! fallback runs. Anything else propagates immediately.

use crate::driver::{BrowserDriver, ElementHandle};
use crate::locator::Locator;
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::wait::{Condition, Waiter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How often a native action is retried before falling back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Primary attempts in total
    pub attempts: u32,
    /// Pause between attempts in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Set attempts (at least one)
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Set backoff
    #[must_use]
    pub const fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    /// Backoff as Duration
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// A user action the interaction layer knows how to make robust
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Native click, falling back to `element.click()`
    Click,
    /// Clear and type, falling back to setting the value from script
    Type(String),
    /// Empty an input, falling back to setting an empty value from script
    Clear,
    /// Native Enter key, falling back to synthetic key events
    PressEnter,
    /// Pointer hover, falling back to a dispatched `mouseover`
    Hover,
    /// Choose a `<select>` option by label, falling back to setting the value
    Select(String),
}

impl Action {
    fn readiness(&self) -> Condition {
        match self {
            Self::Click | Self::Select(_) => Condition::Clickable,
            Self::Type(_) | Self::Clear | Self::PressEnter | Self::Hover => Condition::Visible,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::Type(_) => write!(f, "type"),
            Self::Clear => write!(f, "clear"),
            Self::PressEnter => write!(f, "press enter"),
            Self::Hover => write!(f, "hover"),
            Self::Select(label) => write!(f, "select {label:?}"),
        }
    }
}

/// Which match of a locator an action lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// First match ready for the action
    First,
    /// Position among the matches ready for the action
    Nth(usize),
}

/// Runs actions with waits, retries and one fallback
#[derive(Debug, Clone, Copy)]
pub struct Interactor<'d> {
    driver: &'d dyn BrowserDriver,
    waiter: Waiter<'d>,
    policy: RetryPolicy,
}

impl<'d> Interactor<'d> {
    /// Create an interactor
    #[must_use]
    pub fn new(driver: &'d dyn BrowserDriver, waiter: Waiter<'d>, policy: RetryPolicy) -> Self {
        Self {
            driver,
            waiter,
            policy,
        }
    }

    /// Safe click
    pub async fn click(&self, locator: &Locator) -> ShopwalkResult<()> {
        self.perform(locator, &Action::Click).await
    }

    /// Safe typing (replaces the current value)
    pub async fn type_text(&self, locator: &Locator, text: &str) -> ShopwalkResult<()> {
        self.perform(locator, &Action::Type(text.to_string())).await
    }

    /// Safe clear of an input
    pub async fn clear(&self, locator: &Locator) -> ShopwalkResult<()> {
        self.perform(locator, &Action::Clear).await
    }

    /// Safe Enter key press
    pub async fn press_enter(&self, locator: &Locator) -> ShopwalkResult<()> {
        self.perform(locator, &Action::PressEnter).await
    }

    /// Safe hover
    pub async fn hover(&self, locator: &Locator) -> ShopwalkResult<()> {
        self.perform(locator, &Action::Hover).await
    }

    /// Safe option selection
    pub async fn select(&self, locator: &Locator, label: &str) -> ShopwalkResult<()> {
        self.perform(locator, &Action::Select(label.to_string())).await
    }

    /// Click the `index`-th clickable match of a list locator (sizes, tiles).
    ///
    /// The list is resolved again before every attempt, so a re-rendered
    /// item is clicked under its new handle. Positions count only the
    /// matches that are clickable at that moment.
    pub async fn click_nth(&self, locator: &Locator, index: usize) -> ShopwalkResult<()> {
        self.run(locator, Target::Nth(index), &Action::Click).await
    }

    /// Run an action against whatever the locator resolves to
    pub async fn perform(&self, locator: &Locator, action: &Action) -> ShopwalkResult<()> {
        self.run(locator, Target::First, action).await
    }

    async fn run(&self, locator: &Locator, target: Target, action: &Action) -> ShopwalkResult<()> {
        let attempts = self.policy.attempts.max(1);
        let mut first_failure: Option<ShopwalkError> = None;

        for attempt in 1..=attempts {
            let el = self.resolve(locator, target, action).await?;
            match self.primary(&el, action).await {
                Ok(()) => {
                    tracing::debug!(%locator, %action, attempt, "done");
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(%locator, %action, attempt, error = %e, "retrying");
                    let _ = first_failure.get_or_insert(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff()).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let el = match target {
            Target::First => self.waiter.until(locator, &Condition::Present).await?,
            Target::Nth(_) => self.resolve(locator, target, action).await?,
        };
        self.run_fallback(&el, action, first_failure).await
    }

    async fn resolve(
        &self,
        locator: &Locator,
        target: Target,
        action: &Action,
    ) -> ShopwalkResult<ElementHandle> {
        let readiness = action.readiness();
        if readiness == Condition::Clickable {
            let _ = self.waiter.until(locator, &Condition::Visible).await?;
        }
        match target {
            Target::First => self.waiter.until(locator, &readiness).await,
            Target::Nth(index) => {
                let ready = self.waiter.until_all(locator, &readiness).await?;
                let count = ready.len();
                ready
                    .into_iter()
                    .nth(index)
                    .ok_or_else(|| ShopwalkError::ElementNotFound {
                        locator: format!("{locator} #{index} of {count}"),
                    })
            }
        }
    }

    async fn primary(&self, el: &ElementHandle, action: &Action) -> ShopwalkResult<()> {
        self.driver.scroll_into_view(el).await?;
        match action {
            Action::Click => self.driver.click(el).await,
            Action::Type(text) => {
                self.driver.clear(el).await?;
                self.driver.send_keys(el, text).await
            }
            Action::Clear => self.driver.clear(el).await,
            Action::PressEnter => self.driver.press_enter(el).await,
            Action::Hover => self.driver.hover(el).await,
            Action::Select(label) => self.driver.select_option(el, label).await,
        }
    }

    async fn fallback(&self, el: &ElementHandle, action: &Action) -> ShopwalkResult<()> {
        match action {
            Action::Click => self.driver.js_click(el).await,
            Action::Type(text) | Action::Select(text) => self.driver.set_value_js(el, text).await,
            Action::Clear => self.driver.set_value_js(el, "").await,
            Action::PressEnter => self.driver.dispatch_key(el, "Enter").await,
            Action::Hover => self.driver.dispatch_event(el, "mouseover").await,
        }
    }

    async fn run_fallback(
        &self,
        el: &ElementHandle,
        action: &Action,
        first_failure: Option<ShopwalkError>,
    ) -> ShopwalkResult<()> {
        tracing::warn!(element = %el, %action, "native attempts exhausted, using fallback");
        match self.fallback(el, action).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(element = %el, %action, error = %e, "fallback failed");
                Err(first_failure.unwrap_or(e))
            }
        }
    }
}

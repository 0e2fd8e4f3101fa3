//! Wait primitives.
//!
//! Every wait polls a fresh DOM query until its [`Condition`] holds or its
//! budget runs out. The first check runs immediately, later checks run every
//! `poll_interval`, and the final sleep is clamped to the remaining budget,
//! so a hard wait fails no earlier than its timeout and no later than one
//! poll after it.
//!
//! Hard waits ([`Waiter::until`]) fail with
//! [`ShopwalkError::TimeoutExceeded`]; soft waits ([`Waiter::soft`]) report
//! [`Presence::Absent`] instead. A stale handle seen mid-check only means
//! "not yet".

use crate::driver::{BrowserDriver, ElementHandle};
use crate::locator::Locator;
use crate::result::{ShopwalkError, ShopwalkResult};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default timeout for wait operations (15 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 15_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// CONDITION
// =============================================================================

/// Predicate evaluated against the elements a locator resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one match exists
    Present,
    /// Displayed
    Visible,
    /// Displayed and enabled
    Clickable,
    /// Trimmed text equals the value
    TextEquals(String),
    /// Text contains the value
    TextContains(String),
    /// Attribute has exactly the value
    AttributeEquals {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// At least `n` matches exist
    CountAtLeast(usize),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Visible => write!(f, "visible"),
            Self::Clickable => write!(f, "clickable"),
            Self::TextEquals(t) => write!(f, "text == {t:?}"),
            Self::TextContains(t) => write!(f, "text containing {t:?}"),
            Self::AttributeEquals { name, value } => write!(f, "[{name}] == {value:?}"),
            Self::CountAtLeast(n) => write!(f, "at least {n} matches"),
        }
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Outcome of a soft wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The condition held for this element
    Found(ElementHandle),
    /// Timed out; the element is treated as absent
    Absent,
}

impl Presence {
    /// Whether the element was found
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert into an `Option`
    #[must_use]
    pub fn into_option(self) -> Option<ElementHandle> {
        match self {
            Self::Found(el) => Some(el),
            Self::Absent => None,
        }
    }
}

enum Polled<T> {
    Ready(T),
    TimedOut(Duration),
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls a driver until a condition holds
#[derive(Debug, Clone, Copy)]
pub struct Waiter<'d> {
    driver: &'d dyn BrowserDriver,
    options: WaitOptions,
}

impl<'d> Waiter<'d> {
    /// Create a waiter over a driver
    #[must_use]
    pub fn new(driver: &'d dyn BrowserDriver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// Same waiter with a different budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    /// Hard wait for the first element satisfying the condition
    pub async fn until(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> ShopwalkResult<ElementHandle> {
        match self.first_match(locator, condition).await? {
            Polled::Ready(el) => Ok(el),
            Polled::TimedOut(elapsed) => Err(timeout_error(locator, condition, elapsed)),
        }
    }

    /// Hard wait for every match satisfying the condition (at least one)
    pub async fn until_all(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> ShopwalkResult<Vec<ElementHandle>> {
        let polled = self
            .poll(|| async move {
                let matches = self.matching(locator, condition).await?;
                Ok((!matches.is_empty()).then_some(matches))
            })
            .await?;
        match polled {
            Polled::Ready(all) => Ok(all),
            Polled::TimedOut(elapsed) => Err(timeout_error(locator, condition, elapsed)),
        }
    }

    /// Soft wait: a timeout means [`Presence::Absent`]
    pub async fn soft(&self, locator: &Locator, condition: &Condition) -> ShopwalkResult<Presence> {
        match self.first_match(locator, condition).await? {
            Polled::Ready(el) => Ok(Presence::Found(el)),
            Polled::TimedOut(elapsed) => {
                tracing::debug!(%locator, %condition, ?elapsed, "treating as absent");
                Ok(Presence::Absent)
            }
        }
    }

    /// Wait until no displayed element matches
    pub async fn until_gone(&self, locator: &Locator) -> ShopwalkResult<()> {
        let polled = self
            .poll(|| async move {
                let visible = self.matching(locator, &Condition::Visible).await?;
                Ok(visible.is_empty().then_some(()))
            })
            .await?;
        match polled {
            Polled::Ready(()) => Ok(()),
            Polled::TimedOut(elapsed) => Err(ShopwalkError::TimeoutExceeded {
                locator: locator.to_string(),
                condition: "gone".to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            }),
        }
    }

    /// Wait for `document.readyState == "complete"`
    pub async fn page_loaded(&self) -> ShopwalkResult<()> {
        self.until_fn("document", || async move {
            let state = self.driver.execute_script("document.readyState").await?;
            Ok(state.as_str() == Some("complete"))
        })
        .await
    }

    /// Wait for the trimmed text of the first displayed match
    pub async fn visible_text(&self, locator: &Locator) -> ShopwalkResult<String> {
        let polled = self
            .poll(|| async move {
                for el in self.driver.find_all(locator).await? {
                    match self.driver.inspect(&el).await {
                        Ok(snap) if snap.displayed => {
                            return Ok(Some(snap.text.trim().to_string()));
                        }
                        Ok(_) => {}
                        Err(e) if e.is_stale() => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(None)
            })
            .await?;
        match polled {
            Polled::Ready(text) => Ok(text),
            Polled::TimedOut(elapsed) => {
                Err(timeout_error(locator, &Condition::Visible, elapsed))
            }
        }
    }

    /// Wait for the first match carrying the attribute and return its value
    pub async fn attribute_value(&self, locator: &Locator, name: &str) -> ShopwalkResult<String> {
        let polled = self
            .poll(|| async move {
                for el in self.driver.find_all(locator).await? {
                    match self.driver.attribute(&el, name).await {
                        Ok(Some(value)) => return Ok(Some(value)),
                        Ok(None) => {}
                        Err(e) if e.is_stale() => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(None)
            })
            .await?;
        match polled {
            Polled::Ready(value) => Ok(value),
            Polled::TimedOut(elapsed) => Err(ShopwalkError::TimeoutExceeded {
                locator: locator.to_string(),
                condition: format!("[{name}] present"),
                elapsed_ms: elapsed.as_millis() as u64,
            }),
        }
    }

    /// Poll an arbitrary async predicate
    pub async fn until_fn<F, Fut>(&self, description: &str, mut predicate: F) -> ShopwalkResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ShopwalkResult<bool>>,
    {
        let polled = self
            .poll(|| {
                let fut = predicate();
                async move {
                    match fut.await {
                        Ok(done) => Ok(done.then_some(())),
                        Err(e) if e.is_stale() => Ok(None),
                        Err(e) => Err(e),
                    }
                }
            })
            .await?;
        match polled {
            Polled::Ready(()) => Ok(()),
            Polled::TimedOut(elapsed) => Err(ShopwalkError::TimeoutExceeded {
                locator: description.to_string(),
                condition: "ready".to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            }),
        }
    }

    async fn first_match(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> ShopwalkResult<Polled<ElementHandle>> {
        self.poll(|| async move {
            Ok(self
                .matching(locator, condition)
                .await?
                .into_iter()
                .next())
        })
        .await
    }

    /// Core loop shared by every wait
    async fn poll<T, F, Fut>(&self, mut check: F) -> ShopwalkResult<Polled<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ShopwalkResult<Option<T>>>,
    {
        let start = Instant::now();
        let timeout = self.options.timeout();
        let poll_interval = self.options.poll_interval();
        loop {
            if let Some(value) = check().await? {
                return Ok(Polled::Ready(value));
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(Polled::TimedOut(elapsed));
            }
            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// One check: every current match that satisfies the condition
    async fn matching(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> ShopwalkResult<Vec<ElementHandle>> {
        let found = self.driver.find_all(locator).await?;
        match condition {
            Condition::Present => return Ok(found),
            Condition::CountAtLeast(n) => {
                return Ok(if found.len() >= *n { found } else { Vec::new() });
            }
            _ => {}
        }
        let mut out = Vec::with_capacity(found.len());
        for el in found {
            match self.holds(&el, condition).await {
                Ok(true) => out.push(el),
                Ok(false) => {}
                Err(e) if e.is_stale() => {
                    tracing::trace!(element = %el, "stale during check");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn holds(&self, el: &ElementHandle, condition: &Condition) -> ShopwalkResult<bool> {
        Ok(match condition {
            Condition::Present | Condition::CountAtLeast(_) => true,
            Condition::Visible => self.driver.inspect(el).await?.displayed,
            Condition::Clickable => self.driver.inspect(el).await?.is_clickable(),
            Condition::TextEquals(t) => self.driver.inspect(el).await?.text.trim() == t,
            Condition::TextContains(t) => self.driver.inspect(el).await?.text.contains(t.as_str()),
            Condition::AttributeEquals { name, value } => {
                self.driver.attribute(el, name).await?.as_deref() == Some(value.as_str())
            }
        })
    }
}

fn timeout_error(locator: &Locator, condition: &Condition, elapsed: Duration) -> ShopwalkError {
    ShopwalkError::TimeoutExceeded {
        locator: locator.to_string(),
        condition: condition.to_string(),
        elapsed_ms: elapsed.as_millis() as u64,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{DomEffect, MockDriver, MockElement};
    use std::sync::Arc;

    fn price() -> Locator {
        Locator::css("price", ".price__amount")
    }

    fn opts() -> WaitOptions {
        WaitOptions::new().with_timeout(1_000).with_poll_interval(100)
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(Condition::Visible.to_string(), "visible");
            assert_eq!(Condition::CountAtLeast(2).to_string(), "at least 2 matches");
            assert_eq!(
                Condition::TextEquals("2".to_string()).to_string(),
                "text == \"2\""
            );
        }

        #[test]
        fn test_wait_options_builders() {
            let o = WaitOptions::new().with_timeout(500).with_poll_interval(50);
            assert_eq!(o.timeout(), Duration::from_millis(500));
            assert_eq!(o.poll_interval(), Duration::from_millis(50));
            assert_eq!(WaitOptions::default().timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
        }
    }

    mod timing_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_returns_at_first_poll_after_visible() {
            let driver = MockDriver::new()
                .with(MockElement::new(&price()).appears_after(Duration::from_millis(350)));
            let start = Instant::now();
            let el = Waiter::new(&driver, opts())
                .until(&price(), &Condition::Visible)
                .await
                .unwrap();
            let elapsed = start.elapsed();
            assert!(el.id.starts_with("mock-"));
            assert!(elapsed >= Duration::from_millis(350));
            assert!(elapsed <= Duration::from_millis(450));
        }

        #[tokio::test(start_paused = true)]
        async fn test_immediate_success_does_not_sleep() {
            let driver = MockDriver::new().with(MockElement::new(&price()));
            let start = Instant::now();
            Waiter::new(&driver, opts())
                .until(&price(), &Condition::Clickable)
                .await
                .unwrap();
            assert_eq!(start.elapsed(), Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_timeout_bounds() {
            let driver = MockDriver::new().with(MockElement::new(&price()).hidden());
            let waiter = Waiter::new(&driver, opts().with_poll_interval(300));
            let start = Instant::now();
            let err = waiter.until(&price(), &Condition::Visible).await.unwrap_err();
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(1_000));
            assert!(elapsed <= Duration::from_millis(1_300));
            match err {
                ShopwalkError::TimeoutExceeded {
                    locator,
                    condition,
                    elapsed_ms,
                } => {
                    assert!(locator.contains("price"));
                    assert_eq!(condition, "visible");
                    assert!(elapsed_ms >= 1_000);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_with_timeout_overrides_budget() {
            let driver = MockDriver::new();
            let waiter = Waiter::new(&driver, opts()).with_timeout(Duration::from_millis(200));
            let start = Instant::now();
            assert!(waiter.until(&price(), &Condition::Present).await.is_err());
            assert!(start.elapsed() <= Duration::from_millis(300));
        }
    }

    mod soft_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_soft_absent_on_timeout() {
            let driver = MockDriver::new();
            let presence = Waiter::new(&driver, opts())
                .soft(&price(), &Condition::Visible)
                .await
                .unwrap();
            assert_eq!(presence, Presence::Absent);
            assert!(presence.into_option().is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_soft_found() {
            let driver = MockDriver::new().with(MockElement::new(&price()).text("89,95 TL"));
            let presence = Waiter::new(&driver, opts())
                .soft(&price(), &Condition::TextContains("TL".to_string()))
                .await
                .unwrap();
            assert!(presence.is_found());
        }

        #[tokio::test(start_paused = true)]
        async fn test_soft_propagates_dead_session() {
            let driver = MockDriver::new();
            driver.quit().await.unwrap();
            let result = Waiter::new(&driver, opts())
                .soft(&price(), &Condition::Visible)
                .await;
            assert!(matches!(result, Err(ShopwalkError::Driver { .. })));
        }
    }

    mod condition_eval_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_text_equals_trims() {
            let driver = MockDriver::new().with(MockElement::new(&price()).text("  2 "));
            Waiter::new(&driver, opts())
                .until(&price(), &Condition::TextEquals("2".to_string()))
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_attribute_equals() {
            let driver =
                MockDriver::new().with(MockElement::new(&price()).attr("aria-expanded", "true"));
            let cond = Condition::AttributeEquals {
                name: "aria-expanded".to_string(),
                value: "true".to_string(),
            };
            Waiter::new(&driver, opts()).until(&price(), &cond).await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_count_at_least() {
            let links = Locator::css("products", "a.product-link");
            let driver = MockDriver::new()
                .with(MockElement::new(&links))
                .with(MockElement::new(&links));
            let waiter = Waiter::new(&driver, opts());
            let all = waiter
                .until_all(&links, &Condition::CountAtLeast(2))
                .await
                .unwrap();
            assert_eq!(all.len(), 2);
            assert!(waiter
                .until(&links, &Condition::CountAtLeast(3))
                .await
                .is_err());
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_all_filters_hidden() {
            let links = Locator::css("products", "a.product-link");
            let driver = MockDriver::new()
                .with(MockElement::new(&links))
                .with(MockElement::new(&links).hidden());
            let all = Waiter::new(&driver, opts())
                .until_all(&links, &Condition::Visible)
                .await
                .unwrap();
            assert_eq!(all.len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_visible_text() {
            let driver = MockDriver::new()
                .with(MockElement::new(&price()).text("hidden").hidden())
                .with(MockElement::new(&price()).text(" 1.690,00 TL "));
            let text = Waiter::new(&driver, opts()).visible_text(&price()).await.unwrap();
            assert_eq!(text, "1.690,00 TL");
        }

        #[tokio::test(start_paused = true)]
        async fn test_attribute_value_waits_for_attribute() {
            let qty = Locator::css("quantity", "select.quantity");
            let driver = MockDriver::new()
                .with(MockElement::new(&qty).options(["1", "2"]).text("2"));
            let waiter = Waiter::new(&driver, opts());
            assert_eq!(waiter.attribute_value(&qty, "value").await.unwrap(), "2");
            let err = waiter.attribute_value(&qty, "data-max").await.unwrap_err();
            assert!(err.to_string().contains("[data-max] present"));
        }
    }

    mod misc_wait_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_until_gone() {
            let spinner = Locator::css("spinner", ".spinner");
            let driver = Arc::new(MockDriver::new().with(MockElement::new(&spinner)));
            let background = Arc::clone(&driver);
            let sel = spinner.selector().clone();
            let _task = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(250)).await;
                background.apply(vec![DomEffect::Hide(sel)]);
            });
            let start = Instant::now();
            Waiter::new(driver.as_ref(), opts())
                .until_gone(&spinner)
                .await
                .unwrap();
            assert!(start.elapsed() >= Duration::from_millis(250));
            assert!(start.elapsed() <= Duration::from_millis(350));
        }

        #[tokio::test(start_paused = true)]
        async fn test_page_loaded() {
            let driver = MockDriver::new();
            Waiter::new(&driver, opts()).page_loaded().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_fn_treats_stale_as_not_yet() {
            let driver = MockDriver::new();
            let mut calls = 0;
            Waiter::new(&driver, opts())
                .until_fn("flaky", || {
                    calls += 1;
                    let n = calls;
                    async move {
                        if n < 3 {
                            Err(ShopwalkError::StaleReference {
                                element: "mock-1".to_string(),
                            })
                        } else {
                            Ok(true)
                        }
                    }
                })
                .await
                .unwrap();
            assert_eq!(calls, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_fn_propagates_hard_errors() {
            let driver = MockDriver::new();
            let result = Waiter::new(&driver, opts())
                .until_fn("broken", || async { Err(ShopwalkError::driver("gone")) })
                .await;
            assert!(matches!(result, Err(ShopwalkError::Driver { .. })));
        }
    }
}

//! Driver lifecycle.
//!
//! A [`SessionManager`] owns at most one live [`Session`] at a time. Page
//! objects borrow the session, so none of them can outlive it, and
//! [`SessionManager::release`] is the only place a browser is shut down.

use crate::driver::BrowserDriver;
use crate::interact::{Interactor, RetryPolicy};
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::wait::{WaitOptions, Waiter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound for [`Session::settle`]
pub const MAX_SETTLE_MS: u64 = 2_000;

/// User agent of a common desktop Chrome
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Fixed browser settings every session launches with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionProfile {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub window_width: u32,
    /// Viewport height
    pub window_height: u32,
    /// Browser UI and `Accept-Language` locale
    pub locale: String,
    /// User agent override
    pub user_agent: String,
    /// Private browsing
    pub incognito: bool,
    /// Hide the automation banner and `navigator.webdriver`
    pub hide_automation: bool,
    /// Disable the Chrome sandbox (containers)
    pub no_sandbox: bool,
    /// Extra command-line switches
    pub extra_args: Vec<String>,
    /// Directory under which per-session profiles are created
    pub profile_root: Option<PathBuf>,
    /// Per-session user-data directory, set by the manager
    #[serde(skip)]
    pub user_data_dir: Option<PathBuf>,
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            locale: "tr-TR".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            incognito: true,
            hide_automation: true,
            no_sandbox: true,
            extra_args: Vec::new(),
            profile_root: None,
            user_data_dir: None,
        }
    }
}

impl SessionProfile {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport size
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Copy of this profile bound to a fresh user-data directory
    #[must_use]
    pub fn for_session(&self, id: Uuid) -> Self {
        let root = self.profile_root.clone().unwrap_or_else(std::env::temp_dir);
        let mut profile = self.clone();
        profile.user_data_dir = Some(root.join(format!("shopwalk-profile-{id}")));
        profile
    }

    /// Command-line switches beyond what the launcher sets itself
    #[must_use]
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--lang={}", self.locale),
            format!("--user-agent={}", self.user_agent),
            "--disable-infobars".to_string(),
            "--disable-extensions".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.incognito {
            args.push("--incognito".to_string());
        }
        if self.hide_automation {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Wait budgets shared by every page object of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Hard waits
    pub default_ms: u64,
    /// Slow transitions (login, search results)
    pub long_ms: u64,
    /// Soft waits for optional elements
    pub optional_ms: u64,
    /// Poll interval
    pub poll_ms: u64,
    /// Settle delay after typing into the search box
    pub settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            default_ms: 15_000,
            long_ms: 30_000,
            optional_ms: 10_000,
            poll_ms: 250,
            settle_ms: 1_500,
        }
    }
}

impl Timings {
    fn options(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout_ms)
            .with_poll_interval(self.poll_ms)
    }
}

/// Creates browsers on demand
#[async_trait]
pub trait DriverFactory: Send + Sync + std::fmt::Debug {
    /// Launch a browser configured with `profile`
    async fn launch(&self, profile: &SessionProfile) -> ShopwalkResult<Arc<dyn BrowserDriver>>;
}

/// A live browser plus the settings page objects need
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    driver: Arc<dyn BrowserDriver>,
    timings: Timings,
    retry: RetryPolicy,
}

impl Session {
    /// Wrap a driver
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>, timings: Timings, retry: RetryPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver,
            timings,
            retry,
        }
    }

    /// Session id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Wait budgets
    #[must_use]
    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Waiter with the default budget
    #[must_use]
    pub fn waiter(&self) -> Waiter<'_> {
        Waiter::new(self.driver(), self.timings.options(self.timings.default_ms))
    }

    /// Waiter for slow transitions
    #[must_use]
    pub fn long_waiter(&self) -> Waiter<'_> {
        Waiter::new(self.driver(), self.timings.options(self.timings.long_ms))
    }

    /// Waiter for optional elements
    #[must_use]
    pub fn optional_waiter(&self) -> Waiter<'_> {
        Waiter::new(self.driver(), self.timings.options(self.timings.optional_ms))
    }

    /// Interaction layer over the default waiter
    #[must_use]
    pub fn interactor(&self) -> Interactor<'_> {
        Interactor::new(self.driver(), self.waiter(), self.retry)
    }

    /// Navigate and wait for the document to finish loading
    pub async fn navigate(&self, url: &str) -> ShopwalkResult<()> {
        tracing::info!(session = %self.id, url, "navigate");
        self.driver.navigate(url).await?;
        self.long_waiter().page_loaded().await
    }

    /// Current URL
    pub async fn current_url(&self) -> ShopwalkResult<String> {
        self.driver.current_url().await
    }

    /// Fixed pause, capped at [`MAX_SETTLE_MS`].
    ///
    /// Only used after typing into the search box: suggestions re-render
    /// asynchronously and expose no DOM signal to wait on.
    pub async fn settle(&self) {
        let ms = self.timings.settle_ms.min(MAX_SETTLE_MS);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// PNG of the viewport
    pub async fn screenshot(&self) -> ShopwalkResult<Vec<u8>> {
        self.driver.screenshot().await
    }
}

/// Hands out one [`Session`] at a time
#[derive(Debug)]
pub struct SessionManager {
    factory: Arc<dyn DriverFactory>,
    profile: SessionProfile,
    timings: Timings,
    retry: RetryPolicy,
    current: Option<(Session, SessionProfile)>,
}

impl SessionManager {
    /// Create a manager; nothing launches until [`acquire`](Self::acquire)
    #[must_use]
    pub fn new(factory: Arc<dyn DriverFactory>, profile: SessionProfile) -> Self {
        Self {
            factory,
            profile,
            timings: Timings::default(),
            retry: RetryPolicy::default(),
            current: None,
        }
    }

    /// Set wait budgets
    #[must_use]
    pub const fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Set retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether a session is live
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// The live session, if any, without launching
    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref().map(|(session, _)| session)
    }

    /// The live session, launching one if needed
    pub async fn acquire(&mut self) -> ShopwalkResult<&Session> {
        if self.current.is_none() {
            let id = Uuid::new_v4();
            let profile = self.profile.for_session(id);
            tracing::info!(
                user_data_dir = ?profile.user_data_dir,
                headless = profile.headless,
                "launching browser"
            );
            let driver = self.factory.launch(&profile).await?;
            let mut session = Session::new(driver, self.timings, self.retry);
            session.id = id;
            self.current = Some((session, profile));
        }
        match &self.current {
            Some((session, _)) => Ok(session),
            None => Err(ShopwalkError::driver("session vanished during acquire")),
        }
    }

    /// Quit the browser and forget the session. No-op when none is live.
    pub async fn release(&mut self) -> ShopwalkResult<()> {
        let Some((session, profile)) = self.current.take() else {
            return Ok(());
        };
        tracing::info!(session = %session.id, "releasing browser");
        let quit = session.driver.quit().await;
        if let Some(dir) = profile.user_data_dir {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(dir = %dir.display(), error = %e, "could not remove profile");
                }
            }
        }
        quit
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockDriverFactory};

    mod profile_tests {
        use super::*;

        #[test]
        fn test_defaults_match_storefront_locale() {
            let p = SessionProfile::default();
            assert_eq!(p.locale, "tr-TR");
            assert!(p.incognito);
            assert!(p.user_agent.contains("Chrome/124"));
        }

        #[test]
        fn test_chrome_args() {
            let args = SessionProfile::default().chrome_args();
            assert!(args.contains(&"--lang=tr-TR".to_string()));
            assert!(args.contains(&"--incognito".to_string()));
            assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
            assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla")));
        }

        #[test]
        fn test_fresh_user_data_dir_per_session() {
            let base = SessionProfile {
                profile_root: Some(PathBuf::from("/var/tmp")),
                ..SessionProfile::default()
            };
            let a = base.for_session(Uuid::new_v4());
            let b = base.for_session(Uuid::new_v4());
            let dir = a.user_data_dir.clone().unwrap();
            assert!(dir.starts_with("/var/tmp"));
            assert!(dir
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("shopwalk-profile-"));
            assert_ne!(a.user_data_dir, b.user_data_dir);
        }

        #[test]
        fn test_timings_partial_yaml() {
            let t: Timings = serde_yaml_ng::from_str("default_ms: 5000").unwrap();
            assert_eq!(t.default_ms, 5_000);
            assert_eq!(t.long_ms, 30_000);
        }
    }

    mod manager_tests {
        use super::*;

        fn manager() -> (Arc<MockDriverFactory>, SessionManager) {
            let factory = Arc::new(MockDriverFactory::new(MockDriver::new));
            let manager = SessionManager::new(factory.clone(), SessionProfile::default());
            (factory, manager)
        }

        #[tokio::test]
        async fn test_acquire_is_lazy_and_reuses() {
            let (factory, mut manager) = manager();
            assert!(!manager.is_active());
            let first = manager.acquire().await.unwrap().id();
            let second = manager.acquire().await.unwrap().id();
            assert_eq!(first, second);
            assert_eq!(factory.launched().len(), 1);
        }

        #[tokio::test]
        async fn test_release_quits_and_next_acquire_relaunches() {
            let (factory, mut manager) = manager();
            let first = manager.acquire().await.unwrap().id();
            manager.release().await.unwrap();
            assert!(!manager.is_active());
            assert!(factory.launched()[0].is_quit());

            let second = manager.acquire().await.unwrap().id();
            assert_ne!(first, second);
            assert_eq!(factory.launched().len(), 2);
            assert!(!factory.launched()[1].is_quit());
        }

        #[tokio::test]
        async fn test_release_without_session_is_noop() {
            let (_, mut manager) = manager();
            manager.release().await.unwrap();
        }

        #[tokio::test]
        async fn test_each_session_gets_its_own_profile_dir() {
            let (factory, mut manager) = manager();
            let _ = manager.acquire().await.unwrap();
            manager.release().await.unwrap();
            let _ = manager.acquire().await.unwrap();
            let profiles = factory.profiles();
            assert_ne!(profiles[0].user_data_dir, profiles[1].user_data_dir);
        }

        #[tokio::test(start_paused = true)]
        async fn test_settle_is_capped() {
            let (_, manager) = manager();
            let mut manager = manager.with_timings(Timings {
                settle_ms: 60_000,
                ..Timings::default()
            });
            let session = manager.acquire().await.unwrap();
            let start = tokio::time::Instant::now();
            session.settle().await;
            assert_eq!(start.elapsed(), Duration::from_millis(MAX_SETTLE_MS));
        }

        #[tokio::test]
        async fn test_navigate_waits_for_load() {
            let (factory, mut manager) = manager();
            let session = manager.acquire().await.unwrap();
            session.navigate("https://www.zara.com/tr/").await.unwrap();
            assert_eq!(
                session.current_url().await.unwrap(),
                "https://www.zara.com/tr/"
            );
            assert!(factory.last().unwrap().was_called("navigate:"));
        }
    }
}

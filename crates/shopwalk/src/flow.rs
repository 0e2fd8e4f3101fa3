//! User journeys built from page objects.
//!
//! A [`Flow`] is an ordered list of page-object calls and assertions. Each
//! call runs through [`FlowContext::step`], which records the steps that
//! completed so a failure can be reported against the last good one.
//!
//! [`FlowRunner`] owns the flow boundary:
//!
//! ```text
//!   build flow ──► acquire session ──► open storefront ──► cookies ──► check
//!       │                                                                │
//!       │ DataSourceMissing                                   flow.run() │
//!       ▼                                                                ▼
//!   FlowOutcome::fail              on error: log last step + screenshot
//!   (no browser launched)          always:   release session
//! ```

use crate::artifact::{save_screenshot, write_snapshot};
use crate::catalog::LocatorCatalog;
use crate::config::{FlowOptions, SuiteConfig};
use crate::harness::FlowOutcome;
use crate::keywords::KeywordPair;
use crate::locator::Locator;
use crate::pages::{CartPage, Credentials, HomePage, LoginPage, LogoutPage, ProductPage, SearchPage};
use crate::price::same_price;
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::session::{DriverFactory, Session, SessionManager};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

// =============================================================================
// CONTEXT
// =============================================================================

/// Step log of a running flow
#[derive(Debug, Clone)]
pub struct FlowContext {
    flow: String,
    steps: Vec<String>,
}

impl FlowContext {
    /// Start an empty log
    #[must_use]
    pub fn new(flow: impl Into<String>) -> Self {
        Self {
            flow: flow.into(),
            steps: Vec::new(),
        }
    }

    /// Run one step, recording it when it succeeds
    pub async fn step<T, F>(&mut self, name: &str, step: F) -> ShopwalkResult<T>
    where
        F: Future<Output = ShopwalkResult<T>>,
    {
        let span = tracing::info_span!("step", flow = %self.flow, step = name);
        let started = Instant::now();
        let result = step.instrument(span).await;
        match &result {
            Ok(_) => {
                tracing::info!(
                    flow = %self.flow,
                    step = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "step done"
                );
                self.steps.push(name.to_string());
            }
            Err(e) => tracing::warn!(flow = %self.flow, step = name, error = %e, "step failed"),
        }
        result
    }

    /// Last step that completed
    #[must_use]
    pub fn last_step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// Completed steps, in order
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Consume into the completed steps
    #[must_use]
    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }
}

// =============================================================================
// FLOWS
// =============================================================================

/// One user journey
#[async_trait]
pub trait Flow: Send + Sync + fmt::Debug {
    /// Flow name, used for logs and screenshot files
    fn name(&self) -> &'static str;

    /// Run against a session already on the storefront home page
    async fn run(&self, session: &Session, ctx: &mut FlowContext) -> ShopwalkResult<()>;
}

/// The flows the suite knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Log in, verify, optionally log out
    Login,
    /// Search, add to cart, change quantity, empty the cart
    Shopping,
}

impl FlowKind {
    /// Every flow kind
    pub const ALL: [Self; 2] = [Self::Login, Self::Shopping];

    /// Name used on the command line
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Shopping => "shopping",
        }
    }

    /// Resolve the flow's inputs. Missing data fails here, before any
    /// browser is launched.
    pub fn build(self, config: &SuiteConfig) -> ShopwalkResult<Box<dyn Flow>> {
        Ok(match self {
            Self::Login => Box::new(LoginFlow::from_config(config)?),
            Self::Shopping => Box::new(ShoppingFlow::from_config(config)?),
        })
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FlowKind {
    type Err = ShopwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ShopwalkError::config(format!("unknown flow {s:?}")))
    }
}

/// Header login, form submit, then check the account menu
async fn sign_in(
    session: &Session,
    locators: &LocatorCatalog,
    credentials: &Credentials,
    ctx: &mut FlowContext,
) -> ShopwalkResult<()> {
    let home = HomePage::new(session, &locators.home);
    let login = LoginPage::new(session, &locators.login);
    ctx.step("open login", home.open_login()).await?;
    ctx.step("open login form", login.open_login_form()).await?;
    ctx.step("submit credentials", login.login(credentials)).await?;
    ctx.step("verify login", async {
        if home.is_logged_in().await? {
            Ok(())
        } else {
            Err(ShopwalkError::mismatch(
                "login",
                "account menu visible",
                "account menu absent",
            ))
        }
    })
    .await
}

/// Logs in and checks the account menu
#[derive(Debug, Clone)]
pub struct LoginFlow {
    locators: LocatorCatalog,
    credentials: Credentials,
    logout: bool,
}

impl LoginFlow {
    /// Credentials are required even when the suite-wide `flow.login` is off
    pub fn from_config(config: &SuiteConfig) -> ShopwalkResult<Self> {
        let credentials = config.complete_credentials()?.clone();
        Ok(Self {
            locators: config.locators.clone(),
            credentials,
            logout: config.flow.logout,
        })
    }
}

#[async_trait]
impl Flow for LoginFlow {
    fn name(&self) -> &'static str {
        FlowKind::Login.name()
    }

    async fn run(&self, session: &Session, ctx: &mut FlowContext) -> ShopwalkResult<()> {
        sign_in(session, &self.locators, &self.credentials, ctx).await?;
        if self.logout {
            let logout = LogoutPage::new(session, &self.locators.logout);
            ctx.step("log out", logout.logout()).await?;
        }
        Ok(())
    }
}

/// The full shopping journey
#[derive(Debug, Clone)]
pub struct ShoppingFlow {
    locators: LocatorCatalog,
    options: FlowOptions,
    credentials: Option<Credentials>,
    keywords: KeywordPair,
    output_path: PathBuf,
}

impl ShoppingFlow {
    /// Resolve keywords and, when `flow.login` is on, credentials
    pub fn from_config(config: &SuiteConfig) -> ShopwalkResult<Self> {
        let keywords = config.keyword_pair()?;
        let credentials = config.require_credentials()?.cloned();
        Ok(Self {
            locators: config.locators.clone(),
            options: config.flow.clone(),
            credentials,
            keywords,
            output_path: config.output_path.clone(),
        })
    }

    /// Keywords this run will search for
    #[must_use]
    pub const fn keywords(&self) -> &KeywordPair {
        &self.keywords
    }
}

#[async_trait]
impl Flow for ShoppingFlow {
    fn name(&self) -> &'static str {
        FlowKind::Shopping.name()
    }

    async fn run(&self, session: &Session, ctx: &mut FlowContext) -> ShopwalkResult<()> {
        let loc = &self.locators;
        let opts = &self.options;

        if let Some(credentials) = &self.credentials {
            sign_in(session, loc, credentials, ctx).await?;
        }

        let home = HomePage::new(session, &loc.home);
        ctx.step("open men's section", home.navigate_to_men_section())
            .await?;
        ctx.step("see all", home.click_see_all_if_present()).await?;
        ctx.step("open search", home.open_search_box()).await?;

        let search = SearchPage::new(session, &loc.search);
        ctx.step("type first keyword", search.type_keyword(&self.keywords.first))
            .await?;
        ctx.step("clear search", search.clear()).await?;
        ctx.step("type second keyword", search.type_keyword(&self.keywords.second))
            .await?;
        ctx.step("submit search", search.submit()).await?;

        let product = ProductPage::new(session, &loc.product);
        ctx.step("select product", product.select_product(opts.product_choice))
            .await?;
        let snapshot = ctx.step("read product", product.snapshot()).await?;
        ctx.step("save snapshot", write_snapshot(&self.output_path, &snapshot))
            .await?;
        ctx.step("add to cart", product.add_to_cart(opts.size_strategy))
            .await?;

        let cart = CartPage::new(session, &loc.cart);
        ctx.step("open cart", cart.open_cart()).await?;
        let cart_price = ctx.step("read cart price", cart.cart_price()).await?;
        ctx.step("compare prices", async {
            if same_price(&snapshot.price_text, &cart_price)? {
                Ok(())
            } else {
                Err(ShopwalkError::mismatch(
                    "cart price",
                    snapshot.price_text.as_str(),
                    cart_price.as_str(),
                ))
            }
        })
        .await?;

        ctx.step(
            "change quantity",
            cart.change_quantity(opts.target_quantity, opts.quantity_strategy),
        )
        .await?;
        ctx.step("remove product", cart.remove_product()).await?;
        ctx.step("verify empty cart", async {
            if cart.is_cart_empty().await? {
                Ok(())
            } else {
                Err(ShopwalkError::mismatch("cart contents", "empty", "not empty"))
            }
        })
        .await?;

        if self.credentials.is_some() && opts.logout {
            let logout = LogoutPage::new(session, &loc.logout);
            ctx.step("log out", logout.logout()).await?;
        }
        Ok(())
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs flows at the boundary: session lifecycle, failure context, cleanup
#[derive(Debug, Clone)]
pub struct FlowRunner {
    config: Arc<SuiteConfig>,
    factory: Arc<dyn DriverFactory>,
}

impl FlowRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: Arc<SuiteConfig>, factory: Arc<dyn DriverFactory>) -> Self {
        Self { config, factory }
    }

    /// Build and run a flow of the given kind
    pub async fn run_kind(&self, kind: FlowKind) -> FlowOutcome {
        match kind.build(&self.config) {
            Ok(flow) => self.run(flow.as_ref()).await,
            Err(e) => {
                tracing::error!(
                    flow = %kind,
                    error = %e,
                    "flow input missing; browser not launched"
                );
                FlowOutcome::fail(kind.name(), e.to_string())
            }
        }
    }

    /// Run one flow in a fresh session
    pub async fn run(&self, flow: &dyn Flow) -> FlowOutcome {
        let span = tracing::info_span!("flow", flow = flow.name());
        self.run_inner(flow).instrument(span).await
    }

    async fn run_inner(&self, flow: &dyn Flow) -> FlowOutcome {
        let started = Instant::now();
        let mut manager = SessionManager::new(self.factory.clone(), self.config.session.clone())
            .with_timings(self.config.timings)
            .with_retry(self.config.retry);
        let mut ctx = FlowContext::new(flow.name());

        let result = self.drive(&mut manager, flow, &mut ctx).await;

        let mut screenshot = None;
        if let Err(e) = &result {
            tracing::error!(
                last_step = ctx.last_step().unwrap_or("<none>"),
                error = %e,
                "flow failed"
            );
            if let Some(session) = manager.current() {
                screenshot = self.capture(session, flow.name()).await;
            }
        }
        if let Err(e) = manager.release().await {
            tracing::warn!(error = %e, "session release failed");
        }

        let outcome = match result {
            Ok(()) => {
                tracing::info!(steps = ctx.steps().len(), "flow passed");
                FlowOutcome::pass(flow.name())
            }
            Err(e) => FlowOutcome::fail(flow.name(), e.to_string()),
        };
        outcome
            .with_steps(ctx.into_steps())
            .with_screenshot(screenshot)
            .with_duration(started.elapsed())
    }

    async fn drive(
        &self,
        manager: &mut SessionManager,
        flow: &dyn Flow,
        ctx: &mut FlowContext,
    ) -> ShopwalkResult<()> {
        let session = ctx.step("launch browser", manager.acquire()).await?;
        ctx.step("open storefront", session.navigate(&self.config.base_url))
            .await?;
        let home = HomePage::new(session, &self.config.locators.home);
        ctx.step("accept cookies", home.accept_cookies_if_present())
            .await?;
        let _ = self.check_header_locators(session).await;
        flow.run(session, ctx).await
    }

    /// Check the header locators against the live home page; returns the
    /// ones that matched nothing. Never fails the flow.
    pub async fn check_header_locators(&self, session: &Session) -> Vec<String> {
        let catalog = &self.config.locators;
        let expected: [(&str, &Locator); 4] = [
            ("home.account_link", &catalog.home.account_link),
            ("home.men_menu", &catalog.home.men_menu),
            ("home.search_open", &catalog.home.search_open),
            ("cart.cart_icon", &catalog.cart.cart_icon),
        ];
        let mut missing = Vec::new();
        for (key, locator) in expected {
            match session.driver().find_all(locator).await {
                Ok(found) if found.is_empty() => {
                    tracing::warn!(key, %locator, "locator matches nothing on the home page");
                    missing.push(key.to_string());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(key, error = %e, "header check skipped"),
            }
        }
        missing
    }

    async fn capture(&self, session: &Session, flow: &str) -> Option<PathBuf> {
        let png = match session.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!(error = %e, "failure screenshot not captured");
                return None;
            }
        };
        match save_screenshot(&self.config.screenshots_dir, flow, &png).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "failure screenshot saved");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failure screenshot not written");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockDriverFactory, MockElement};

    mod context_tests {
        use super::*;

        #[tokio::test]
        async fn test_records_only_successful_steps() {
            let mut ctx = FlowContext::new("shopping");
            ctx.step("one", async { Ok(()) }).await.unwrap();
            let err = ctx
                .step("two", async { Err::<(), _>(ShopwalkError::driver("x")) })
                .await;
            assert!(err.is_err());
            assert_eq!(ctx.last_step(), Some("one"));
            assert_eq!(ctx.steps().len(), 1);
        }

        #[tokio::test]
        async fn test_step_returns_value() {
            let mut ctx = FlowContext::new("login");
            let n = ctx.step("count", async { Ok(3) }).await.unwrap();
            assert_eq!(n, 3);
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn test_parse_and_display() {
            assert_eq!("Shopping".parse::<FlowKind>().unwrap(), FlowKind::Shopping);
            assert_eq!(FlowKind::Login.to_string(), "login");
            assert!("checkout".parse::<FlowKind>().is_err());
        }

        #[test]
        fn test_shopping_needs_keywords() {
            let config = SuiteConfig {
                keywords_path: Some(PathBuf::from("/nonexistent/keywords.csv")),
                flow: FlowOptions {
                    login: false,
                    ..FlowOptions::default()
                },
                ..SuiteConfig::default()
            };
            assert!(matches!(
                FlowKind::Shopping.build(&config).unwrap_err(),
                ShopwalkError::DataSourceMissing { .. }
            ));
        }

        #[test]
        fn test_login_needs_credentials_even_when_flag_off() {
            let config = SuiteConfig {
                flow: FlowOptions {
                    login: false,
                    ..FlowOptions::default()
                },
                ..SuiteConfig::default()
            };
            assert!(matches!(
                FlowKind::Login.build(&config).unwrap_err(),
                ShopwalkError::DataSourceMissing { .. }
            ));
        }
    }

    mod runner_tests {
        use super::*;

        #[derive(Debug)]
        struct Failing;

        #[async_trait]
        impl Flow for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }

            async fn run(&self, session: &Session, ctx: &mut FlowContext) -> ShopwalkResult<()> {
                ctx.step("look for ghost", async {
                    session
                        .interactor()
                        .click(&Locator::css("ghost", "#ghost"))
                        .await
                })
                .await
            }
        }

        fn runner(dir: &std::path::Path) -> (Arc<MockDriverFactory>, FlowRunner) {
            let factory = Arc::new(MockDriverFactory::new(|| {
                MockDriver::new().with(MockElement::new(&LocatorCatalog::default().home.men_menu))
            }));
            let config = SuiteConfig {
                screenshots_dir: dir.to_path_buf(),
                ..SuiteConfig::default()
            };
            (factory.clone(), FlowRunner::new(Arc::new(config), factory))
        }

        #[tokio::test(start_paused = true)]
        async fn test_failure_captures_screenshot_and_releases() {
            let dir = tempfile::tempdir().unwrap();
            let (factory, runner) = runner(dir.path());
            let outcome = runner.run(&Failing).await;

            assert!(!outcome.passed);
            assert_eq!(outcome.last_step(), Some("accept cookies"));
            let shot = outcome.screenshot.clone().unwrap();
            assert!(shot.starts_with(dir.path()));
            assert!(shot.exists());
            let driver = factory.last().unwrap();
            assert!(driver.was_called("screenshot"));
            assert!(driver.is_quit());
        }

        #[tokio::test(start_paused = true)]
        async fn test_header_check_reports_missing_locators() {
            let dir = tempfile::tempdir().unwrap();
            let (_, runner) = runner(dir.path());
            let session = Session::new(
                Arc::new(
                    MockDriver::new()
                        .with(MockElement::new(&LocatorCatalog::default().home.men_menu)),
                ),
                crate::session::Timings::default(),
                crate::interact::RetryPolicy::default(),
            );
            let missing = runner.check_header_locators(&session).await;
            assert!(missing.contains(&"home.account_link".to_string()));
            assert!(!missing.contains(&"home.men_menu".to_string()));
        }

        #[tokio::test]
        async fn test_missing_input_never_launches() {
            let dir = tempfile::tempdir().unwrap();
            let (factory, _) = runner(dir.path());
            let config = SuiteConfig {
                keywords_path: None,
                flow: FlowOptions {
                    login: false,
                    ..FlowOptions::default()
                },
                ..SuiteConfig::default()
            };
            let outcome = FlowRunner::new(Arc::new(config), factory.clone())
                .run_kind(FlowKind::Shopping)
                .await;
            assert!(!outcome.passed);
            assert!(outcome.error.unwrap().contains("keywords"));
            assert!(factory.launched().is_empty());
        }
    }
}

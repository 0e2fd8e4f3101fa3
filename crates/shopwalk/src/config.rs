//! Suite configuration.
//!
//! A single YAML document (`shopwalk.yaml`) describes where the storefront
//! lives, which credentials and keywords to use, how the browser is launched,
//! how long waits may take and which locators identify each element. Every
//! section is optional and falls back to the defaults that match the live
//! Turkish storefront.
//!
//! Precedence is: defaults, then the file, then `SHOPWALK_*` environment
//! variables, then CLI flags (applied by the binary).
//!
//! ```yaml
//! base_url: https://www.zara.com/tr/
//! keywords_path: config/keywords.csv
//! flow:
//!   login: false
//!   size_strategy: inline
//!   quantity_strategy: stepper
//! locators:
//!   cart:
//!     price:
//!       css: ".price-current__amount"
//! ```

use crate::catalog::LocatorCatalog;
use crate::interact::RetryPolicy;
use crate::keywords::{load_keywords, KeywordPair};
use crate::pages::{Credentials, ProductChoice, QuantityStrategy, SizeStrategy};
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::session::{SessionProfile, Timings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storefront entry point
pub const DEFAULT_BASE_URL: &str = "https://www.zara.com/tr/";

/// Overrides `base_url`
pub const ENV_BASE_URL: &str = "SHOPWALK_BASE_URL";
/// Overrides the login e-mail
pub const ENV_EMAIL: &str = "SHOPWALK_EMAIL";
/// Overrides the login password
pub const ENV_PASSWORD: &str = "SHOPWALK_PASSWORD";

/// Which optional parts of the shopping flow run, and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowOptions {
    /// Log in before shopping
    pub login: bool,
    /// Log out after shopping
    pub logout: bool,
    /// How the size list is reached
    pub size_strategy: SizeStrategy,
    /// How the cart quantity is changed
    pub quantity_strategy: QuantityStrategy,
    /// Quantity the cart line is changed to
    pub target_quantity: u32,
    /// Which search result is opened
    pub product_choice: ProductChoice,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            login: true,
            logout: true,
            size_strategy: SizeStrategy::default(),
            quantity_strategy: QuantityStrategy::default(),
            target_quantity: 2,
            product_choice: ProductChoice::default(),
        }
    }
}

/// Everything a suite run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Storefront home page
    pub base_url: String,
    /// Account used by the login flow
    pub credentials: Option<Credentials>,
    /// Where the product snapshot is written
    pub output_path: PathBuf,
    /// CSV whose first record holds the keywords
    pub keywords_path: Option<PathBuf>,
    /// Inline keywords; take precedence over `keywords_path`
    pub keywords: Vec<String>,
    /// Failure screenshots
    pub screenshots_dir: PathBuf,
    /// Log file, if any (used by the CLI)
    pub log_path: Option<PathBuf>,
    /// Browser launch profile
    pub session: SessionProfile,
    /// Wait budgets
    pub timings: Timings,
    /// Interaction retries
    pub retry: RetryPolicy,
    /// Flow switches
    pub flow: FlowOptions,
    /// Locator overrides
    pub locators: LocatorCatalog,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            output_path: PathBuf::from("output/product.txt"),
            keywords_path: Some(PathBuf::from("config/keywords.csv")),
            keywords: Vec::new(),
            screenshots_dir: PathBuf::from("screenshots"),
            log_path: None,
            session: SessionProfile::default(),
            timings: Timings::default(),
            retry: RetryPolicy::default(),
            flow: FlowOptions::default(),
            locators: LocatorCatalog::default(),
        }
    }
}

impl SuiteConfig {
    /// Load and validate a YAML file
    pub fn load(path: &Path) -> ShopwalkResult<Self> {
        if !path.is_file() {
            return Err(ShopwalkError::DataSourceMissing {
                what: "config file".to_string(),
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ShopwalkResult<Self> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.locators.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHOPWALK_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(std::env::vars());
    }

    /// Apply `SHOPWALK_*` overrides from the given variables
    pub fn apply_env_from<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                ENV_BASE_URL => self.base_url = value.into(),
                ENV_EMAIL => {
                    self.credentials
                        .get_or_insert_with(Credentials::default)
                        .email = value.into();
                }
                ENV_PASSWORD => {
                    self.credentials
                        .get_or_insert_with(Credentials::default)
                        .password = value.into();
                }
                _ => {}
            }
        }
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> ShopwalkResult<()> {
        let mut problems = Vec::new();
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            problems.push(format!("base_url must be http(s): {:?}", self.base_url));
        }
        if self.flow.target_quantity == 0 {
            problems.push("flow.target_quantity must be at least 1".to_string());
        }
        if self.timings.poll_ms == 0 {
            problems.push("timings.poll_ms must be positive".to_string());
        }
        for (name, value) in [
            ("timings.default_ms", self.timings.default_ms),
            ("timings.long_ms", self.timings.long_ms),
            ("timings.optional_ms", self.timings.optional_ms),
        ] {
            if value < self.timings.poll_ms {
                problems.push(format!("{name} ({value}) is shorter than timings.poll_ms"));
            }
        }
        if let Err(e) = self.locators.validate() {
            problems.push(e.to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ShopwalkError::config(problems.join("; ")))
        }
    }

    /// Keywords for the shopping flow, inline first, then the CSV file
    pub fn keyword_pair(&self) -> ShopwalkResult<KeywordPair> {
        if !self.keywords.is_empty() {
            return KeywordPair::from_cells(&self.keywords, Path::new("config:keywords"));
        }
        match &self.keywords_path {
            Some(path) => load_keywords(path),
            None => Err(ShopwalkError::DataSourceMissing {
                what: "keywords".to_string(),
                path: PathBuf::from("config:keywords_path"),
            }),
        }
    }

    /// Credentials, required only when the flow logs in
    pub fn require_credentials(&self) -> ShopwalkResult<Option<&Credentials>> {
        if self.flow.login {
            self.complete_credentials().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Credentials with both fields filled in
    pub fn complete_credentials(&self) -> ShopwalkResult<&Credentials> {
        match &self.credentials {
            Some(c) if c.is_complete() => Ok(c),
            _ => Err(ShopwalkError::DataSourceMissing {
                what: format!("credentials (set {ENV_EMAIL} and {ENV_PASSWORD})"),
                path: PathBuf::from("config:credentials"),
            }),
        }
    }
}

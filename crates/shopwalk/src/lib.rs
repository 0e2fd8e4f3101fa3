//! Shopwalk: page-object browser harness for storefront end-to-end flows
//!
//! Drives a real browser through login, navigation, search, product
//! selection and cart manipulation on a Turkish-locale fashion storefront,
//! asserting the outcome of every step.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   FlowSuite / FlowRunner          (flow boundary, one session)   │
//! │        │                                                         │
//! │        ▼                                                         │
//! │   LoginFlow, ShoppingFlow         (ordered steps + assertions)   │
//! │        │                                                         │
//! │        ▼                                                         │
//! │   HomePage … CartPage             (page objects + locator sets)  │
//! │        │                │                                        │
//! │        ▼                ▼                                        │
//! │   Waiter (poll)    Interactor (retry + fallback)                 │
//! │        │                │                                        │
//! │        ▼                ▼                                        │
//! │   BrowserDriver ◄── Session ◄── SessionManager ◄── DriverFactory │
//! │   (Chromium over CDP, or MockDriver)                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every wait is bounded, every required interaction fails loudly, and
//! optional elements are reported as [`Presence::Absent`] rather than
//! as errors.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod artifact;
mod catalog;
#[cfg(feature = "browser")]
mod chromium;
mod config;
mod driver;
mod flow;
mod harness;
mod interact;
mod keywords;
mod locator;
mod price;
mod result;
mod session;
mod wait;

/// Scriptable in-memory browser for tests and dry runs
pub mod mock;

/// One page object per storefront screen
pub mod pages;

pub use artifact::{save_screenshot, screenshot_path, write_atomic, write_snapshot, ProductSnapshot};
pub use catalog::{
    CartLocators, HomeLocators, LocatorCatalog, LoginLocators, LogoutLocators, ProductLocators,
    SearchLocators,
};
#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumFactory};
pub use config::{
    FlowOptions, SuiteConfig, DEFAULT_BASE_URL, ENV_BASE_URL, ENV_EMAIL, ENV_PASSWORD,
};
pub use driver::{BrowserDriver, ElementHandle, ElementSnapshot};
pub use flow::{Flow, FlowContext, FlowKind, FlowRunner, LoginFlow, ShoppingFlow};
pub use harness::{FlowOutcome, FlowSuite, SuiteReport};
pub use interact::{Action, Interactor, RetryPolicy};
pub use keywords::{load_keywords, read_first_row, KeywordPair};
pub use locator::{Locator, Selector};
pub use pages::PageObject;
pub use price::{parse_price, same_price, Price};
pub use result::{ShopwalkError, ShopwalkResult};
pub use session::{
    DriverFactory, Session, SessionManager, SessionProfile, Timings, DEFAULT_USER_AGENT,
    MAX_SETTLE_MS,
};
pub use wait::{
    Condition, Presence, WaitOptions, Waiter, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

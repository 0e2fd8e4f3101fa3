//! Page objects, one per storefront screen.
//!
//! Each page borrows the [`Session`] it drives and the locator set it was
//! configured with, so a page can never outlive its browser. Operations
//! state their own tolerance for absence: "if present" helpers use soft
//! waits and return `bool`, everything else fails loudly.
//!
//! ```ignore
//! let home = HomePage::new(&session, &catalog.home);
//! home.accept_cookies_if_present().await?;
//! home.navigate_to_men_section().await?;
//! ```

mod cart;
mod home;
mod login;
mod logout;
mod product;
mod search;

pub use cart::{is_empty_cart_text, CartPage, QuantityStrategy, CART_PATH, EMPTY_CART_MESSAGES};
pub use home::HomePage;
pub use login::{Credentials, LoginPage};
pub use logout::LogoutPage;
pub use product::{CartState, ProductChoice, ProductPage, SizeStrategy};
pub use search::SearchPage;

use crate::locator::Locator;
use crate::result::ShopwalkResult;
use crate::session::Session;
use crate::wait::Condition;
use async_trait::async_trait;

/// Behaviour shared by every page object
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logging
    fn page_name(&self) -> &'static str;

    /// Session the page drives
    fn session(&self) -> &Session;

    /// Element whose visibility proves the page is rendered
    fn signature(&self) -> &Locator;

    /// Soft check that the page is rendered
    async fn is_loaded(&self) -> ShopwalkResult<bool> {
        let presence = self
            .session()
            .optional_waiter()
            .soft(self.signature(), &Condition::Visible)
            .await?;
        tracing::debug!(page = self.page_name(), loaded = presence.is_found());
        Ok(presence.is_found())
    }
}

#[cfg(test)]
pub(crate) fn test_session(
    driver: crate::mock::MockDriver,
) -> (std::sync::Arc<crate::mock::MockDriver>, Session) {
    let driver = std::sync::Arc::new(driver);
    let session = Session::new(
        driver.clone(),
        crate::session::Timings::default(),
        crate::interact::RetryPolicy::default(),
    );
    (driver, session)
}

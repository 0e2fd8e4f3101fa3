use super::PageObject;
use crate::catalog::HomeLocators;
use crate::locator::Locator;
use crate::result::ShopwalkResult;
use crate::session::Session;
use crate::wait::{Condition, Presence};

/// Landing page header and navigation
#[derive(Debug, Clone, Copy)]
pub struct HomePage<'s> {
    session: &'s Session,
    loc: &'s HomeLocators,
}

impl<'s> HomePage<'s> {
    /// Bind to a session
    #[must_use]
    pub const fn new(session: &'s Session, loc: &'s HomeLocators) -> Self {
        Self { session, loc }
    }

    /// Dismiss the cookie banner; `false` when it never showed up
    pub async fn accept_cookies_if_present(&self) -> ShopwalkResult<bool> {
        self.click_if_present(&self.loc.cookie_accept).await
    }

    /// Open the login page from the header
    pub async fn open_login(&self) -> ShopwalkResult<()> {
        let ui = self.session.interactor();
        ui.hover(&self.loc.account_link).await?;
        ui.click(&self.loc.account_link).await
    }

    /// Whether the signed-in account menu is shown
    pub async fn is_logged_in(&self) -> ShopwalkResult<bool> {
        let presence = self
            .session
            .long_waiter()
            .soft(&self.loc.logged_in_marker, &Condition::Visible)
            .await?;
        Ok(presence.is_found())
    }

    /// Hover the men's menu and follow "see all"
    pub async fn navigate_to_men_section(&self) -> ShopwalkResult<()> {
        let ui = self.session.interactor();
        ui.hover(&self.loc.men_menu).await?;
        ui.click(&self.loc.see_all).await?;
        tracing::info!("men's section opened");
        Ok(())
    }

    /// Follow "see all" when the current menu offers it
    pub async fn click_see_all_if_present(&self) -> ShopwalkResult<bool> {
        self.click_if_present(&self.loc.see_all).await
    }

    /// Open the header search box
    pub async fn open_search_box(&self) -> ShopwalkResult<()> {
        self.session.interactor().click(&self.loc.search_open).await
    }

    async fn click_if_present(&self, locator: &Locator) -> ShopwalkResult<bool> {
        match self
            .session
            .optional_waiter()
            .soft(locator, &Condition::Clickable)
            .await?
        {
            Presence::Found(_) => {
                self.session.interactor().click(locator).await?;
                tracing::info!(%locator, "clicked optional element");
                Ok(true)
            }
            Presence::Absent => {
                tracing::info!(%locator, "optional element not present");
                Ok(false)
            }
        }
    }
}

impl PageObject for HomePage<'_> {
    fn page_name(&self) -> &'static str {
        "home"
    }

    fn session(&self) -> &Session {
        self.session
    }

    fn signature(&self) -> &Locator {
        &self.loc.men_menu
    }
}

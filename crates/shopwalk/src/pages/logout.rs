use super::PageObject;
use crate::catalog::LogoutLocators;
use crate::locator::Locator;
use crate::result::ShopwalkResult;
use crate::session::Session;

/// Account menu path to "Oturumu sonlandır"
#[derive(Debug, Clone, Copy)]
pub struct LogoutPage<'s> {
    session: &'s Session,
    loc: &'s LogoutLocators,
}

impl<'s> LogoutPage<'s> {
    /// Bind to a session
    #[must_use]
    pub const fn new(session: &'s Session, loc: &'s LogoutLocators) -> Self {
        Self { session, loc }
    }

    /// Header name, then PROFİL, then log out. Every step is required.
    pub async fn logout(&self) -> ShopwalkResult<()> {
        let ui = self.session.interactor();
        ui.click(&self.loc.profile_header).await?;
        ui.click(&self.loc.profile_menu).await?;
        ui.click(&self.loc.logout_button).await?;
        tracing::info!("logged out");
        Ok(())
    }
}

impl PageObject for LogoutPage<'_> {
    fn page_name(&self) -> &'static str {
        "logout"
    }

    fn session(&self) -> &Session {
        self.session
    }

    fn signature(&self) -> &Locator {
        &self.loc.profile_header
    }
}

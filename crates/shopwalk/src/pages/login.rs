use super::PageObject;
use crate::catalog::LoginLocators;
use crate::locator::Locator;
use crate::result::ShopwalkResult;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Login e-mail
    pub email: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields filled in
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login landing page and form
#[derive(Debug, Clone, Copy)]
pub struct LoginPage<'s> {
    session: &'s Session,
    loc: &'s LoginLocators,
}

impl<'s> LoginPage<'s> {
    /// Bind to a session
    #[must_use]
    pub const fn new(session: &'s Session, loc: &'s LoginLocators) -> Self {
        Self { session, loc }
    }

    /// Press "GİRİŞ YAP" on the landing page
    pub async fn open_login_form(&self) -> ShopwalkResult<()> {
        self.session.interactor().click(&self.loc.landing_login).await
    }

    /// Fill in and submit the form
    pub async fn login(&self, credentials: &Credentials) -> ShopwalkResult<()> {
        let ui = self.session.interactor();
        ui.type_text(&self.loc.email, &credentials.email).await?;
        ui.type_text(&self.loc.password, &credentials.password).await?;
        ui.click(&self.loc.submit).await?;
        tracing::info!(email = %credentials.email, "login submitted");
        Ok(())
    }
}

impl PageObject for LoginPage<'_> {
    fn page_name(&self) -> &'static str {
        "login"
    }

    fn session(&self) -> &Session {
        self.session
    }

    fn signature(&self) -> &Locator {
        &self.loc.email
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{DomEffect, MockDriver, MockElement};
    use crate::pages::test_session;
    use crate::result::ShopwalkError;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("qa@example.com", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("qa@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_completeness() {
        assert!(Credentials::new("a@b.c", "x").is_complete());
        assert!(!Credentials::new(" ", "x").is_complete());
        assert!(!Credentials::default().is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_fills_both_fields_and_submits() {
        let loc = LoginLocators::default();
        let (driver, session) = test_session(
            MockDriver::new()
                .with(MockElement::new(&loc.landing_login).on_click(DomEffect::Show(
                    loc.email.selector().clone(),
                )))
                .with(MockElement::new(&loc.email).tag("input").hidden())
                .with(MockElement::new(&loc.password).tag("input"))
                .with(MockElement::new(&loc.submit)),
        );
        let page = LoginPage::new(&session, &loc);
        page.open_login_form().await.unwrap();
        assert!(page.is_loaded().await.unwrap());
        page.login(&Credentials::new("qa@example.com", "secret")).await.unwrap();
        assert_eq!(driver.text_of(&loc.email).as_deref(), Some("qa@example.com"));
        assert_eq!(driver.text_of(&loc.password).as_deref(), Some("secret"));
        assert!(driver.was_called("click:login submit"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_submit_fails_loudly() {
        let loc = LoginLocators::default();
        let (_, session) = test_session(
            MockDriver::new()
                .with(MockElement::new(&loc.email).tag("input"))
                .with(MockElement::new(&loc.password).tag("input"))
                .with(MockElement::new(&loc.submit).disabled()),
        );
        let err = LoginPage::new(&session, &loc)
            .login(&Credentials::new("qa@example.com", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopwalkError::TimeoutExceeded { .. }));
    }
}

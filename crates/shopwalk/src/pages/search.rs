use super::PageObject;
use crate::catalog::SearchLocators;
use crate::locator::Locator;
use crate::result::ShopwalkResult;
use crate::session::Session;
use crate::wait::Condition;

/// Header search box and its result grid
#[derive(Debug, Clone, Copy)]
pub struct SearchPage<'s> {
    session: &'s Session,
    loc: &'s SearchLocators,
}

impl<'s> SearchPage<'s> {
    /// Bind to a session
    #[must_use]
    pub const fn new(session: &'s Session, loc: &'s SearchLocators) -> Self {
        Self { session, loc }
    }

    /// Replace the box contents with `keyword`
    pub async fn type_keyword(&self, keyword: &str) -> ShopwalkResult<()> {
        self.session
            .interactor()
            .type_text(&self.loc.input, keyword)
            .await?;
        // suggestions re-render with no DOM signal to wait on
        self.session.settle().await;
        tracing::info!(keyword, "keyword typed");
        Ok(())
    }

    /// Empty the box and wait until it reads empty
    pub async fn clear(&self) -> ShopwalkResult<()> {
        self.session.interactor().clear(&self.loc.input).await?;
        let _ = self
            .session
            .waiter()
            .until(&self.loc.input, &Condition::TextEquals(String::new()))
            .await?;
        tracing::info!("search box cleared");
        Ok(())
    }

    /// Press Enter and wait for the result grid
    pub async fn submit(&self) -> ShopwalkResult<()> {
        self.session.interactor().press_enter(&self.loc.input).await?;
        let _ = self
            .session
            .long_waiter()
            .until(&self.loc.results, &Condition::Visible)
            .await?;
        Ok(())
    }

    /// Type and submit
    pub async fn search(&self, keyword: &str) -> ShopwalkResult<()> {
        self.type_keyword(keyword).await?;
        self.submit().await
    }

    /// Whether any result tile is shown
    pub async fn has_results(&self) -> ShopwalkResult<bool> {
        Ok(self
            .session
            .optional_waiter()
            .soft(&self.loc.results, &Condition::Visible)
            .await?
            .is_found())
    }
}

impl PageObject for SearchPage<'_> {
    fn page_name(&self) -> &'static str {
        "search"
    }

    fn session(&self) -> &Session {
        self.session
    }

    fn signature(&self) -> &Locator {
        &self.loc.input
    }
}

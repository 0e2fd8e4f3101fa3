use super::PageObject;
use crate::artifact::ProductSnapshot;
use crate::catalog::ProductLocators;
use crate::locator::Locator;
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::session::Session;
use crate::wait::{Condition, Presence};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which tile of a listing to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductChoice {
    /// First visible tile
    First,
    /// Uniformly random visible tile
    #[default]
    Random,
    /// Tile at a fixed position
    Index(usize),
}

/// How the size list is reached after "Ekle"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeStrategy {
    /// "Ekle" opens a "Bir beden seçin" dropdown that lists the sizes
    #[default]
    Dropdown,
    /// "Ekle" shows the size list inline
    Inline,
}

/// Progress of the add-to-cart micro-flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    /// Nothing clicked yet
    Idle,
    /// "Ekle" accepted
    AddClicked,
    /// Size list visible
    SizePickerOpen,
    /// A size was clicked
    SizeChosen,
    /// Smart-size popup declined
    PopupDismissed,
    /// "Siparişi Tamamla" followed
    OrderConfirmed,
}

impl fmt::Display for CartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::AddClicked => "AddClicked",
            Self::SizePickerOpen => "SizePickerOpen",
            Self::SizeChosen => "SizeChosen",
            Self::PopupDismissed => "PopupDismissed",
            Self::OrderConfirmed => "OrderConfirmed",
        };
        f.write_str(name)
    }
}

const ADD_TO_CART: &str = "add to cart";

fn unreached(state: CartState) -> impl FnOnce(ShopwalkError) -> ShopwalkError {
    move |source| ShopwalkError::UnreachedState {
        flow: ADD_TO_CART.to_string(),
        state: state.to_string(),
        source: Box::new(source),
    }
}

/// Product listing and product detail page
#[derive(Debug, Clone, Copy)]
pub struct ProductPage<'s> {
    session: &'s Session,
    loc: &'s ProductLocators,
}

impl<'s> ProductPage<'s> {
    /// Bind to a session
    #[must_use]
    pub const fn new(session: &'s Session, loc: &'s ProductLocators) -> Self {
        Self { session, loc }
    }

    /// Open one product of the current listing; returns its position
    pub async fn select_product(&self, choice: ProductChoice) -> ShopwalkResult<usize> {
        let tiles = self
            .session
            .long_waiter()
            .until_all(&self.loc.product_links, &Condition::Clickable)
            .await?;
        let index = match choice {
            ProductChoice::First => 0,
            ProductChoice::Random => rand::thread_rng().gen_range(0..tiles.len()),
            ProductChoice::Index(i) if i < tiles.len() => i,
            ProductChoice::Index(i) => {
                return Err(ShopwalkError::ElementNotFound {
                    locator: format!("{} #{i} of {}", self.loc.product_links, tiles.len()),
                })
            }
        };
        tracing::info!(index, of = tiles.len(), "opening product");
        self.session
            .interactor()
            .click_nth(&self.loc.product_links, index)
            .await?;
        let _ = self
            .session
            .long_waiter()
            .until(&self.loc.name, &Condition::Visible)
            .await?;
        Ok(index)
    }

    /// Product title
    pub async fn product_name(&self) -> ShopwalkResult<String> {
        self.session.long_waiter().visible_text(&self.loc.name).await
    }

    /// Price exactly as displayed
    pub async fn product_price(&self) -> ShopwalkResult<String> {
        self.session.long_waiter().visible_text(&self.loc.price).await
    }

    /// Name and price together
    pub async fn snapshot(&self) -> ShopwalkResult<ProductSnapshot> {
        Ok(ProductSnapshot {
            name: self.product_name().await?,
            price_text: self.product_price().await?,
        })
    }

    /// Add the first available size to the cart and continue to checkout.
    ///
    /// Every transition waits for the next state's element; a guard that
    /// times out aborts with [`ShopwalkError::UnreachedState`].
    pub async fn add_to_cart(&self, strategy: SizeStrategy) -> ShopwalkResult<CartState> {
        let ui = self.session.interactor();
        let waiter = self.session.waiter();

        ui.click(&self.loc.add_button)
            .await
            .map_err(unreached(CartState::AddClicked))?;
        tracing::debug!(state = %CartState::AddClicked);

        if strategy == SizeStrategy::Dropdown {
            ui.click(&self.loc.size_selector)
                .await
                .map_err(unreached(CartState::SizePickerOpen))?;
        }
        let sizes = waiter
            .until_all(&self.loc.sizes, &Condition::Clickable)
            .await
            .map_err(unreached(CartState::SizePickerOpen))?;
        tracing::debug!(state = %CartState::SizePickerOpen, available = sizes.len());

        ui.click_nth(&self.loc.sizes, 0)
            .await
            .map_err(unreached(CartState::SizeChosen))?;
        let mut state = CartState::SizeChosen;
        tracing::debug!(%state);

        if let Presence::Found(_) = self
            .session
            .optional_waiter()
            .soft(&self.loc.smart_size_decline, &Condition::Clickable)
            .await?
        {
            ui.click(&self.loc.smart_size_decline)
                .await
                .map_err(unreached(CartState::PopupDismissed))?;
            state = CartState::PopupDismissed;
            tracing::debug!(%state);
        }

        ui.click(&self.loc.complete_order)
            .await
            .map_err(unreached(CartState::OrderConfirmed))?;
        state = CartState::OrderConfirmed;
        tracing::info!(%state, "product added to cart");
        Ok(state)
    }
}

impl PageObject for ProductPage<'_> {
    fn page_name(&self) -> &'static str {
        "product"
    }

    fn session(&self) -> &Session {
        self.session
    }

    fn signature(&self) -> &Locator {
        &self.loc.name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::BrowserDriver;
    use crate::mock::{DomEffect, MockDriver, MockElement};
    use crate::pages::test_session;
    use std::time::Duration;

    fn listing(loc: &ProductLocators, tiles: usize) -> MockDriver {
        let mut driver = MockDriver::new()
            .with(MockElement::new(&loc.name).hidden())
            .with(MockElement::new(&loc.price).hidden());
        for i in 0..tiles {
            driver = driver.with(
                MockElement::new(&loc.product_links)
                    .text(format!("tile {i}"))
                    .on_click(DomEffect::SetText(
                        loc.name.selector().clone(),
                        format!("GÖMLEK {i}"),
                    ))
                    .on_click(DomEffect::SetText(
                        loc.price.selector().clone(),
                        "1.690,00 TL".to_string(),
                    ))
                    .on_click(DomEffect::ShowAfter(
                        loc.name.selector().clone(),
                        Duration::from_millis(400),
                    ))
                    .on_click(DomEffect::Show(loc.price.selector().clone())),
            );
        }
        driver
    }

    fn detail(loc: &ProductLocators, strategy: SizeStrategy, popup: bool) -> MockDriver {
        let add = MockElement::new(&loc.add_button).on_click(match strategy {
            SizeStrategy::Dropdown => DomEffect::Show(loc.size_selector.selector().clone()),
            SizeStrategy::Inline => DomEffect::Show(loc.sizes.selector().clone()),
        });
        let mut size = MockElement::new(&loc.sizes).hidden().text("M");
        size = if popup {
            size.on_click(DomEffect::Show(loc.smart_size_decline.selector().clone()))
        } else {
            size.on_click(DomEffect::Show(loc.complete_order.selector().clone()))
        };
        MockDriver::new()
            .with(add)
            .with(
                MockElement::new(&loc.size_selector)
                    .hidden()
                    .on_click(DomEffect::Show(loc.sizes.selector().clone())),
            )
            .with(MockElement::new(&loc.sizes).hidden().text("S").disabled())
            .with(size)
            .with(
                MockElement::new(&loc.smart_size_decline)
                    .hidden()
                    .on_click(DomEffect::Hide(loc.smart_size_decline.selector().clone()))
                    .on_click(DomEffect::Show(loc.complete_order.selector().clone())),
            )
            .with(
                MockElement::new(&loc.complete_order)
                    .hidden()
                    .on_click(DomEffect::Navigate(
                        "https://www.zara.com/tr/tr/shop/cart".to_string(),
                    )),
            )
    }

    mod selection_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_first_product_and_snapshot() {
            let loc = ProductLocators::default();
            let (_, session) = test_session(listing(&loc, 3));
            let page = ProductPage::new(&session, &loc);
            assert_eq!(page.select_product(ProductChoice::First).await.unwrap(), 0);
            let snap = page.snapshot().await.unwrap();
            assert_eq!(snap.name, "GÖMLEK 0");
            assert_eq!(snap.price_text, "1.690,00 TL");
        }

        #[tokio::test(start_paused = true)]
        async fn test_random_product_in_range() {
            let loc = ProductLocators::default();
            let (_, session) = test_session(listing(&loc, 5));
            let page = ProductPage::new(&session, &loc);
            let index = page.select_product(ProductChoice::Random).await.unwrap();
            assert!(index < 5);
            assert_eq!(page.product_name().await.unwrap(), format!("GÖMLEK {index}"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_rerendered_tile_still_opens() {
            let loc = ProductLocators::default();
            let driver = MockDriver::new()
                .with(MockElement::new(&loc.name).hidden())
                .with(MockElement::new(&loc.price).hidden())
                .with(
                    MockElement::new(&loc.product_links)
                        .stale_on_click(1)
                        .on_click(DomEffect::SetText(
                            loc.name.selector().clone(),
                            "ŞORT".to_string(),
                        ))
                        .on_click(DomEffect::Show(loc.name.selector().clone())),
                );
            let (driver, session) = test_session(driver);
            let page = ProductPage::new(&session, &loc);
            assert_eq!(page.select_product(ProductChoice::First).await.unwrap(), 0);
            assert_eq!(page.product_name().await.unwrap(), "ŞORT");
            assert_eq!(driver.count_calls("click:"), 2);
            assert!(!driver.was_called("js_click:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_index_out_of_range() {
            let loc = ProductLocators::default();
            let (driver, session) = test_session(listing(&loc, 2));
            let err = ProductPage::new(&session, &loc)
                .select_product(ProductChoice::Index(7))
                .await
                .unwrap_err();
            assert!(matches!(err, ShopwalkError::ElementNotFound { .. }));
            assert!(!driver.was_called("click:"));
        }

        #[test]
        fn test_choice_from_yaml() {
            let c: ProductChoice = serde_yaml_ng::from_str("random").unwrap();
            assert_eq!(c, ProductChoice::Random);
            let c: ProductChoice = serde_yaml_ng::from_str("index: 3").unwrap();
            assert_eq!(c, ProductChoice::Index(3));
            let s: SizeStrategy = serde_yaml_ng::from_str("inline").unwrap();
            assert_eq!(s, SizeStrategy::Inline);
        }
    }

    mod add_to_cart_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_dropdown_without_popup() {
            let loc = ProductLocators::default();
            let (driver, session) = test_session(detail(&loc, SizeStrategy::Dropdown, false));
            let state = ProductPage::new(&session, &loc)
                .add_to_cart(SizeStrategy::Dropdown)
                .await
                .unwrap();
            assert_eq!(state, CartState::OrderConfirmed);
            assert!(driver.was_called("click:size selector"));
            assert!(!driver.was_called("click:smart size decline"));
            assert!(driver.current_url().await.unwrap().ends_with("/shop/cart"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_inline_with_popup() {
            let loc = ProductLocators::default();
            let (driver, session) = test_session(detail(&loc, SizeStrategy::Inline, true));
            let state = ProductPage::new(&session, &loc)
                .add_to_cart(SizeStrategy::Inline)
                .await
                .unwrap();
            assert_eq!(state, CartState::OrderConfirmed);
            assert!(!driver.was_called("click:size selector"));
            assert!(driver.was_called("click:smart size decline"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_rerendered_size_item_is_chosen() {
            let loc = ProductLocators::default();
            let (driver, session) = test_session(
                MockDriver::new()
                    .with(
                        MockElement::new(&loc.add_button)
                            .on_click(DomEffect::Show(loc.sizes.selector().clone())),
                    )
                    .with(
                        MockElement::new(&loc.sizes)
                            .hidden()
                            .text("M")
                            .stale_on_click(1)
                            .on_click(DomEffect::Show(loc.complete_order.selector().clone())),
                    )
                    .with(MockElement::new(&loc.complete_order).hidden()),
            );
            let state = ProductPage::new(&session, &loc)
                .add_to_cart(SizeStrategy::Inline)
                .await
                .unwrap();
            assert_eq!(state, CartState::OrderConfirmed);
            assert_eq!(driver.count_calls("click:available sizes"), 2);
            assert!(!driver.was_called("js_click:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_size_list_names_unreached_state() {
            let loc = ProductLocators::default();
            let (_, session) =
                test_session(MockDriver::new().with(MockElement::new(&loc.add_button)));
            let err = ProductPage::new(&session, &loc)
                .add_to_cart(SizeStrategy::Inline)
                .await
                .unwrap_err();
            match err {
                ShopwalkError::UnreachedState { flow, state, source } => {
                    assert_eq!(flow, "add to cart");
                    assert_eq!(state, "SizePickerOpen");
                    assert!(matches!(*source, ShopwalkError::TimeoutExceeded { .. }));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_add_button() {
            let loc = ProductLocators::default();
            let (_, session) = test_session(MockDriver::new());
            let err = ProductPage::new(&session, &loc)
                .add_to_cart(SizeStrategy::Dropdown)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("AddClicked"));
        }
    }
}

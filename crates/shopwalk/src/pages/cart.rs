use super::PageObject;
use crate::catalog::CartLocators;
use crate::locator::Locator;
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::session::Session;
use crate::wait::{Condition, Presence};
use serde::{Deserialize, Serialize};

/// URL fragment of the cart page
pub const CART_PATH: &str = "/shop/cart";

/// Messages the storefront shows for an empty cart
pub const EMPTY_CART_MESSAGES: &[&str] = &[
    "Sepetinizde ürün bulunmamaktadır",
    "Sepetiniz boş",
    "Alışveriş sepetiniz boş",
    "Your cart is empty",
    "Your shopping basket is empty",
];

/// Whether a piece of page text is one of the empty-cart messages
#[must_use]
pub fn is_empty_cart_text(text: &str) -> bool {
    let normalized = normalize(text);
    EMPTY_CART_MESSAGES
        .iter()
        .any(|m| normalized.contains(&normalize(m)))
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// How the line quantity is changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityStrategy {
    /// A `<select>` listing the quantities
    #[default]
    Dropdown,
    /// "+" and "-" buttons around a counter
    Stepper,
}

/// Shopping cart with a single line item
#[derive(Debug, Clone, Copy)]
pub struct CartPage<'s> {
    session: &'s Session,
    loc: &'s CartLocators,
}

impl<'s> CartPage<'s> {
    /// Bind to a session
    #[must_use]
    pub const fn new(session: &'s Session, loc: &'s CartLocators) -> Self {
        Self { session, loc }
    }

    /// Go to the cart unless the browser is already there
    pub async fn open_cart(&self) -> ShopwalkResult<()> {
        let driver = self.session.driver();
        if driver.current_url().await?.contains(CART_PATH) {
            tracing::debug!("already on the cart page");
            return Ok(());
        }
        self.session.interactor().click(&self.loc.cart_icon).await?;
        self.session
            .long_waiter()
            .until_fn("cart page", || async move {
                Ok(driver.current_url().await?.contains(CART_PATH))
            })
            .await?;
        tracing::info!("cart opened");
        Ok(())
    }

    /// Line price exactly as displayed
    pub async fn cart_price(&self) -> ShopwalkResult<String> {
        self.session.long_waiter().visible_text(&self.loc.price).await
    }

    /// Quantity currently shown for the line
    pub async fn quantity(&self, strategy: QuantityStrategy) -> ShopwalkResult<u32> {
        let raw = match strategy {
            QuantityStrategy::Dropdown => {
                let waiter = self.session.waiter();
                let _ = waiter
                    .until(&self.loc.quantity_select, &Condition::Visible)
                    .await?;
                waiter
                    .attribute_value(&self.loc.quantity_select, "value")
                    .await?
            }
            QuantityStrategy::Stepper => {
                self.session
                    .waiter()
                    .visible_text(&self.loc.quantity_value)
                    .await?
            }
        };
        parse_quantity(&raw)
    }

    /// Bring the line to `target` units and verify it.
    ///
    /// The stepper is clicked exactly `|target - current|` times, waiting for
    /// the counter to move after each click.
    pub async fn change_quantity(
        &self,
        target: u32,
        strategy: QuantityStrategy,
    ) -> ShopwalkResult<()> {
        if target == 0 {
            return Err(ShopwalkError::Format {
                input: target.to_string(),
                reason: "quantity must be at least 1".to_string(),
            });
        }
        let ui = self.session.interactor();
        match strategy {
            QuantityStrategy::Dropdown => {
                ui.select(&self.loc.quantity_select, &target.to_string())
                    .await?;
            }
            QuantityStrategy::Stepper => {
                let mut current = self.quantity(strategy).await?;
                let button = if target > current {
                    &self.loc.increment
                } else {
                    &self.loc.decrement
                };
                let steps = current.abs_diff(target);
                for _ in 0..steps {
                    ui.click(button).await?;
                    current = if target > current {
                        current + 1
                    } else {
                        current - 1
                    };
                    let _ = self
                        .session
                        .waiter()
                        .until(
                            &self.loc.quantity_value,
                            &Condition::TextEquals(current.to_string()),
                        )
                        .await?;
                }
            }
        }

        let observed = self.quantity(strategy).await?;
        if observed != target {
            return Err(ShopwalkError::mismatch(
                "cart quantity",
                target.to_string(),
                observed.to_string(),
            ));
        }
        tracing::info!(quantity = target, "quantity updated");
        Ok(())
    }

    /// Remove the line item
    pub async fn remove_product(&self) -> ShopwalkResult<()> {
        self.session.interactor().click(&self.loc.remove).await?;
        tracing::info!("line removed");
        Ok(())
    }

    /// Soft check for the empty-cart message
    pub async fn is_cart_empty(&self) -> ShopwalkResult<bool> {
        let waiter = self.session.long_waiter();
        match waiter.soft(&self.loc.empty_message, &Condition::Visible).await? {
            Presence::Found(_) => {
                let text = waiter.visible_text(&self.loc.empty_message).await?;
                let empty = is_empty_cart_text(&text);
                if !empty {
                    tracing::warn!(text = %text.trim(), "unexpected empty-cart text");
                }
                Ok(empty)
            }
            Presence::Absent => Ok(false),
        }
    }
}

fn parse_quantity(raw: &str) -> ShopwalkResult<u32> {
    raw.trim().parse().map_err(|_| ShopwalkError::Format {
        input: raw.to_string(),
        reason: "not a quantity".to_string(),
    })
}

impl PageObject for CartPage<'_> {
    fn page_name(&self) -> &'static str {
        "cart"
    }

    fn session(&self) -> &Session {
        self.session
    }

    fn signature(&self) -> &Locator {
        &self.loc.price
    }
}

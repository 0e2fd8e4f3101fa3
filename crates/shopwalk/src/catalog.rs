//! Config-driven locator sets, one per page.
//!
//! Defaults match the live Turkish storefront. Any locator can be overridden
//! from the `locators:` section of the config file; overrides without a
//! `name` inherit the field name.

use crate::locator::Locator;
use crate::result::{ShopwalkError, ShopwalkResult};
use serde::{Deserialize, Serialize};

macro_rules! locator_set {
    (
        $(#[$meta:meta])*
        $set:ident {
            $( $(#[$fmeta:meta])* $field:ident => $default:expr, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $set {
            $( $(#[$fmeta])* pub $field: Locator, )+
        }

        impl Default for $set {
            fn default() -> Self {
                Self { $( $field: $default, )+ }
            }
        }

        impl $set {
            /// Every locator with its field name
            #[must_use]
            pub fn entries(&self) -> Vec<(&'static str, &Locator)> {
                vec![ $( (stringify!($field), &self.$field), )+ ]
            }

            fn normalize(&mut self) {
                $( self.$field.ensure_name(stringify!($field)); )+
            }
        }
    };
}

locator_set! {
    /// Header, cookie banner and top navigation
    HomeLocators {
        /// Cookie consent "accept" button
        cookie_accept => Locator::css("cookie accept", "#onetrust-accept-btn-handler"),
        /// Header "log in" link
        account_link => Locator::css("login link", "a[data-qa-id='layout-header-user-logon']"),
        /// Only present for a signed-in user
        logged_in_marker => Locator::css("account menu", "a[data-qa-id='layout-header-account']"),
        /// Men's category entry
        men_menu => Locator::css("men menu", "a[aria-label='Erkek']"),
        /// "See all" link of the open category
        see_all => Locator::xpath("see all", "//a[contains(text(), 'TÜMÜNÜ GÖR')]"),
        /// Header search opener
        search_open => Locator::css("search opener", "a[data-qa-id='header-search-text-link']"),
    }
}

locator_set! {
    /// Login landing page and form
    LoginLocators {
        /// "GİRİŞ YAP" button on the landing page
        landing_login => Locator::css("login form button", "button[data-qa-id='oauth-logon-button']"),
        /// E-mail input
        email => Locator::id("email", "logonId"),
        /// Password input
        password => Locator::id("password", "logonPassword"),
        /// Submit button
        submit => Locator::css("login submit", "button[data-testid='login-button']"),
    }
}

locator_set! {
    /// Account menu and log-out
    LogoutLocators {
        /// User name in the header
        profile_header => Locator::css("profile header", "a[data-qa-id='layout-header-account']"),
        /// "PROFİL" side-menu item
        profile_menu => Locator::xpath("profile menu", "//span[normalize-space()='PROFİL']"),
        /// "Oturumu sonlandır" button
        logout_button => Locator::xpath("logout button", "//span[normalize-space()='Oturumu sonlandır']"),
    }
}

locator_set! {
    /// Search box and result grid
    SearchLocators {
        /// Search input
        input => Locator::css("search input", "input[type='search']"),
        /// Result tiles
        results => Locator::css("search results", "a.product-link"),
    }
}

locator_set! {
    /// Product grid and product detail page
    ProductLocators {
        /// Product tiles of a listing
        product_links => Locator::css("product links", "a.product-link"),
        /// Product title
        name => Locator::css("product name", ".product-detail-info__header-name"),
        /// Product price
        price => Locator::css("product price", ".product-detail-info__price"),
        /// "Ekle" button
        add_button => Locator::xpath("add button", "//button[.//span[contains(text(),'Ekle')]]"),
        /// Size dropdown opener
        size_selector => Locator::xpath("size selector", "//button[contains(@aria-label, 'Bir beden seçin')]"),
        /// Available sizes
        sizes => Locator::css("available sizes", "ul.size-selector-sizes li.size-selector-sizes__size--enabled"),
        /// Smart-size popup dismiss button
        smart_size_decline => Locator::xpath("smart size decline", "//button[contains(text(),'Hayır, teşekkürler')]"),
        /// "Siparişi Tamamla" link
        complete_order => Locator::xpath("complete order", "//a[.//span[contains(text(),'Siparişi Tamamla')]]"),
    }
}

locator_set! {
    /// Shopping cart
    CartLocators {
        /// Header cart link
        cart_icon => Locator::css("cart icon", "a[data-testid='cart-link']"),
        /// Line price
        price => Locator::css("cart price", ".price__amount"),
        /// Quantity dropdown
        quantity_select => Locator::css("quantity select", "select.quantity-selector"),
        /// Stepper "+"
        increment => Locator::css("quantity increment", "button[data-qa-id='add-order-item-unit']"),
        /// Stepper "-"
        decrement => Locator::css("quantity decrement", "button[data-qa-id='remove-order-item-unit']"),
        /// Stepper count
        quantity_value => Locator::css("quantity value", ".zds-quantity-selector__units"),
        /// Remove-item button
        remove => Locator::css("remove item", "button[data-testid='remove-item']"),
        /// Empty-cart message
        empty_message => Locator::xpath("empty cart message", "//p[contains(text(), 'Sepetinizde ürün bulunmamaktadır')]"),
    }
}

/// Every page's locators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorCatalog {
    /// Home page
    pub home: HomeLocators,
    /// Login pages
    pub login: LoginLocators,
    /// Log-out path
    pub logout: LogoutLocators,
    /// Search
    pub search: SearchLocators,
    /// Product listing and detail
    pub product: ProductLocators,
    /// Cart
    pub cart: CartLocators,
}

impl LocatorCatalog {
    /// Name unnamed overrides after their field
    pub fn normalize(&mut self) {
        self.home.normalize();
        self.login.normalize();
        self.logout.normalize();
        self.search.normalize();
        self.product.normalize();
        self.cart.normalize();
    }

    /// Every locator keyed `page.field`
    #[must_use]
    pub fn entries(&self) -> Vec<(String, &Locator)> {
        let pages: [(&str, Vec<(&'static str, &Locator)>); 6] = [
            ("home", self.home.entries()),
            ("login", self.login.entries()),
            ("logout", self.logout.entries()),
            ("search", self.search.entries()),
            ("product", self.product.entries()),
            ("cart", self.cart.entries()),
        ];
        pages
            .into_iter()
            .flat_map(|(page, entries)| {
                entries
                    .into_iter()
                    .map(move |(field, loc)| (format!("{page}.{field}"), loc))
            })
            .collect()
    }

    /// Syntax-check every selector; reports all problems at once
    pub fn validate(&self) -> ShopwalkResult<()> {
        let problems: Vec<String> = self
            .entries()
            .into_iter()
            .filter_map(|(key, loc)| loc.selector().validate().err().map(|e| format!("{key}: {e}")))
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ShopwalkError::config(format!(
                "invalid locators: {}",
                problems.join("; ")
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::Selector;

    #[test]
    fn test_defaults_validate() {
        LocatorCatalog::default().validate().unwrap();
    }

    #[test]
    fn test_entries_are_keyed_by_page() {
        let catalog = LocatorCatalog::default();
        let entries = catalog.entries();
        assert!(entries.iter().any(|(k, _)| k == "cart.empty_message"));
        assert!(entries.iter().any(|(k, _)| k == "login.email"));
        assert_eq!(entries.len(), 31);
    }

    #[test]
    fn test_defaults_carry_storefront_selectors() {
        let c = LocatorCatalog::default();
        assert_eq!(c.login.email.selector(), &Selector::id("logonId"));
        assert_eq!(c.cart.price.selector(), &Selector::css(".price__amount"));
        assert_eq!(c.search.input.selector(), &Selector::css("input[type='search']"));
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let yaml = "cart:\n  price:\n    css: \".cart-total\"\n";
        let mut catalog: LocatorCatalog = serde_yaml_ng::from_str(yaml).unwrap();
        catalog.normalize();
        assert_eq!(catalog.cart.price.selector(), &Selector::css(".cart-total"));
        assert_eq!(catalog.cart.price.name(), "price");
        assert_eq!(catalog.cart.remove, CartLocators::default().remove);
        assert_eq!(catalog.home, HomeLocators::default());
    }

    #[test]
    fn test_validate_reports_every_bad_locator() {
        let yaml = "home:\n  see_all:\n    xpath: \"a[text()]\"\nsearch:\n  input:\n    css: \"\"\n";
        let catalog: LocatorCatalog = serde_yaml_ng::from_str(yaml).unwrap();
        let msg = catalog.validate().unwrap_err().to_string();
        assert!(msg.contains("home.see_all"));
        assert!(msg.contains("search.input"));
    }
}

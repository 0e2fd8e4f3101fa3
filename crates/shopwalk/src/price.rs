//! Turkish-locale price parsing.
//!
//! The storefront renders prices as `1.690,00 TL`: `.` groups thousands,
//! `,` separates kuruş and the currency comes last (`TL` or `₺`, which may
//! also lead). Prices are kept in minor units so comparisons are exact.

use crate::result::{ShopwalkError, ShopwalkResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Price in kuruş (1/100 TL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    minor: i64,
}

impl Price {
    /// From minor units
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Minor units
    #[must_use]
    pub const fn minor(&self) -> i64 {
        self.minor
    }

    /// Value in lira
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.minor as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lira = self.minor / 100;
        let kurus = self.minor % 100;
        let digits = lira.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "{grouped},{kurus:02} TL")
    }
}

fn grammar() -> ShopwalkResult<&'static Regex> {
    static GRAMMAR: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| {
            Regex::new(r"^(?:₺\s*)?(\d{1,3}(?:\.\d{3})+|\d+)(?:,(\d{1,2}))?\s*(?:TL|TRY|₺)?$")
        })
        .as_ref()
        .map_err(|e| ShopwalkError::config(format!("price grammar: {e}")))
}

/// Parse a displayed price such as `1.690,00 TL` or `89,95 TL`
pub fn parse_price(text: &str) -> ShopwalkResult<Price> {
    let trimmed = text.trim();
    let format_error = |reason: &str| ShopwalkError::Format {
        input: text.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(format_error("empty price"));
    }
    let caps = grammar()?
        .captures(trimmed)
        .ok_or_else(|| format_error("expected digits like 1.690,00 followed by TL"))?;

    let lira: i64 = caps[1]
        .replace('.', "")
        .parse()
        .map_err(|_| format_error("amount out of range"))?;
    let kurus: i64 = match caps.get(2) {
        Some(m) if m.as_str().len() == 1 => m.as_str().parse::<i64>().unwrap_or(0) * 10,
        Some(m) => m.as_str().parse().unwrap_or(0),
        None => 0,
    };
    lira.checked_mul(100)
        .and_then(|v| v.checked_add(kurus))
        .map(Price::from_minor)
        .ok_or_else(|| format_error("amount out of range"))
}

/// Whether two displayed prices denote the same amount
pub fn same_price(a: &str, b: &str) -> ShopwalkResult<bool> {
    Ok(parse_price(a)? == parse_price(b)?)
}

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Input validation rules and the messages reported to API users.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

/// Products with stock strictly below this are restocked.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// Units added to each low-stock product.
pub const RESTOCK_AMOUNT: i32 = 10;

/// Largest price a `NUMERIC(10, 2)` column accepts.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Largest order total a `NUMERIC(12, 2)` column accepts.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Accepted phone formats: `+` followed by 7-15 digits, or `123-456-7890`.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+\d{7,15}|\d{3}-\d{3}-\d{4})$").expect("phone pattern is valid")
});

/// User-facing messages.
pub mod messages {
    /// Duplicate email on single create.
    pub const EMAIL_EXISTS: &str = "Email already exists";
    /// Phone does not match [`super::validate_phone`].
    pub const INVALID_PHONE: &str = "Invalid phone format. Use +1234567890 or 123-456-7890";
    /// Price at or below zero.
    pub const PRICE_NOT_POSITIVE: &str = "Price must be positive";
    /// Price that is not a decimal literal.
    pub const INVALID_PRICE: &str = "Invalid price format";
    /// Price above [`super::MAX_PRICE`].
    pub const PRICE_TOO_LARGE: &str = "Price cannot exceed 99999999.99";
    /// Negative stock.
    pub const NEGATIVE_STOCK: &str = "Stock cannot be negative";
    /// Order for an unknown customer.
    pub const INVALID_CUSTOMER: &str = "Invalid customer ID";
    /// Order total above [`super::MAX_ORDER_TOTAL`].
    pub const ORDER_TOTAL_TOO_LARGE: &str = "Order total cannot exceed 9999999999.99";
    /// Order without products.
    pub const NO_PRODUCTS: &str = "At least one product must be selected";
    /// Successful single create.
    pub const CUSTOMER_CREATED: &str = "Customer created successfully";
    /// Successful restock.
    pub const RESTOCKED: &str = "Low stock products restocked successfully.";
}

/// Check a phone number. Absent and blank numbers are valid.
pub fn validate_phone(phone: Option<&str>) -> bool {
    match phone {
        None => true,
        Some("") => true,
        Some(p) => PHONE_RE.is_match(p),
    }
}

/// Round to cents, half to even, with the scale fixed at two.
pub fn quantize_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    rounded
}

/// Parse a decimal literal (`"19.99"`, `"5"`, `"1e2"`) into a quantized amount.
pub fn parse_money(raw: &str) -> Result<Decimal, &'static str> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map(quantize_money)
        .map_err(|_| messages::INVALID_PRICE)
}

/// Trim an optional string, collapsing blank values to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Format the error for order product ids that do not exist.
pub fn invalid_product_ids(missing: &[String]) -> String {
    format!("Invalid product ID(s): {}", missing.join(", "))
}

/// Convert a quantized amount to integer cents, saturating at the `i64` bounds.
pub fn to_cents(value: Decimal) -> i64 {
    let saturated = if value.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    };
    quantize_money(value)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| i64::try_from(cents.trunc()).ok())
        .unwrap_or(saturated)
}

/// Convert integer cents back to an amount with scale two.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

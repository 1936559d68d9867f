// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Custom GraphQL scalars.

use async_graphql::{InputValueError, InputValueResult, Scalar, ScalarType, Value};
use crm_core::validation::parse_money;
use rust_decimal::Decimal;

/// Money amount exposed as the `Decimal` scalar.
///
/// Serialized as a string so no precision is lost. Input accepts a string or
/// a number and is rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money(pub Decimal);

#[Scalar(name = "Decimal")]
impl ScalarType for Money {
    fn parse(value: Value) -> InputValueResult<Self> {
        let raw = match &value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(InputValueError::expected_type(value)),
        };
        parse_money(&raw).map(Money).map_err(InputValueError::custom)
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_string())
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Pos;

    #[test]
    fn test_parse_string_and_number() {
        let money = Money::parse(Value::String("19.999".to_string())).unwrap();
        assert_eq!(money.0.to_string(), "20.00");

        let money = Money::parse(Value::from(5)).unwrap();
        assert_eq!(money.0.to_string(), "5.00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Money::parse(Value::String("cheap".to_string())).unwrap_err();
        let server_error = err.into_server_error(Pos { line: 1, column: 1 });
        assert!(server_error.message.contains("Invalid price format"));

        assert!(Money::parse(Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_output_is_string() {
        let money = Money(Decimal::new(99999, 2));
        assert_eq!(money.to_value(), Value::String("999.99".to_string()));
    }
}

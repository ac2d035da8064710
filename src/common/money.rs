// src/common/money.rs

//! Utilitários monetários sobre `rust_decimal`.
//! Todo valor em reais é arredondado para centavos (2 casas, meio para longe do zero).

use rust_decimal::prelude::*;
use validator::ValidationError;

use crate::common::error::AppError;

const DECIMAL_PLACES: u32 = 2;

/// Tolerância para comparações monetárias (0,01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

/// Maior valor que cabe em `NUMERIC(12,2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Valor monetário válido: não negativo, até `MAX_AMOUNT` e com no máximo duas casas decimais.
pub fn validate_amount(value: Decimal, field: &str) -> Result<(), AppError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::InvalidAmount(format!(
            "{} não pode ser negativo, recebido {}",
            field, value
        )));
    }
    if value > MAX_AMOUNT {
        return Err(AppError::InvalidAmount(format!(
            "{} excede o limite de {}, recebido {}",
            field, MAX_AMOUNT, value
        )));
    }
    if value.round_dp(DECIMAL_PLACES) != value {
        return Err(AppError::InvalidAmount(format!(
            "{} deve ter no máximo {} casas decimais, recebido {}",
            field, DECIMAL_PLACES, value
        )));
    }
    Ok(())
}

/// Versão para `#[validate(custom(...))]` dos payloads.
pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub fn sum<'a>(values: impl IntoIterator<Item = &'a Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, |acc, v| acc + *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(10005, 3)), Decimal::new(1001, 2));
        assert_eq!(round_money(Decimal::new(-10005, 3)), Decimal::new(-1001, 2));
    }

    #[test]
    fn tolerance_comparison() {
        assert!(money_eq(Decimal::new(3333, 2), Decimal::new(33334, 3)));
        assert!(!money_eq(Decimal::new(3333, 2), Decimal::new(3334, 2)));
    }

    #[test]
    fn amount_validation() {
        assert!(validate_amount(Decimal::ZERO, "valor").is_ok());
        assert!(validate_amount(Decimal::new(1999, 2), "valor").is_ok());
        assert!(matches!(
            validate_amount(Decimal::new(-1, 2), "valor"),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(Decimal::new(1001, 3), "valor"),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn amount_is_capped_at_column_precision() {
        assert_eq!(MAX_AMOUNT, Decimal::new(999_999_999_999, 2));
        assert!(validate_amount(MAX_AMOUNT, "valor").is_ok());
        assert!(matches!(
            validate_amount(MAX_AMOUNT + Decimal::new(1, 2), "valor"),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(Decimal::from(10_i64.pow(15)), "valor"),
            Err(AppError::InvalidAmount(_))
        ));
    }
}

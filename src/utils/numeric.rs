use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Valeur numérique venant d'un formulaire: nombre JSON ou chaîne ("12.50")
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Number(value.into())
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl NumericInput {
    fn raw(&self) -> String {
        match self {
            NumericInput::Number(n) => n.to_string(),
            NumericInput::Text(s) => s.trim().to_string(),
        }
    }
}

/// Parse un montant: rejeté s'il n'est pas numérique, négatif ou a plus de 2 décimales
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("{} is required", field));
    }

    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| format!("{} must be a valid number", field))?
        .normalize();

    if value.is_sign_negative() && !value.is_zero() {
        return Err(format!("{} must not be negative", field));
    }
    if value.scale() > 2 {
        return Err(format!("{} must have at most 2 decimal places", field));
    }

    Ok(value)
}

pub fn parse_price(input: &NumericInput) -> Result<Decimal, String> {
    parse_amount("price", &input.raw())
}

/// Stock: entier positif ou nul, pas de décimales acceptées
pub fn parse_stock(input: &NumericInput) -> Result<i32, String> {
    let value = match input {
        NumericInput::Number(n) => n
            .as_i64()
            .ok_or_else(|| "stock must be a whole number".to_string())?,
        NumericInput::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| "stock must be a whole number".to_string())?,
    };

    if value < 0 {
        return Err("stock must not be negative".to_string());
    }

    i32::try_from(value).map_err(|_| "stock is too large".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_accepts_numbers_and_strings() {
        assert_eq!(parse_price(&NumericInput::from(100)).unwrap(), Decimal::from(100));
        assert_eq!(
            parse_price(&NumericInput::from("19.99")).unwrap(),
            Decimal::from_str("19.99").unwrap()
        );
        assert_eq!(parse_price(&NumericInput::from(" 1.50 ")).unwrap(), Decimal::from_str("1.5").unwrap());
    }

    #[test]
    fn test_price_rejects_garbage() {
        assert!(parse_price(&NumericInput::from("abc")).is_err());
        assert!(parse_price(&NumericInput::from("NaN")).is_err());
        assert!(parse_price(&NumericInput::from("")).is_err());
        assert!(parse_price(&NumericInput::from("-5")).is_err());
        assert!(parse_price(&NumericInput::from("1.999")).is_err());
    }

    #[test]
    fn test_price_from_json_float() {
        let input: NumericInput = serde_json::from_str("12.5").unwrap();
        assert_eq!(parse_price(&input).unwrap(), Decimal::from_str("12.5").unwrap());
    }

    #[test]
    fn test_stock_parsing() {
        assert_eq!(parse_stock(&NumericInput::from(3)).unwrap(), 3);
        assert_eq!(parse_stock(&NumericInput::from("7")).unwrap(), 7);
        assert!(parse_stock(&NumericInput::from("2.5")).is_err());
        assert!(parse_stock(&NumericInput::from(-1)).is_err());

        let float: NumericInput = serde_json::from_str("2.5").unwrap();
        assert!(parse_stock(&float).is_err());
    }
}

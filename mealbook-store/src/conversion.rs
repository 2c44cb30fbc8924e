//! Unit conversion engine
//!
//! Pure functions over ingredient quantities:
//! - scaling a recipe up or down by a factor
//! - metric rollover between grams/kilograms and milliliters/liters
//! - singular/plural unit label selection
//! - display formatting of quantities
//!
//! Nothing here touches the database. Callers persist the returned
//! ingredients through the recipe repository if they want to keep them.

use crate::db::models::Ingredient;
use crate::vocab::{plural_unit, singular_unit, GRAM, KILOGRAM, LITER, MILLILITER};
use crate::{Error, Result};
use tracing::{debug, warn};

/// Threshold at which a small metric unit rolls over to the large one
const METRIC_ROLLOVER: f64 = 1000.0;

/// Direction of a scaling operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOp {
    Multiply,
    Divide,
}

impl ScaleOp {
    fn apply(self, quantity: f64, factor: f64) -> f64 {
        match self {
            ScaleOp::Multiply => quantity * factor,
            ScaleOp::Divide => quantity / factor,
        }
    }
}

/// Parse the leading decimal number of a quantity string
///
/// Mirrors how quantities typed into the app are read: leading whitespace is
/// ignored and anything after the numeric prefix ("1.5 heaped") is dropped.
/// Returns `None` when no number is present.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut seen_digit = end > int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        let has_fraction = frac > end + 1;
        if seen_digit || has_fraction {
            seen_digit = true;
            end = frac;
        }
    }

    if !seen_digit {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        let exp_digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > exp_digits {
            end = exp;
        }
    }

    s[..end].parse::<f64>().ok().filter(|q| q.is_finite())
}

/// Move a quantity one step across the metric scale when it crosses 1000 (or drops below 1)
///
/// Single step only: there is no unit above kilogram/liter in the vocabulary,
/// so 2,000,000 grams becomes 2000 kilograms and stays there.
pub fn rollover(quantity: f64, unit: &str) -> (f64, String) {
    let canonical = singular_unit(unit).unwrap_or(unit);

    match canonical {
        GRAM if quantity >= METRIC_ROLLOVER => {
            (quantity / METRIC_ROLLOVER, KILOGRAM.to_string())
        }
        MILLILITER if quantity >= METRIC_ROLLOVER => {
            (quantity / METRIC_ROLLOVER, LITER.to_string())
        }
        KILOGRAM if quantity < 1.0 => (quantity * METRIC_ROLLOVER, GRAM.to_string()),
        LITER if quantity < 1.0 => (quantity * METRIC_ROLLOVER, MILLILITER.to_string()),
        _ => (quantity, unit.to_string()),
    }
}

/// Pick the singular or plural display form of a unit for a quantity
///
/// Units outside the vocabulary pass through unchanged.
pub fn format_unit(quantity: f64, unit: &str) -> String {
    let form = if quantity > 1.0 {
        plural_unit(unit)
    } else {
        singular_unit(unit)
    };
    form.unwrap_or(unit).to_string()
}

/// Render a quantity for storage and display
///
/// Whole numbers have no decimal part; anything else is rounded to two
/// decimals with trailing zeros removed ("1.5", "0.33").
pub fn format_quantity(quantity: f64) -> String {
    let rounded = round_quantity(quantity);
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        return format!("{:.0}", rounded);
    }
    let fixed = format!("{:.2}", rounded);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn round_quantity(quantity: f64) -> f64 {
    (quantity * 100.0).round() / 100.0
}

/// Roll over, then render quantity and unit label from the same rounded value
fn display_pair(quantity: f64, unit: &str) -> (String, String) {
    let (quantity, unit) = rollover(round_quantity(quantity), unit);
    let quantity = round_quantity(quantity);
    (format_quantity(quantity), format_unit(quantity, &unit))
}

/// Scale every ingredient by `factor`, then roll over metric units and re-pick unit labels
///
/// Fails with `InvalidFactor` before touching anything when the factor is not
/// a positive finite number. Ingredients whose quantity is not a number are
/// returned unchanged.
pub fn apply_factor(
    ingredients: &[Ingredient],
    op: ScaleOp,
    factor: f64,
) -> Result<Vec<Ingredient>> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(Error::InvalidFactor(factor));
    }

    debug!("Scaling {} ingredients: {:?} by {}", ingredients.len(), op, factor);

    let scaled = ingredients
        .iter()
        .map(|ingredient| match parse_quantity(&ingredient.quantity) {
            Some(quantity) => {
                let (quantity, unit) = display_pair(op.apply(quantity, factor), &ingredient.unit);
                Ingredient {
                    quantity,
                    unit,
                    ..ingredient.clone()
                }
            }
            None => {
                warn!(
                    "Ingredient '{}' has non-numeric quantity '{}', left unscaled",
                    ingredient.name, ingredient.quantity
                );
                ingredient.clone()
            }
        })
        .collect();

    Ok(scaled)
}

/// Build a stored ingredient from freshly entered form values
///
/// Applies the same rollover, unit label and quantity formatting as scaling
/// so new and scaled ingredients look alike.
pub fn normalize_ingredient(
    name: &str,
    quantity: f64,
    unit: &str,
    department: Option<&str>,
) -> Result<Ingredient> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("ingredient name is empty".to_string()));
    }
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(Error::InvalidInput(format!(
            "ingredient '{}' has invalid quantity {}",
            name, quantity
        )));
    }

    let (quantity, unit) = display_pair(quantity, unit);

    Ok(Ingredient {
        name: name.to_string(),
        quantity,
        unit,
        department: department.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str, quantity: &str, unit: &str) -> Ingredient {
        Ingredient {
            name: name.to_string(),
            quantity: quantity.to_string(),
            unit: unit.to_string(),
            department: None,
        }
    }

    #[test]
    fn test_parse_quantity_forms() {
        assert_eq!(parse_quantity("2"), Some(2.0));
        assert_eq!(parse_quantity(" 1.5"), Some(1.5));
        assert_eq!(parse_quantity(".5"), Some(0.5));
        assert_eq!(parse_quantity("3 heaped"), Some(3.0));
        assert_eq!(parse_quantity("1e3"), Some(1000.0));
        assert_eq!(parse_quantity("abc"), None);
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("."), None);
    }

    #[test]
    fn test_multiply_rolls_grams_to_kilograms() {
        let result = apply_factor(&[ingredient("קמח", "500", GRAM)], ScaleOp::Multiply, 3.0)
            .unwrap();
        assert_eq!(result[0].quantity, "1.5");
        assert_eq!(result[0].unit, KILOGRAM);
        assert_eq!(result[0].name, "קמח");
    }

    #[test]
    fn test_rollover_is_single_step() {
        let (quantity, unit) = rollover(2_000_000.0, GRAM);
        assert_eq!(quantity, 2000.0);
        assert_eq!(unit, KILOGRAM);
    }

    #[test]
    fn test_divide_rolls_kilograms_down_to_grams() {
        let result = apply_factor(&[ingredient("סוכר", "1", KILOGRAM)], ScaleOp::Divide, 4.0)
            .unwrap();
        assert_eq!(result[0].quantity, "250");
        assert_eq!(result[0].unit, GRAM);
    }

    #[test]
    fn test_milliliters_roll_to_liters_and_pluralize() {
        let result = apply_factor(&[ingredient("מים", "750", MILLILITER)], ScaleOp::Multiply, 4.0)
            .unwrap();
        assert_eq!(result[0].quantity, "3");
        assert_eq!(result[0].unit, "ליטרים");
    }

    #[test]
    fn test_plural_liters_roll_down() {
        let result = apply_factor(&[ingredient("חלב", "2", "ליטרים")], ScaleOp::Divide, 4.0)
            .unwrap();
        assert_eq!(result[0].quantity, "500");
        assert_eq!(result[0].unit, MILLILITER);
    }

    #[test]
    fn test_pluralization_follows_quantity() {
        let doubled = apply_factor(&[ingredient("אורז", "1", "כוס")], ScaleOp::Multiply, 2.0)
            .unwrap();
        assert_eq!(doubled[0].quantity, "2");
        assert_eq!(doubled[0].unit, "כוסות");

        let halved = apply_factor(&doubled, ScaleOp::Divide, 2.0).unwrap();
        assert_eq!(halved[0].quantity, "1");
        assert_eq!(halved[0].unit, "כוס");
    }

    #[test]
    fn test_fractional_quantity_two_decimals() {
        let result = apply_factor(&[ingredient("שמן", "1", "כף")], ScaleOp::Divide, 3.0).unwrap();
        assert_eq!(result[0].quantity, "0.33");
        assert_eq!(result[0].unit, "כף");
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        let result = apply_factor(&[ingredient("sugar", "1", "cup")], ScaleOp::Multiply, 3.0)
            .unwrap();
        assert_eq!(result[0].quantity, "3");
        assert_eq!(result[0].unit, "cup");
    }

    #[test]
    fn test_non_numeric_quantity_left_unchanged() {
        let original = ingredient("מלח", "לפי הטעם", "קורט");
        let result = apply_factor(std::slice::from_ref(&original), ScaleOp::Multiply, 2.0).unwrap();
        assert_eq!(result[0], original);
    }

    #[test]
    fn test_invalid_factors_rejected() {
        let input = vec![ingredient("קמח", "500", GRAM)];
        for factor in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let result = apply_factor(&input, ScaleOp::Multiply, factor);
            assert!(matches!(result, Err(Error::InvalidFactor(_))), "factor {} accepted", factor);
        }
        assert_eq!(input[0].quantity, "500");
    }

    #[test]
    fn test_unit_label_follows_rounded_quantity() {
        let result = apply_factor(&[ingredient("קמח", "1", "כוס")], ScaleOp::Multiply, 1.001)
            .unwrap();
        assert_eq!(result[0].quantity, "1");
        assert_eq!(result[0].unit, "כוס");

        let result = apply_factor(&[ingredient("קמח", "999.999", GRAM)], ScaleOp::Multiply, 1.0)
            .unwrap();
        assert_eq!(result[0].quantity, "1");
        assert_eq!(result[0].unit, KILOGRAM);

        let ing = normalize_ingredient("מלח", 1.004, "כפיות", None).unwrap();
        assert_eq!(ing.quantity, "1");
        assert_eq!(ing.unit, "כפית");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(1500.0), "1500");
        assert_eq!(format_quantity(1.5), "1.5");
        assert_eq!(format_quantity(2.0 / 3.0), "0.67");
        assert_eq!(format_quantity(0.999), "1");
        assert_eq!(format_quantity(0.0), "0");
    }

    #[test]
    fn test_format_unit_singular_for_one_or_less() {
        assert_eq!(format_unit(1.0, "כפות"), "כף");
        assert_eq!(format_unit(0.5, "כפיות"), "כפית");
        assert_eq!(format_unit(3.0, "יחידה"), "יחידות");
        assert_eq!(format_unit(3.0, "קילוגרם"), KILOGRAM);
    }

    #[test]
    fn test_normalize_ingredient() {
        let dairy = Some("מוצרי חלב וביצים");
        let ing = normalize_ingredient(" שמנת ", 1200.0, MILLILITER, dairy).unwrap();
        assert_eq!(ing.name, "שמנת");
        assert_eq!(ing.quantity, "1.2");
        assert_eq!(ing.unit, "ליטרים");
        assert_eq!(ing.department.as_deref(), Some("מוצרי חלב וביצים"));

        assert!(matches!(normalize_ingredient("", 1.0, GRAM, None), Err(Error::InvalidInput(_))));
        assert!(matches!(normalize_ingredient("x", 0.0, GRAM, None), Err(Error::InvalidInput(_))));
    }
}

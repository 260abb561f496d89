//! Small helpers shared across the engine

use serde_json::Value;

/// Current UTC time as an RFC 3339 string
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Coerce a raw document value into a line-item quantity.
///
/// Quantities arrive as JSON numbers, numeric strings, or garbage. The rule
/// is `floor ∘ max(0, _)` after a finite-number check; anything that fails
/// the check coerces to zero.
pub fn coerce_quantity(value: Option<&Value>) -> i64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => n.max(0.0).floor() as i64,
        _ => 0,
    }
}

/// Coerce a raw document value into a price
pub fn coerce_price(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Build the grouping key for a distributed order item:
/// `"{itemId}_{extras-csv}_{excluded-csv}"` with both lists sorted before
/// joining so that equal selections always land on the same document.
pub fn group_key(item_id: &str, extras: &[String], excluded: &[String]) -> String {
    format!("{}_{}_{}", item_id, sorted_csv(extras), sorted_csv(excluded))
}

fn sorted_csv(values: &[String]) -> String {
    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_quantity_numbers() {
        assert_eq!(coerce_quantity(Some(&json!(3))), 3);
        assert_eq!(coerce_quantity(Some(&json!(2.9))), 2);
        assert_eq!(coerce_quantity(Some(&json!(-1))), 0);
        assert_eq!(coerce_quantity(Some(&json!(0))), 0);
    }

    #[test]
    fn test_coerce_quantity_strings_and_garbage() {
        assert_eq!(coerce_quantity(Some(&json!("4"))), 4);
        assert_eq!(coerce_quantity(Some(&json!(" 2.5 "))), 2);
        assert_eq!(coerce_quantity(Some(&json!("abc"))), 0);
        assert_eq!(coerce_quantity(Some(&json!(null))), 0);
        assert_eq!(coerce_quantity(Some(&json!([1]))), 0);
        assert_eq!(coerce_quantity(None), 0);
    }

    #[test]
    fn test_group_key_sorts_selections() {
        let extras = vec!["onion".to_string(), "cheese".to_string()];
        let excluded = vec!["salt".to_string()];
        assert_eq!(group_key("x1", &extras, &excluded), "x1_cheese,onion_salt");
        assert_eq!(group_key("x1", &[], &[]), "x1__");
    }

    #[test]
    fn test_group_key_equal_for_reordered_extras() {
        let a = vec!["a".to_string(), "b".to_string()];
        let b = vec!["b".to_string(), "a".to_string()];
        assert_eq!(group_key("x", &a, &[]), group_key("x", &b, &[]));
    }
}

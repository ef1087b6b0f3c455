use serde_json::{Number, Value};

/// Converts numeric-looking strings (ASCII digits with at most one `.`) into
/// JSON numbers, walking the whole value. Returns how many strings changed.
pub fn coerce_numerics(value: &mut Value) -> usize {
    match value {
        Value::String(text) => match parse_numeric(text) {
            Some(number) => {
                *value = Value::Number(number);
                1
            }
            None => 0,
        },
        Value::Array(items) => items.iter_mut().map(coerce_numerics).sum(),
        Value::Object(map) => map.values_mut().map(coerce_numerics).sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

/// `"42"` is an integer, `"4.5"`, `".5"` and `"5."` are floats. Signs,
/// exponents, separators and integers too large for 64 bits are rejected.
pub fn parse_numeric(text: &str) -> Option<Number> {
    let mut dots = 0;
    let mut digits = 0;
    for value in text.chars() {
        match value {
            '.' => dots += 1,
            '0'..='9' => digits += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }

    if dots == 0 {
        return text
            .parse::<u64>()
            .ok()
            .map(Number::from);
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::{coerce_numerics, parse_numeric};

    #[test]
    fn numeric_strings_become_numbers_deep_in_the_tree() {
        let mut tree = serde_json::json!({
            "designConditions": {"designPressure": "150", "designTemperature": "120.5"},
            "nozzles": [{"size": "4", "rating": "150#", "schedule": ["40", "XS"]}],
            "flag": true
        });
        let changed = coerce_numerics(&mut tree);

        assert_eq!(changed, 4);
        assert_eq!(tree["designConditions"]["designPressure"], 150);
        assert_eq!(tree["designConditions"]["designTemperature"], 120.5);
        assert_eq!(tree["nozzles"][0]["size"], 4);
        assert_eq!(tree["nozzles"][0]["rating"], "150#");
        assert_eq!(tree["nozzles"][0]["schedule"], serde_json::json!([40, "XS"]));
    }

    #[test]
    fn rejects_signed_exponent_and_oversized_values() {
        assert!(parse_numeric("-1").is_none());
        assert!(parse_numeric("1e3").is_none());
        assert!(parse_numeric("1.2.3").is_none());
        assert!(parse_numeric(".").is_none());
        assert!(parse_numeric("").is_none());
        assert!(parse_numeric("99999999999999999999999").is_none());
        assert_eq!(parse_numeric(".5").and_then(|n| n.as_f64()), Some(0.5));
    }
}

use fieldscope_lens::contract::NormalizerKind;
use serde_json::Value;

fn trim(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

fn lowercase(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    }
}

/// Parses as float, then truncates toward zero (not rounds) per the
/// normalizer's spec.
fn round_integer(value: Value) -> Value {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|n| serde_json::json!(n.trunc() as i64))
            .unwrap_or(Value::String(s)),
        Value::Number(n) => n
            .as_f64()
            .map(|f| serde_json::json!(f.trunc() as i64))
            .unwrap_or(Value::Number(n)),
        other => other,
    }
}

/// Apply normalizers left to right, the order they appear in the lens.
pub fn apply_normalizers(normalizers: &[NormalizerKind], value: Value) -> Value {
    normalizers.iter().fold(value, |acc, kind| match kind {
        NormalizerKind::Trim => trim(acc),
        NormalizerKind::Lowercase => lowercase(acc),
        NormalizerKind::RoundInteger => round_integer(acc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_trim_then_lowercase() {
        let result = apply_normalizers(&[NormalizerKind::Trim, NormalizerKind::Lowercase], Value::String("  PADEL ".to_string()));
        assert_eq!(result, Value::String("padel".to_string()));
    }

    #[test]
    fn round_integer_truncates_toward_zero_not_nearest() {
        let result = apply_normalizers(&[NormalizerKind::RoundInteger], Value::String("4.9".to_string()));
        assert_eq!(result, serde_json::json!(4));
    }

    #[test]
    fn round_integer_parses_numeric_strings() {
        let result = apply_normalizers(&[NormalizerKind::RoundInteger], Value::String("4".to_string()));
        assert_eq!(result, serde_json::json!(4));
    }
}

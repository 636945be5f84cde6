// Closed-enum extractor dispatch: the field rule names an `ExtractorKind`,
// never a function pointer or string tag, so a new extractor can only be
// added by extending this match.

use fieldscope_lens::contract::ExtractorKind;
use regex::Regex;
use serde_json::Value;

fn first_number(text: &str) -> Option<f64> {
    let re = Regex::new(r"-?\d+(\.\d+)?").ok()?;
    re.find(text)?.as_str().parse().ok()
}

/// `regex_capture`: the rule's pattern must carry one capture group; its
/// first match becomes the extracted string. No match is not an error, it
/// simply means this field rule contributes nothing this round.
fn regex_capture(pattern: &str, text: &str) -> Option<Value> {
    let re = Regex::new(pattern).ok()?;
    let captures = re.captures(text)?;
    let captured = captures.get(1).or_else(|| captures.get(0))?;
    Some(Value::String(captured.as_str().to_string()))
}

/// `numeric_parser`: locate the first number in `text`, optionally
/// restricted to text matched by `pattern` first.
fn numeric_parser(pattern: Option<&str>, text: &str) -> Option<Value> {
    let scoped_text = match pattern {
        Some(p) => {
            let re = Regex::new(p).ok()?;
            re.find(text)?.as_str().to_string()
        }
        None => text.to_string(),
    };
    first_number(&scoped_text).map(|n| serde_json::json!(n))
}

pub fn run_extractor(kind: ExtractorKind, pattern: Option<&str>, text: &str) -> Option<Value> {
    match kind {
        ExtractorKind::RegexCapture => regex_capture(pattern?, text),
        ExtractorKind::NumericParser => numeric_parser(pattern, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_capture_takes_first_group() {
        let result = regex_capture(r"(\d+)\s*padel\s*courts?", "there are 4 padel courts here");
        assert_eq!(result, Some(Value::String("4".to_string())));
    }

    #[test]
    fn numeric_parser_finds_first_number() {
        let result = numeric_parser(None, "opening hours: 9 to 5");
        assert_eq!(result, Some(serde_json::json!(9.0)));
    }

    #[test]
    fn no_match_yields_none() {
        assert_eq!(regex_capture(r"(\d+)\s*squash\s*courts?", "4 padel courts"), None);
    }
}

//! JSON repair and parsing for oracle responses
//!
//! Models wrap their JSON in prose and code fences, spell numbers as
//! strings ("50 000", "800,50"), and use alternate key names. These helpers
//! recover the object and map it onto candidates without inventing values.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::types::{TransactionCandidate, TransferCandidate};

const DEFAULT_REJECT_REASON: &str = "the message does not describe a financial operation";

/// Strip code-fence markers and return the first `{` .. last `}` object
pub fn extract_json_object(response: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_code_fences(response);

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');

    let json_str = match (start, end) {
        (Some(s), Some(e)) if s < e => &cleaned[s..=e],
        _ => return Err(Error::malformed("No JSON object found", response)),
    };

    match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::malformed("JSON is not an object", response)),
        Err(e) => Err(Error::malformed(format!("Invalid JSON: {}", e), response)),
    }
}

/// Parse a single-sided transaction candidate
///
/// Requires `success`; on success requires `amount` to be present (its
/// value may still be unusable). `success: false` becomes a reject.
pub fn parse_transaction_candidate(response: &str) -> Result<TransactionCandidate> {
    let obj = extract_json_object(response)?;
    check_success(&obj, response)?;
    require_key(&obj, "amount", response)?;

    Ok(TransactionCandidate {
        amount: obj.get("amount").and_then(lenient_number),
        currency: string_field(&obj, &["currency"]),
        category: string_field(&obj, &["category"]),
        description: string_field(&obj, &["description"]),
        account: string_field(&obj, &["account", "bank"]),
        direction: string_field(&obj, &["direction", "type"]),
        confidence: obj.get("confidence").and_then(lenient_number),
    })
}

/// Parse a transfer candidate
pub fn parse_transfer_candidate(response: &str) -> Result<TransferCandidate> {
    let obj = extract_json_object(response)?;
    check_success(&obj, response)?;
    require_key(&obj, "amount", response)?;

    Ok(TransferCandidate {
        amount: obj.get("amount").and_then(lenient_number),
        currency: string_field(&obj, &["currency"]),
        source: string_field(&obj, &["from_account", "from_bank", "source"]),
        destination: string_field(&obj, &["to_account", "to_bank", "destination"]),
        description: string_field(&obj, &["description"]),
        confidence: obj.get("confidence").and_then(lenient_number),
    })
}

/// Coerce a JSON number or numeric string into a finite f64
///
/// Accepts spaces as thousands separators ("50 000"), and commas or dots
/// in either role: when both appear the last one is the decimal mark; a
/// lone comma followed by exactly three digits groups thousands
/// ("50,000"), with one or two digits it is a decimal comma ("800,50").
/// Anything that could be read at two different scales yields `None`.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_numeric_string(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_numeric_string(s: &str) -> Option<f64> {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{202f}' && *c != '\u{a0}')
        .collect();
    let (sign, body) = match compact.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", compact.strip_prefix('+').unwrap_or(&compact)),
    };

    let (whole, fraction) = match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let (mark, group_sep) = if comma > dot { (comma, '.') } else { (dot, ',') };
            (ungroup(&body[..mark], group_sep)?, Some(&body[mark + 1..]))
        }
        (Some(comma), None) => split_single_separator(body, ',', comma)?,
        (None, Some(dot)) => split_single_separator(body, '.', dot)?,
        (None, None) => (body.to_string(), None),
    };

    let fraction = fraction.unwrap_or("");
    if whole.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    if fraction.is_empty() {
        format!("{}{}", sign, whole).parse().ok()
    } else {
        format!("{}{}.{}", sign, whole, fraction).parse().ok()
    }
}

/// Split a string that uses only one kind of separator
fn split_single_separator(body: &str, sep: char, last: usize) -> Option<(String, Option<&str>)> {
    let repeated = body.matches(sep).count() > 1;
    let trailing = body.len() - last - 1;

    if repeated || (sep == ',' && trailing == 3) {
        return Some((ungroup(body, sep)?, None));
    }
    if sep == ',' && !(1..=2).contains(&trailing) {
        return None;
    }
    Some((body[..last].to_string(), Some(&body[last + 1..])))
}

/// Remove thousands separators, requiring groups of exactly three digits
fn ungroup(whole: &str, sep: char) -> Option<String> {
    let mut groups = whole.split(sep);
    let head = groups.next()?;
    if whole.contains(sep) && (head.is_empty() || head.len() > 3) {
        return None;
    }

    let mut digits = head.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

fn strip_code_fences(response: &str) -> String {
    response
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn check_success(obj: &Map<String, Value>, raw: &str) -> Result<()> {
    let success = match obj.get("success") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(_) => return Err(Error::malformed("'success' is not a boolean", raw)),
        None => return Err(Error::malformed("Missing required key 'success'", raw)),
    };

    if success {
        return Ok(());
    }

    let reason = string_field(obj, &["error", "reason"])
        .unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string());
    Err(Error::LowConfidenceReject(reason))
}

fn require_key(obj: &Map<String, Value>, key: &str, raw: &str) -> Result<()> {
    if obj.contains_key(key) {
        Ok(())
    } else {
        Err(Error::malformed(
            format!("Missing required key '{}'", key),
            raw,
        ))
    }
}

/// First non-empty string under any of `keys`; numbers are stringified
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_transaction() {
        let response = r#"{"success": true, "amount": 800, "currency": "KZT", "category": "еда", "description": "кофе", "bank": null, "type": "expense", "confidence": 0.95}"#;
        let c = parse_transaction_candidate(response).unwrap();
        assert_eq!(c.amount, Some(800.0));
        assert_eq!(c.category.as_deref(), Some("еда"));
        assert_eq!(c.direction.as_deref(), Some("expense"));
        assert_eq!(c.account, None);
        assert_eq!(c.confidence, Some(0.95));
    }

    #[test]
    fn test_parse_prose_and_fenced_json() {
        let response = "Here is the result:\n```json\n{\"success\": true, \"amount\": \"1 200\", \"category\": \"transport\", \"account\": \"Kaspi\"}\n```\nHope this helps!";
        let c = parse_transaction_candidate(response).unwrap();
        assert_eq!(c.amount, Some(1200.0));
        assert_eq!(c.account.as_deref(), Some("Kaspi"));
    }

    #[test]
    fn test_parse_transfer_with_aliases() {
        let response = r#"{"success": true, "amount": "50 000", "from_bank": "каспи", "to_account": "halyk"}"#;
        let c = parse_transfer_candidate(response).unwrap();
        assert_eq!(c.amount, Some(50_000.0));
        assert_eq!(c.source.as_deref(), Some("каспи"));
        assert_eq!(c.destination.as_deref(), Some("halyk"));
        assert_eq!(c.currency, None);
    }

    #[test]
    fn test_success_false_is_reject_with_reason() {
        let err = parse_transaction_candidate(r#"{"success": false, "error": "no amount found"}"#)
            .unwrap_err();
        match err {
            Error::LowConfidenceReject(reason) => assert_eq!(reason, "no amount found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_success_false_default_reason() {
        let err = parse_transfer_candidate(r#"{"success": false}"#).unwrap_err();
        match err {
            Error::LowConfidenceReject(reason) => assert_eq!(reason, DEFAULT_REJECT_REASON),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_responses() {
        for response in [
            "I could not help with that",
            "{not json}",
            "[1, 2, 3]",
            r#"{"amount": 100}"#,
            r#"{"success": true, "category": "food"}"#,
            r#"{"success": "maybe", "amount": 1}"#,
        ] {
            let err = parse_transaction_candidate(response).unwrap_err();
            assert!(
                matches!(err, Error::MalformedResponse { .. }),
                "{} -> {:?}",
                response,
                err
            );
        }
    }

    #[test]
    fn test_unusable_amount_is_absent_not_error() {
        let c = parse_transaction_candidate(r#"{"success": true, "amount": "много"}"#).unwrap();
        assert_eq!(c.amount, None);
        let c = parse_transaction_candidate(r#"{"success": true, "amount": null}"#).unwrap();
        assert_eq!(c.amount, None);
    }

    #[test]
    fn test_lenient_number() {
        assert_eq!(lenient_number(&json!(800)), Some(800.0));
        assert_eq!(lenient_number(&json!("50 000")), Some(50_000.0));
        assert_eq!(lenient_number(&json!("800,50")), Some(800.5));
        assert_eq!(lenient_number(&json!("1,234.50")), Some(1234.5));
        assert_eq!(lenient_number(&json!("50,000")), Some(50_000.0));
        assert_eq!(lenient_number(&json!("1,234,567")), Some(1_234_567.0));
        assert_eq!(lenient_number(&json!("1.234,50")), Some(1234.5));
        assert_eq!(lenient_number(&json!("1.234.567")), Some(1_234_567.0));
        assert_eq!(lenient_number(&json!("12.5")), Some(12.5));
        assert_eq!(lenient_number(&json!("0,5")), Some(0.5));
        assert_eq!(lenient_number(&json!("+1 200")), Some(1200.0));
        assert_eq!(lenient_number(&json!("-5")), Some(-5.0));
        assert_eq!(lenient_number(&json!("")), None);
        assert_eq!(lenient_number(&json!("abc")), None);
        assert_eq!(lenient_number(&json!("inf")), None);
        assert_eq!(lenient_number(&json!(true)), None);
    }

    #[test]
    fn test_lenient_number_rejects_ambiguous_separators() {
        for raw in [
            "1,2345", "1,234,56", "12345,678", "1.234.56", "1,234.5,6", ",", "1,", ",50", "1e5",
        ] {
            assert_eq!(lenient_number(&json!(raw)), None, "{}", raw);
        }
    }

    #[test]
    fn test_thousands_comma_amount_keeps_scale() {
        let c = parse_transaction_candidate(r#"{"success": true, "amount": "50,000"}"#).unwrap();
        assert_eq!(c.amount, Some(50_000.0));
    }
}

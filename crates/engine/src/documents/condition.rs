//! Condition evaluation for document requirements.
//!
//! Answers arrive as loosely typed form values, so each operator applies its
//! own coercion before comparing:
//!
//! - `equals` / `notEquals` compare strictly: values of different kinds never
//!   match, and list answers never equal anything (lists compare by identity
//!   in the form layer).
//! - `includes` tests list membership for list answers and case-insensitive
//!   substring containment of the stringified value otherwise.
//! - `greaterThan` / `lessThan` coerce both sides to numbers; anything that
//!   does not coerce becomes `NaN` and the comparison is `false`.
//!
//! A missing answer is treated as `undefined`: strict equality is `false`,
//! so `notEquals` is `true` for every unanswered field.

use intake_types::{AnswerSet, AnswerValue, ConditionOperator, DocumentCondition};

/// Evaluates `condition` against the current answers.
pub fn evaluate_condition(condition: &DocumentCondition, answers: &AnswerSet) -> bool {
    let field_value = answers.get(&condition.field);
    match condition.operator {
        ConditionOperator::Equals => strict_equals(field_value, &condition.value),
        ConditionOperator::NotEquals => !strict_equals(field_value, &condition.value),
        ConditionOperator::Includes => includes(field_value, &condition.value),
        ConditionOperator::GreaterThan => to_number(field_value) > to_number(Some(&condition.value)),
        ConditionOperator::LessThan => to_number(field_value) < to_number(Some(&condition.value)),
        ConditionOperator::Unknown => false,
    }
}

fn strict_equals(field_value: Option<&AnswerValue>, expected: &AnswerValue) -> bool {
    match (field_value, expected) {
        (Some(AnswerValue::Text(left)), AnswerValue::Text(right)) => left == right,
        (Some(AnswerValue::Flag(left)), AnswerValue::Flag(right)) => left == right,
        (Some(AnswerValue::Number(left)), AnswerValue::Number(right)) => left == right,
        _ => false,
    }
}

fn includes(field_value: Option<&AnswerValue>, needle: &AnswerValue) -> bool {
    match field_value {
        Some(AnswerValue::List(items)) => match needle {
            AnswerValue::Text(needle) => items.iter().any(|item| item == needle),
            _ => false,
        },
        other => {
            let haystack = to_display_string(other).to_lowercase();
            haystack.contains(&to_display_string(Some(needle)).to_lowercase())
        }
    }
}

/// Stringifies a value the way the form layer does; `None` becomes `"undefined"`.
fn to_display_string(value: Option<&AnswerValue>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(AnswerValue::Text(text)) => text.clone(),
        Some(AnswerValue::Flag(flag)) => flag.to_string(),
        Some(AnswerValue::Number(number)) => format_number(*number),
        Some(AnswerValue::List(items)) => items.join(","),
    }
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if number.fract() == 0.0 && number.abs() < 1e21 {
        format!("{}", number as i128)
    } else {
        format!("{}", number)
    }
}

/// Numeric coercion; `None` and unparseable text become `NaN`.
fn to_number(value: Option<&AnswerValue>) -> f64 {
    match value {
        None => f64::NAN,
        Some(AnswerValue::Number(number)) => *number,
        Some(AnswerValue::Flag(flag)) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Some(AnswerValue::Text(text)) => parse_numeric_text(text),
        Some(AnswerValue::List(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_numeric_text(single),
            _ => f64::NAN,
        },
    }
}

fn parse_numeric_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(value) = parse_radix_literal(trimmed) {
        return value;
    }
    // Rust accepts spellings such as "inf" and "nan" that forms do not.
    if trimmed.chars().any(|character| character.is_ascii_alphabetic() && !matches!(character, 'e' | 'E')) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Unsigned `0x`/`0o`/`0b` integer literals, as numeric form fields accept them.
fn parse_radix_literal(text: &str) -> Option<f64> {
    let (radix, digits) = match text.get(..2)? {
        "0x" | "0X" => (16, &text[2..]),
        "0o" | "0O" => (8, &text[2..]),
        "0b" | "0B" => (2, &text[2..]),
        _ => return None,
    };
    if digits.is_empty() {
        return Some(f64::NAN);
    }
    let value = digits
        .chars()
        .try_fold(0.0_f64, |total, digit| digit.to_digit(radix).map(|digit| total * f64::from(radix) + f64::from(digit)));
    Some(value.unwrap_or(f64::NAN))
}

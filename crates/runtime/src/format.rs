//! PRINT-side text conversion: value display, `PRINT USING` fields,
//! and the leading-number parse VAL and INPUT share.

use basil_core::Value;

/// How PRINT shows a value. Numbers with no fractional part print as
/// integers; strings print verbatim. Aggregates have no display form.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Integer(n) => Some(n.to_string()),
        Value::Long(n) => Some(n.to_string()),
        Value::Single(x) => {
            if x.fract() == 0.0 && x.abs() < 1e15 {
                Some(format!("{}", *x as i64))
            } else {
                Some(format!("{}", x))
            }
        }
        Value::Double(x) => Some(display_f64(*x)),
        Value::Str(s) => Some(s.clone()),
        Value::Record(_) | Value::Ref(_) => None,
    }
}

fn display_f64(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// `PRINT USING` formatting: runs of `#` (with embedded `,`) are numeric
/// fields; the argument is right-aligned within the digit count and
/// overflow truncates leading characters; everything else is verbatim.
/// A non-numeric argument aborts formatting with an error.
pub fn format_using(format: &str, args: &[Value]) -> Result<String, String> {
    let mut out = String::new();
    let mut next_arg = 0usize;
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '#' {
            out.push(c);
            continue;
        }
        let mut digits = 1usize;
        while let Some(&f) = chars.peek() {
            match f {
                '#' => {
                    digits += 1;
                    chars.next();
                }
                ',' => {
                    chars.next();
                }
                _ => break,
            }
        }
        let value = args.get(next_arg);
        next_arg += 1;
        let text = match value {
            Some(v) if v.is_numeric() => display_value(v).unwrap_or_default(),
            Some(v) => {
                return Err(format!("type mismatch in PRINT USING: {} is not numeric", v.type_name()));
            }
            None => String::new(),
        };
        if text.len() > digits {
            // Overflow: keep the trailing digits.
            out.push_str(&text[text.len() - digits..]);
        } else {
            for _ in 0..digits - text.len() {
                out.push(' ');
            }
            out.push_str(&text);
        }
    }
    Ok(out)
}

/// VAL semantics: parse the longest numeric prefix of the (trimmed)
/// string, or 0 when there is none.
pub fn parse_leading_number(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut end = 0usize;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = trimmed.as_bytes();
    while end < bytes.len() {
        let b = bytes[end];
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'-' | b'+' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    // Trim a dangling exponent marker ("1e" parses as 1).
    while end > 0 && matches!(bytes[end - 1], b'e' | b'E' | b'+' | b'-' | b'.') {
        if matches!(bytes[end - 1], b'.') {
            break;
        }
        end -= 1;
    }
    if !seen_digit {
        return 0.0;
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_display_without_a_point() {
        assert_eq!(display_value(&Value::Single(42.0)), Some("42".to_string()));
        assert_eq!(display_value(&Value::Double(2.5)), Some("2.5".to_string()));
        assert_eq!(display_value(&Value::Integer(-7)), Some("-7".to_string()));
        assert_eq!(display_value(&Value::Str("HI".to_string())), Some("HI".to_string()));
    }

    #[test]
    fn using_right_aligns_within_the_digit_count() {
        let args = [Value::Integer(7), Value::Integer(345)];
        assert_eq!(format_using("###x###", &args).unwrap(), "  7x345");
    }

    #[test]
    fn using_truncates_overflow_from_the_left() {
        let args = [Value::Integer(12345)];
        assert_eq!(format_using("###", &args).unwrap(), "345");
    }

    #[test]
    fn using_keeps_literal_text() {
        let args = [Value::Integer(5)];
        assert_eq!(format_using("score: ##!", &args).unwrap(), "score:  5!");
    }

    #[test]
    fn using_rejects_string_arguments() {
        let args = [Value::Str("x".to_string())];
        assert!(format_using("##", &args).is_err());
    }

    #[test]
    fn embedded_commas_extend_the_field() {
        let args = [Value::Integer(1234)];
        assert_eq!(format_using("#,###", &args).unwrap(), "1234");
    }

    #[test]
    fn val_parses_leading_numbers() {
        assert_eq!(parse_leading_number("42"), 42.0);
        assert_eq!(parse_leading_number("  3.5abc"), 3.5);
        assert_eq!(parse_leading_number("-2"), -2.0);
        assert_eq!(parse_leading_number("1e2"), 100.0);
        assert_eq!(parse_leading_number("abc"), 0.0);
        assert_eq!(parse_leading_number(""), 0.0);
    }
}

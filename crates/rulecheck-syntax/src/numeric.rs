//! Numeric literal parsing and JavaScript `Number#toString` formatting.

/// Value of a numeric literal token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumericValue {
    Number(f64),
    BigInt(i128),
}

/// Parse the text of a numeric literal (`0x1F`, `1_000`, `.5e3`, `10n`, ...).
/// Returns `None` for malformed text or BigInts outside the `i128` range.
pub fn parse_numeric_literal(text: &str) -> Option<NumericValue> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(digits) = cleaned.strip_suffix('n') {
        let (radix, body) = split_radix(digits);
        return i128::from_str_radix(body, radix)
            .ok()
            .map(NumericValue::BigInt);
    }
    let (radix, body) = split_radix(&cleaned);
    if radix != 10 {
        let value = u128::from_str_radix(body, radix).ok()?;
        return Some(NumericValue::Number(value as f64));
    }
    // Legacy octal (`017`) is a syntax error in modules; treat as decimal.
    body.parse::<f64>().ok().map(NumericValue::Number)
}

fn split_radix(text: &str) -> (u32, &str) {
    let bytes = text.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => return (16, &text[2..]),
            b'o' | b'O' => return (8, &text[2..]),
            b'b' | b'B' => return (2, &text[2..]),
            _ => {}
        }
    }
    (10, text)
}

/// Format a number the way `Number.prototype.toString()` does.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", format_number(-value));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e6".
    let exp_form = format!("{value:e}");
    let (mantissa, exponent) = exp_form.split_once('e').unwrap_or((&exp_form, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat_n('0', (n - k) as usize));
        out
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{int_part}.{frac_part}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let sign = if e >= 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", e.abs())
        }
    }
}

/// ToInt32 as used by the bitwise operators.
pub fn to_int32(value: f64) -> i32 {
    to_uint32(value) as i32
}

/// ToUint32 as used by `>>>`.
pub fn to_uint32(value: f64) -> u32 {
    if !value.is_finite() || value == 0.0 {
        return 0;
    }
    let truncated = value.trunc();
    let modulo = truncated.rem_euclid(4_294_967_296.0);
    modulo as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_javascript() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(123456789012345680000.0), "123456789012345680000");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(1.5e300), "1.5e+300");
    }

    #[test]
    fn parses_literal_forms() {
        assert_eq!(parse_numeric_literal("0x1F"), Some(NumericValue::Number(31.0)));
        assert_eq!(parse_numeric_literal("1_000"), Some(NumericValue::Number(1000.0)));
        assert_eq!(parse_numeric_literal(".5e1"), Some(NumericValue::Number(5.0)));
        assert_eq!(parse_numeric_literal("10n"), Some(NumericValue::BigInt(10)));
        assert_eq!(parse_numeric_literal("0b101"), Some(NumericValue::Number(5.0)));
    }

    #[test]
    fn int32_wraps() {
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
    }
}

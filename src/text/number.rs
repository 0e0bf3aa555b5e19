//! Numeric literal parsing.
//!
//! Integers parse into `i128` with an optional sign and an optional radix
//! prefix (`0x`, `0o`, `0b`). Floats parse into `f64` *and keep their
//! original text*: overflow and underflow decode to `±inf`/`0` and must
//! serialize back to the source spelling, while finite values carry a
//! normalized decimal form (underscores stripped, leading `+` dropped,
//! uppercase `E` with an explicit exponent sign).
//!
//! Underscores separate digits and may not lead a digit run: `1_0` is
//! fine, `0x_1`, `1._5`, and `1e_5` are not.

use thiserror::Error;

/// Radix of an integer literal, from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary = 2,
    Octal = 8,
    Decimal = 10,
    Hexadecimal = 16,
}

impl Radix {
    #[inline]
    fn permits(self, b: u8) -> bool {
        match self {
            Radix::Binary => matches!(b, b'0' | b'1'),
            Radix::Octal => matches!(b, b'0'..=b'7'),
            Radix::Decimal => b.is_ascii_digit(),
            Radix::Hexadecimal => b.is_ascii_hexdigit(),
        }
    }
}

/// Why a literal failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("malformed numeric literal")]
    BadSyntax,
    #[error("integer out of range")]
    OutOfRange,
}

/// A parsed float: the `f64` value plus the text to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFloat {
    pub value: f64,
    /// Normalized form for finite values; the raw source text when the
    /// value overflowed or underflowed.
    pub original: String,
}

/// Split an optional ASCII sign off the front. Returns (negative, rest).
#[inline]
fn split_sign(text: &str) -> (bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

/// Consume a digit run in `radix`: at least one digit, underscores allowed
/// after the first. Appends the digits (sans underscores) to `out` and
/// returns the rest of the input.
fn digit_run<'a>(text: &'a str, radix: Radix, out: &mut String) -> Result<&'a str, NumberError> {
    let bytes = text.as_bytes();
    let first = *bytes.first().ok_or(NumberError::BadSyntax)?;
    if !radix.permits(first) {
        return Err(NumberError::BadSyntax);
    }
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if radix.permits(b) {
            out.push(b as char);
        } else if b != b'_' {
            break;
        }
        i += 1;
    }
    Ok(&text[i..])
}

/// Parse an integer literal (any radix) into `i128`.
///
/// `text` is the full token, prefix and sign included.
pub fn parse_integer(text: &str) -> Result<i128, NumberError> {
    let (negative, rest) = split_sign(text);
    let (radix, rest) = match rest.as_bytes() {
        [b'0', b'x', ..] => (Radix::Hexadecimal, &rest[2..]),
        [b'0', b'o', ..] => (Radix::Octal, &rest[2..]),
        [b'0', b'b', ..] => (Radix::Binary, &rest[2..]),
        _ => (Radix::Decimal, rest),
    };
    let mut digits = String::with_capacity(rest.len() + 1);
    if negative {
        digits.push('-');
    }
    let rest = digit_run(rest, radix, &mut digits)?;
    if !rest.is_empty() {
        return Err(NumberError::BadSyntax);
    }
    i128::from_str_radix(&digits, radix as u32).map_err(|_| NumberError::OutOfRange)
}

/// Parse a decimal float literal.
///
/// Grammar: `sign? digits ('.' digits)? (('e'|'E') sign? digits)?` with at
/// least one of the fraction or exponent present (otherwise the token is an
/// integer and does not come here).
pub fn parse_float(text: &str) -> Result<ParsedFloat, NumberError> {
    let (negative, rest) = split_sign(text);

    // Cleaned spelling: no underscores, no leading '+'.
    let mut cleaned = String::with_capacity(text.len());
    if negative {
        cleaned.push('-');
    }

    let rest = digit_run(rest, Radix::Decimal, &mut cleaned)?;

    let rest = if let Some(stripped) = rest.strip_prefix('.') {
        cleaned.push('.');
        digit_run(stripped, Radix::Decimal, &mut cleaned)?
    } else {
        rest
    };
    let fraction_end = cleaned.len();

    let mut exponent = None;
    let rest = if let Some(stripped) = rest.strip_prefix(['e', 'E']) {
        let (exp_negative, exp_rest) = split_sign(stripped);
        let mut exp_digits = String::with_capacity(exp_rest.len());
        let tail = digit_run(exp_rest, Radix::Decimal, &mut exp_digits)?;
        exponent = Some((exp_negative, exp_digits));
        tail
    } else {
        rest
    };
    if !rest.is_empty() {
        return Err(NumberError::BadSyntax);
    }

    // Parseable spelling for f64::from_str.
    let mut parse_text = cleaned.clone();
    if let Some((exp_negative, exp_digits)) = &exponent {
        parse_text.push('e');
        if *exp_negative {
            parse_text.push('-');
        }
        parse_text.push_str(exp_digits);
    }
    let value: f64 = parse_text.parse().map_err(|_| NumberError::BadSyntax)?;

    // Overflow decodes to ±inf, underflow to ±0 while the source still has
    // a nonzero digit; both must round-trip to the source text unchanged.
    let mantissa_nonzero = cleaned[..fraction_end]
        .bytes()
        .any(|b| (b'1'..=b'9').contains(&b));
    let degraded = value.is_infinite() || (value == 0.0 && mantissa_nonzero);
    let original = if degraded {
        text.to_owned()
    } else {
        let mut normalized = cleaned;
        if let Some((exp_negative, exp_digits)) = exponent {
            normalized.push('E');
            normalized.push(if exp_negative { '-' } else { '+' });
            normalized.push_str(&exp_digits);
        }
        normalized
    };
    Ok(ParsedFloat { value, original })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_integers() {
        assert_eq!(parse_integer("0"), Ok(0));
        assert_eq!(parse_integer("42"), Ok(42));
        assert_eq!(parse_integer("-17"), Ok(-17));
        assert_eq!(parse_integer("+8"), Ok(8));
        assert_eq!(parse_integer("1_000_000"), Ok(1_000_000));
        assert_eq!(parse_integer("1000_"), Ok(1000));
    }

    #[test]
    fn test_radix_integers() {
        assert_eq!(parse_integer("0xdead_beef"), Ok(0xDEAD_BEEF));
        assert_eq!(parse_integer("-0x10"), Ok(-16));
        assert_eq!(parse_integer("0o755"), Ok(0o755));
        assert_eq!(parse_integer("0b1010_1010"), Ok(0b1010_1010));
    }

    #[test]
    fn test_integer_rejects() {
        assert_eq!(parse_integer("0x"), Err(NumberError::BadSyntax));
        assert_eq!(parse_integer("0x_1"), Err(NumberError::BadSyntax));
        assert_eq!(parse_integer("_1"), Err(NumberError::BadSyntax));
        assert_eq!(parse_integer("0b2"), Err(NumberError::BadSyntax));
        assert_eq!(parse_integer("1a"), Err(NumberError::BadSyntax));
        // i128::MAX + 1
        assert_eq!(
            parse_integer("170141183460469231731687303715884105728"),
            Err(NumberError::OutOfRange)
        );
    }

    #[test]
    fn test_float_plain() {
        let f = parse_float("1.5").unwrap();
        assert_eq!(f.value, 1.5);
        assert_eq!(f.original, "1.5");
    }

    #[test]
    fn test_float_normalizes_exponent() {
        assert_eq!(parse_float("1e10").unwrap().original, "1E+10");
        assert_eq!(parse_float("1e+10").unwrap().original, "1E+10");
        assert_eq!(parse_float("2.5e-4").unwrap().original, "2.5E-4");
        assert_eq!(parse_float("1.23E5").unwrap().original, "1.23E+5");
    }

    #[test]
    fn test_float_strips_underscores_and_plus() {
        let f = parse_float("+1_000.000_1").unwrap();
        assert_eq!(f.value, 1000.0001);
        assert_eq!(f.original, "1000.0001");
    }

    #[test]
    fn test_float_overflow_keeps_source() {
        let f = parse_float("1.23E+1000").unwrap();
        assert!(f.value.is_infinite() && f.value > 0.0);
        assert_eq!(f.original, "1.23E+1000");
        let f = parse_float("-1e999").unwrap();
        assert!(f.value.is_infinite() && f.value < 0.0);
        assert_eq!(f.original, "-1e999");
    }

    #[test]
    fn test_float_underflow_keeps_source() {
        let f = parse_float("1e-999").unwrap();
        assert_eq!(f.value, 0.0);
        assert_eq!(f.original, "1e-999");
        // A true zero is not underflow.
        assert_eq!(parse_float("0.0e-10").unwrap().original, "0.0E-10");
    }

    #[test]
    fn test_float_rejects() {
        assert_eq!(parse_float("1."), Err(NumberError::BadSyntax));
        assert_eq!(parse_float(".5"), Err(NumberError::BadSyntax));
        assert_eq!(parse_float("1._5"), Err(NumberError::BadSyntax));
        assert_eq!(parse_float("1e"), Err(NumberError::BadSyntax));
        assert_eq!(parse_float("1e_5"), Err(NumberError::BadSyntax));
        assert_eq!(parse_float("1.2.3"), Err(NumberError::BadSyntax));
    }
}

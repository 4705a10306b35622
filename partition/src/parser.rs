use common::{NumericRecord, ParseError};

/// Parses one input line as a decimal floating-point literal.
///
/// Surrounding whitespace is ignored. Accepted forms are an optional sign,
/// digits with an optional fractional part (or a leading `.` followed by
/// digits) and an optional exponent. Special values like `inf` and `NaN`,
/// hex, digit separators and suffixes are rejected. A literal too large for
/// `f64` is valid and parses to an infinity.
pub fn parse(line: &str) -> Result<NumericRecord, ParseError> {
    let trimmed = line.trim();
    if !is_decimal_literal(trimmed.as_bytes()) {
        return Err(ParseError::new(line));
    }
    trimmed
        .parse::<f64>()
        .map(NumericRecord::new)
        .map_err(|_| ParseError::new(line))
}

fn is_decimal_literal(s: &[u8]) -> bool {
    let mut i = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_digits = count_digits(&s[i..]);
    i += int_digits;

    let mut frac_digits = 0;
    if s.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = count_digits(&s[i..]);
        i += frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return false;
    }

    if matches!(s.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(s.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_digits = count_digits(&s[i..]);
        if exp_digits == 0 {
            return false;
        }
        i += exp_digits;
    }

    i == s.len()
}

#[inline]
fn count_digits(s: &[u8]) -> usize {
    s.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_decimal_literals() {
        let cases = [
            ("10", 10.0),
            ("-2.5", -2.5),
            ("+3", 3.0),
            ("  42.0\t", 42.0),
            ("1e3", 1000.0),
            ("1.5E-2", 0.015),
            (".5", 0.5),
            ("5.", 5.0),
            ("-0", -0.0),
        ];
        for (line, expected) in cases {
            assert_eq!(parse(line).unwrap().value(), expected, "line {:?}", line);
        }
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["abc", "", "   ", "1.2.3", "--1", "1e", "e5", ".", "+", "1,5", "0x10", "1_000", "1.5d", "12abc"] {
            let err = parse(line).unwrap_err();
            assert_eq!(err.raw(), line);
        }
    }

    #[test]
    fn rejects_special_values() {
        for line in ["inf", "-inf", "infinity", "NaN", "nan"] {
            assert!(parse(line).is_err(), "line {:?}", line);
        }
    }

    #[test]
    fn overflow_is_infinite() {
        assert_eq!(parse("1e400").unwrap().value(), f64::INFINITY);
    }

    #[test]
    fn rejection_reports_raw_line() {
        let lines = ["1.5", "abc", "2.5"];
        let results = lines.iter().map(|l| parse(l)).collect::<Vec<_>>();
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(ParseError::new("abc")));
        assert!(results[2].is_ok());
    }
}

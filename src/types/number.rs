//! Exact decimal values for NUMERIC and DECIMAL parameters
//!
//! A `Numeric` is stored as a sign, a string of decimal digits and a scale
//! (the number of digits after the decimal point). Keeping the digits as
//! text avoids any binary floating point rounding when values move between
//! the application and the engine.

use crate::error::{Error, Result};

/// Largest scale or digit count accepted when parsing
const MAX_DIGITS: usize = 1000;

/// Exact decimal number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Numeric {
    negative: bool,
    /// Always longer than `scale`, no redundant leading zeros
    digits: String,
    scale: u32,
}

impl Numeric {
    /// Parse a decimal string such as `-12.340` or `1.5E3`
    pub fn parse(text: &str) -> Result<Self> {
        let s = text.trim();
        let invalid = || Error::invalid_value("NUMERIC", format!("not a number: '{}'", text));

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = body[pos + 1..].parse().map_err(|_| invalid())?;
                (&body[..pos], exp)
            }
            None => (body, 0),
        };

        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        if exponent.unsigned_abs() > MAX_DIGITS as u64 {
            return Err(invalid());
        }

        let mut digits = format!("{}{}", int_part, frac_part);
        let mut scale = (frac_part.len() as i64)
            .checked_sub(exponent)
            .ok_or_else(invalid)?;
        if scale < 0 {
            if -scale > MAX_DIGITS as i64 {
                return Err(invalid());
            }
            digits.extend(std::iter::repeat('0').take((-scale) as usize));
            scale = 0;
        }
        if scale > MAX_DIGITS as i64 || digits.len() > MAX_DIGITS {
            return Err(invalid());
        }

        Ok(Self::normalized(negative, digits, scale as u32))
    }

    /// Create from an integer
    pub fn from_i64(value: i64) -> Self {
        Self::normalized(value < 0, value.unsigned_abs().to_string(), 0)
    }

    /// Create from a finite float, using its shortest exact decimal form
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::invalid_value(
                "NUMERIC",
                format!("{} cannot be represented exactly", value),
            ));
        }
        Self::parse(&value.to_string())
    }

    fn normalized(negative: bool, digits: String, scale: u32) -> Self {
        let min_len = scale as usize + 1;
        let mut trimmed = digits.trim_start_matches('0').to_string();
        if trimmed.len() < min_len {
            trimmed = "0".repeat(min_len - trimmed.len()) + &trimmed;
        }
        let is_zero = trimmed.bytes().all(|b| b == b'0');
        Self {
            negative: negative && !is_zero,
            digits: trimmed,
            scale,
        }
    }

    /// Number of digits after the decimal point
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Check if the value is negative
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Check if the value is zero
    pub fn is_zero(&self) -> bool {
        self.digits.bytes().all(|b| b == b'0')
    }

    fn split_point(&self) -> usize {
        self.digits.len() - self.scale as usize
    }

    fn int_digits(&self) -> &str {
        &self.digits[..self.split_point()]
    }

    fn frac_digits(&self) -> &str {
        &self.digits[self.split_point()..]
    }

    /// Number of significant digits left of the decimal point
    pub fn integer_digits(&self) -> usize {
        self.int_digits().trim_start_matches('0').len()
    }

    /// Total number of significant digits
    pub fn precision(&self) -> usize {
        self.integer_digits() + self.scale as usize
    }

    /// Return the value rounded half-up (away from zero) to `scale` digits
    pub fn rescale(&self, scale: u32) -> Self {
        if scale >= self.scale {
            let mut digits = self.digits.clone();
            digits.extend(std::iter::repeat('0').take((scale - self.scale) as usize));
            return Self::normalized(self.negative, digits, scale);
        }

        let drop = (self.scale - scale) as usize;
        let keep = self.digits.len() - drop;
        let round_up = self.digits.as_bytes()[keep] >= b'5';
        let mut kept = self.digits[..keep].to_string();
        if round_up {
            kept = increment_digits(&kept);
        }
        Self::normalized(self.negative, kept, scale)
    }

    /// Check if the value fits a declared precision and scale after rescaling
    pub fn fits(&self, precision: u32, scale: u32) -> bool {
        if precision == 0 {
            return true;
        }
        let rescaled = self.rescale(scale);
        rescaled.integer_digits() + scale as usize <= precision as usize
    }

    /// Convert to i64, truncating any fractional part
    pub fn to_i64(&self) -> Result<i64> {
        let int_part = self.int_digits();
        let text = if self.negative {
            format!("-{}", int_part)
        } else {
            int_part.to_string()
        };
        text.parse().map_err(|_| {
            Error::invalid_value("BIGINT", format!("{} is out of range", self))
        })
    }

    /// Convert to f64 (may lose precision)
    pub fn to_f64(&self) -> Result<f64> {
        self.to_string()
            .parse()
            .map_err(|e| Error::invalid_value("DOUBLE", format!("cannot parse {}: {}", self, e)))
    }
}

/// Add one to a string of ASCII digits
fn increment_digits(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    let mut i = bytes.len();
    loop {
        if i == 0 {
            bytes.insert(0, b'1');
            break;
        }
        i -= 1;
        if bytes[i] == b'9' {
            bytes[i] = b'0';
        } else {
            bytes[i] += 1;
            break;
        }
    }
    // only ASCII digits were touched
    String::from_utf8(bytes).unwrap_or_default()
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str(self.int_digits())?;
        if self.scale > 0 {
            write!(f, ".{}", self.frac_digits())?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Numeric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Numeric::parse(s)
    }
}

//! App token lifetime.
//!
//! A [`Liveness`] is the window between a JWT's `iat` and `exp` claims. JWT
//! timestamps are whole seconds, so the window is a positive whole number of
//! seconds; anything else is refused up front.
//!
//! Lifetimes are written the way Go's `time.ParseDuration` reads them:
//! a sequence of decimal numbers with unit suffixes, such as `"1m"`, `"90s"`,
//! `"1h30m"` or `"1.5m"`.

use chrono::Duration;
use std::str::FromStr;

use crate::error::ValidationError;

const FIELD: &str = "liveness";

/// Longest JWT lifetime GitHub accepts.
pub const GITHUB_MAX_LIVENESS_MINUTES: i64 = 10;

const UNITS: &[(&str, i128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("\u{00b5}s", 1_000),
    ("\u{03bc}s", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Validity window of an app token.
///
/// # Examples
///
/// ```
/// use github_app_token::auth::Liveness;
/// use chrono::Duration;
///
/// let liveness: Liveness = "1m30s".parse().unwrap();
/// assert_eq!(liveness.as_duration(), Duration::seconds(90));
///
/// assert!(Liveness::new(Duration::zero()).is_err());
/// assert_eq!(Liveness::default().as_duration(), Duration::minutes(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Liveness(Duration);

impl Liveness {
    /// Create a liveness window.
    ///
    /// # Errors
    ///
    /// `ValidationError::OutOfRange` if the duration is shorter than one
    /// second or is not a whole number of seconds.
    pub fn new(duration: Duration) -> Result<Self, ValidationError> {
        if duration < Duration::seconds(1) {
            return Err(ValidationError::OutOfRange {
                field: FIELD.to_string(),
                message: format!(
                    "must be at least 1s, got {}ms",
                    duration.num_milliseconds()
                ),
            });
        }
        if duration.subsec_nanos() != 0 {
            return Err(ValidationError::OutOfRange {
                field: FIELD.to_string(),
                message: format!(
                    "must be a whole number of seconds, got {}ms",
                    duration.num_milliseconds()
                ),
            });
        }
        Ok(Self(duration))
    }

    /// Get the window in whole seconds.
    pub fn as_seconds(&self) -> i64 {
        self.0.num_seconds()
    }

    /// Get the window as a chrono duration.
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Whether GitHub will refuse tokens with this lifetime.
    pub fn exceeds_github_maximum(&self) -> bool {
        self.0 > Duration::minutes(GITHUB_MAX_LIVENESS_MINUTES)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self(Duration::minutes(1))
    }
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0.num_seconds())
    }
}

impl FromStr for Liveness {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_duration(s)?)
    }
}

fn invalid(input: &str, message: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: FIELD.to_string(),
        message: format!("{message} in duration {input:?}"),
    }
}

/// Parse a Go-style duration string into a signed chrono duration.
///
/// Accepts an optional sign followed by one or more `<number><unit>` pairs.
/// A bare `"0"` is the only unit-less value allowed.
pub fn parse_duration(input: &str) -> Result<Duration, ValidationError> {
    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid(input, "missing value"));
    }

    let mut total_nanos: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (number, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid(input, "missing number"));
        }
        if fraction.contains('.') {
            return Err(invalid(input, "unexpected '.'"));
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid(input, "missing unit"));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| invalid(input, &format!("unknown unit {unit:?}")))?;

        let whole_value: i128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| invalid(input, "number out of range"))?
        };
        let mut component = whole_value
            .checked_mul(scale)
            .ok_or_else(|| invalid(input, "number out of range"))?;

        // Digits past nanosecond precision cannot change the result.
        let fraction = &fraction[..fraction.len().min(18)];
        if !fraction.is_empty() {
            let fraction_value: i128 = fraction
                .parse()
                .map_err(|_| invalid(input, "number out of range"))?;
            let denominator = 10_i128.pow(fraction.len() as u32);
            component += fraction_value * scale / denominator;
        }

        total_nanos = total_nanos
            .checked_add(component)
            .filter(|total| *total <= i128::from(i64::MAX))
            .ok_or_else(|| invalid(input, "duration out of range"))?;
        rest = next;
    }

    let nanos = total_nanos as i64;
    Ok(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;

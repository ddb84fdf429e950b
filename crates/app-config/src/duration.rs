use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// A [`Duration`] that can be written the way people write them on the
/// command line: `1500ms`, `40s`, `2min`, `1h`.
///
/// A bare number is read as milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HumanDuration(Duration);

impl HumanDuration {
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<HumanDuration> for Duration {
    fn from(value: HumanDuration) -> Self {
        value.0
    }
}

impl From<Duration> for HumanDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0.as_millis();

        if ms % 1000 != 0 || ms == 0 {
            return write!(f, "{ms}ms");
        }

        let secs = self.0.as_secs();
        if secs % 3600 == 0 {
            write!(f, "{}h", secs / 3600)
        } else if secs % 60 == 0 {
            write!(f, "{}min", secs / 60)
        } else {
            write!(f, "{secs}s")
        }
    }
}

impl From<HumanDuration> for String {
    fn from(value: HumanDuration) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for HumanDuration {
    type Error = DurationParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationParseError(String);
impl fmt::Display for DurationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for DurationParseError {}

impl FromStr for HumanDuration {
    type Err = DurationParseError;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let arg = arg.trim().to_lowercase();

        let num = arg
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>();

        if num.is_empty() {
            return Err(DurationParseError(format!(
                "invalid duration (no number found): {arg}"
            )));
        }

        let unit = arg[num.len()..].trim();

        let num = num
            .parse::<u64>()
            .map_err(|_| DurationParseError(format!("invalid duration (invalid number): {arg}")))?;

        let duration = match unit {
            "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
                Duration::from_millis(num)
            }
            "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(num),
            "m" | "min" | "mins" | "minute" | "minutes" => Duration::from_secs(num * 60),
            "h" | "hr" | "hrs" | "hour" | "hours" => Duration::from_secs(num * 60 * 60),
            _ => {
                return Err(DurationParseError(format!(
                    "invalid duration (invalid unit): {arg}"
                )))
            }
        };

        Ok(Self(duration))
    }
}

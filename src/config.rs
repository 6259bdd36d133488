use std::env;

use jiff::tz::TimeZone;

use crate::error::Error;
use crate::myenergi::{
    client::{Credentials, DIRECTOR_URL},
    device::DeviceId,
};

pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// Decimal separator of the output file.  A comma also switches the field
/// delimiter to a semicolon, which is what spreadsheet programs expect in
/// locales with a decimal comma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalSeparator {
    #[default]
    Point,
    Comma,
}

impl DecimalSeparator {
    pub fn delimiter(&self) -> u8 {
        match self {
            DecimalSeparator::Point => b',',
            DecimalSeparator::Comma => b';',
        }
    }

    pub fn quote_style(&self) -> csv::QuoteStyle {
        match self {
            DecimalSeparator::Point => csv::QuoteStyle::Necessary,
            DecimalSeparator::Comma => csv::QuoteStyle::Always,
        }
    }

    /// Local time with its UTC offset, so the repeated hour of a fall back
    /// transition stays distinguishable.
    pub fn date_format(&self) -> &'static str {
        match self {
            DecimalSeparator::Point => "%Y-%m-%d %H:%M:%S%:z",
            DecimalSeparator::Comma => "%d.%m.%Y %H:%M:%S%:z",
        }
    }

    pub fn format(&self, value: f64, decimals: usize) -> String {
        let out = format!("{:.*}", decimals, value);
        match self {
            DecimalSeparator::Point => out,
            DecimalSeparator::Comma => out.replace('.', ","),
        }
    }
}

/// Everything needed for a run.  Built once and passed around by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub device: DeviceId,
    pub timezone: TimeZone,
    pub director_url: String,
    pub decimal_separator: DecimalSeparator,
}

impl Config {
    /// Read the configuration from the process environment, usually populated
    /// from an `.env/{env}.env` file.
    pub fn from_env() -> Result<Config, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("Missing environment variable {}", key)))
        };
        let user_name = required("MYENERGI_SERIAL")?;
        let password = required("MYENERGI_PASSWORD")?;
        let device = required("MYENERGI_DEVICE_ID")?.parse::<DeviceId>()?;

        let tz_name = lookup("MYENERGI_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = TimeZone::get(tz_name.trim()).map_err(|source| Error::InvalidTimezone {
            name: tz_name.clone(),
            source,
        })?;

        let director_url = lookup("MYENERGI_DIRECTOR_URL").unwrap_or_else(|| DIRECTOR_URL.to_string());
        let decimal_separator = match lookup("MYENERGI_DECIMAL_SEPARATOR").as_deref().map(str::trim) {
            None | Some("") | Some(".") => DecimalSeparator::Point,
            Some(",") => DecimalSeparator::Comma,
            Some(other) => {
                return Err(Error::Config(format!(
                    "MYENERGI_DECIMAL_SEPARATOR must be '.' or ',', got {:?}",
                    other
                )))
            }
        };

        Ok(Config {
            credentials: Credentials {
                user_name,
                password,
            },
            device,
            timezone,
            director_url,
            decimal_separator,
        })
    }

    pub fn timezone_name(&self) -> &str {
        self.timezone.iana_name().unwrap_or("UTC")
    }
}

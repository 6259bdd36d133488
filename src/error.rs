use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid timezone {name}: {source}")]
    InvalidTimezone {
        name: String,
        #[source]
        source: jiff::Error,
    },

    #[error("invalid period {year}-{month:02}")]
    InvalidPeriod { year: i64, month: i64 },

    #[error("malformed sample {year}-{month:02}-{day:02} {hour:02}h: {reason}")]
    MalformedSample {
        year: i64,
        month: i64,
        day: i64,
        hour: i64,
        reason: String,
    },

    #[error("unknown device class in id {0:?}, expected an E (Eddi) or Z (Zappi) prefix")]
    UnknownDeviceClass(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed for {url} (HTTP {status})")]
    AuthenticationFailure { url: String, status: u16 },

    #[error("endpoint unavailable: {0}")]
    EndpointUnavailable(String),

    #[error("wanted {requested} hourly data points, but got {received}")]
    ShortFetch { requested: u32, received: usize },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Configuration errors abort the run before any network activity.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidTimezone { .. } | Error::UnknownDeviceClass(_) | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

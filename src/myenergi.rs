pub mod auth;
pub mod client;
pub mod device;
pub mod sample;

use jiff::Timestamp;

use crate::error::Error;
use crate::myenergi::{device::DeviceId, sample::RawSample};

/// The records of one fetch.  A record that cannot be read as an hourly
/// sample at all (e.g. `null` instead of an object) is left out and counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyRecords {
    pub samples: Vec<RawSample>,
    pub rejected: usize,
}

impl HourlyRecords {
    /// Number of records the API returned, rejected ones included.
    pub fn len(&self) -> usize {
        self.samples.len() + self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<RawSample>> for HourlyRecords {
    fn from(samples: Vec<RawSample>) -> Self {
        HourlyRecords {
            samples,
            rejected: 0,
        }
    }
}

/// Where hourly records come from.
pub trait HourlySource {
    /// Up to `hour_count` hourly records starting at `start`.  Fewer records
    /// come back when the device history is incomplete.
    fn fetch_hourly(
        &self,
        device: &DeviceId,
        start: Timestamp,
        hour_count: u32,
    ) -> Result<HourlyRecords, Error>;
}

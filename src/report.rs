use std::{io, path::Path};

use itertools::Itertools;
use jiff::tz::TimeZone;
use log::{error, info, warn};
use tabled::{builder::Builder, settings::Style};

use crate::config::DecimalSeparator;
use crate::error::Error;
use crate::interval::{
    month::Month,
    month_tz::{MonthTz, Period},
    IntervalTzLike,
};
use crate::myenergi::{
    device::{DeviceClass, DeviceId},
    sample::{normalize, HourlyObservation},
    HourlySource,
};

/// The observations collected for one local month.
#[derive(Debug, Clone)]
pub struct MonthReport {
    pub month: Month,
    pub period: Period,
    /// Number of hourly samples asked for
    pub requested: u32,
    /// Number of hourly samples the API returned
    pub received: usize,
    /// Samples dropped because the record or its date was malformed
    pub skipped: usize,
    pub observations: Vec<HourlyObservation>,
}

impl MonthReport {
    pub fn total(&self, f: impl Fn(&HourlyObservation) -> f64) -> f64 {
        self.observations.iter().map(f).sum()
    }
}

/// Hourly observations of one device across several months, in chronological
/// order of collection.
#[derive(Debug, Clone)]
pub struct HourlyReport {
    device: DeviceId,
    months: Vec<MonthReport>,
    failed: Vec<(Month, String)>,
}

impl HourlyReport {
    pub fn new(device: DeviceId) -> HourlyReport {
        HourlyReport {
            device,
            months: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn months(&self) -> &[MonthReport] {
        &self.months
    }

    /// Months that could not be retrieved, with the reason.
    pub fn failed(&self) -> &[(Month, String)] {
        &self.failed
    }

    pub fn observations(&self) -> impl Iterator<Item = &HourlyObservation> {
        self.months.iter().flat_map(|m| m.observations.iter())
    }

    pub fn len(&self) -> usize {
        self.months.iter().map(|m| m.observations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve and normalize the hourly data of one local month.  Nothing is
    /// added to the report if the fetch fails.
    pub fn collect_month(
        &mut self,
        source: &impl HourlySource,
        month: Month,
        tz: &TimeZone,
    ) -> Result<&MonthReport, Error> {
        let month_tz = MonthTz::new(month, tz)?;
        let period = month_tz.period();
        let requested = period.sample_count();
        info!(
            "Collecting {} hours starting from: {} (local), {} (UTC)",
            requested,
            month_tz.start().strftime("%Y-%m-%d %H:%M:%S%:z"),
            period.request_start()
        );

        let records = source.fetch_hourly(&self.device, period.request_start(), requested)?;
        let received = records.len();
        if received < requested as usize {
            warn!(
                "{}: {}",
                month,
                Error::ShortFetch {
                    requested,
                    received
                }
            );
        }

        // A Zappi without solar never measures generation.
        let measured = records.samples.iter().any(|raw| raw.gep != 0.0);
        let with_generation = self.device.class().reports_generation(measured);

        let mut skipped = records.rejected;
        let mut observations = Vec::with_capacity(records.samples.len());
        for raw in &records.samples {
            match normalize(raw, with_generation, tz) {
                Ok(obs) => observations.push(obs),
                Err(e) => {
                    warn!("{}: skipping sample, {}", month, e);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!("{}: skipped {} malformed samples", month, skipped);
        }

        self.months.push(MonthReport {
            month,
            period,
            requested,
            received,
            skipped,
            observations,
        });
        Ok(&self.months[self.months.len() - 1])
    }

    /// Collect several months.  A failed month is logged and recorded, the
    /// other months are still collected.  Configuration errors stop the run.
    pub fn collect(
        &mut self,
        source: &impl HourlySource,
        months: &[Month],
        tz: &TimeZone,
    ) -> Result<(), Error> {
        for month in months {
            match self.collect_month(source, *month, tz) {
                Ok(m) => info!(
                    "{}: {} hourly observations",
                    month,
                    m.observations.len()
                ),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("{}: {}", month, e);
                    self.failed.push((*month, e.to_string()));
                }
            }
        }
        Ok(())
    }

    /// True if any observation carries a generation value.
    pub fn has_generation(&self) -> bool {
        self.observations().any(|obs| obs.generation_kwh.is_some())
    }

    fn header(&self) -> Vec<String> {
        let diverted = format!("{} (kWh)", self.device.class().diverted_label());
        let mut header = vec![
            "Date".to_string(),
            "Import (kWh)".to_string(),
            "Export (kWh)".to_string(),
        ];
        match self.device.class() {
            DeviceClass::Eddi => {
                header.push("Generation (kWh)".to_string());
                header.push(diverted);
                header.push("Self Consumption (kWh)".to_string());
                header.push("Total Property Usage (kWh)".to_string());
                header.push("Green Percentage".to_string());
            }
            DeviceClass::Zappi => {
                header.push(diverted);
                if self.has_generation() {
                    header.push("Generation (kWh)".to_string());
                }
            }
        }
        header
    }

    fn row(&self, obs: &HourlyObservation, fmt: DecimalSeparator, with_generation: bool) -> Vec<String> {
        let energy = |v: f64| fmt.format(v, 3);
        let optional = |v: Option<f64>, decimals: usize| {
            v.map(|v| fmt.format(v, decimals)).unwrap_or_default()
        };
        let mut row = vec![
            obs.local_timestamp.strftime(fmt.date_format()).to_string(),
            energy(obs.import_kwh),
            energy(obs.export_kwh),
        ];
        match self.device.class() {
            DeviceClass::Eddi => {
                row.push(optional(obs.generation_kwh, 3));
                row.push(energy(obs.diverted_kwh));
                row.push(optional(obs.self_consumption_kwh, 3));
                row.push(optional(obs.property_usage_kwh, 3));
                row.push(optional(obs.green_percentage, 1));
            }
            DeviceClass::Zappi => {
                row.push(energy(obs.diverted_kwh));
                if with_generation {
                    row.push(energy(obs.generation_kwh.unwrap_or(0.0)));
                }
            }
        }
        row
    }

    /// Write one row per observation, in chronological order.
    pub fn to_writer<W: io::Write>(&self, wtr: W, fmt: DecimalSeparator) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(fmt.delimiter())
            .quote_style(fmt.quote_style())
            .from_writer(wtr);
        let with_generation = self.has_generation();
        wtr.write_record(self.header())?;
        for obs in self.observations() {
            wtr.write_record(self.row(obs, fmt, with_generation))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path, fmt: DecimalSeparator) -> Result<(), Error> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file, fmt)?;
        info!("Saved {} rows to {}", self.len(), path.display());
        Ok(())
    }

    /// Make an ASCII table with the monthly totals.
    pub fn summary_table(&self) -> tabled::Table {
        let mut builder = Builder::new();
        builder.push_record(vec![
            "Month",
            "Start (UTC)",
            "Hours",
            "Received",
            "Skipped",
            "Import (kWh)",
            "Export (kWh)",
            "Diverted (kWh)",
        ]);
        for m in &self.months {
            builder.push_record(vec![
                m.month.to_string(),
                m.period.start_utc.to_string(),
                m.requested.to_string(),
                m.received.to_string(),
                m.skipped.to_string(),
                format!("{:.3}", m.total(|obs| obs.import_kwh)),
                format!("{:.3}", m.total(|obs| obs.export_kwh)),
                format!("{:.3}", m.total(|obs| obs.diverted_kwh)),
            ]);
        }
        for (month, reason) in &self.failed {
            builder.push_record(vec![
                month.to_string(),
                String::new(),
                String::new(),
                "failed".to_string(),
                String::new(),
                String::new(),
                String::new(),
                reason.chars().take(40).collect(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::sharp());
        table
    }

    pub fn failed_months(&self) -> String {
        self.failed.iter().map(|(m, _)| m).join(", ")
    }
}

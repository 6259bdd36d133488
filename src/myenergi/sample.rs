use jiff::{
    civil::{Date, Time},
    tz::TimeZone,
    Timestamp, Zoned,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Error;

/// The counters are sums of 60 one minute readings in watts.
const WATT_MINUTES_PER_KWH: f64 = 60.0 * 1000.0;

/// One hourly record as returned by the `cgi-jdayhour` call.  The time fields
/// are in UTC.  The API leaves out fields that are zero, so every missing or
/// null field reads as 0.  Numbers sent as strings are accepted, any other
/// value reads as 0 as well.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSample {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub yr: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub mon: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub dom: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub hr: i64,
    /// imported
    #[serde(default, deserialize_with = "lenient_f64")]
    pub imp: f64,
    /// exported
    #[serde(default, deserialize_with = "lenient_f64")]
    pub exp: f64,
    /// generated
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gep: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h1d: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h2d: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h3d: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h1b: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h2b: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h3b: f64,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|x| x.is_finite()).unwrap_or(0.0))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|x| x.fract() == 0.0).map(|x| x as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(value.unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyObservation {
    /// Hour beginning, in the reporting timezone
    pub local_timestamp: Zoned,
    pub import_kwh: f64,
    pub export_kwh: f64,
    pub generation_kwh: Option<f64>,
    /// Diverted and boost energy of all three channels
    pub diverted_kwh: f64,
    pub self_consumption_kwh: Option<f64>,
    pub property_usage_kwh: Option<f64>,
    pub green_percentage: Option<f64>,
}

fn kwh(counter: f64) -> f64 {
    counter / WATT_MINUTES_PER_KWH
}

impl RawSample {
    pub fn utc_timestamp(&self) -> Result<Timestamp, Error> {
        let malformed = |reason: String| Error::MalformedSample {
            year: self.yr,
            month: self.mon,
            day: self.dom,
            hour: self.hr,
            reason,
        };
        let year = i16::try_from(self.yr).map_err(|e| malformed(e.to_string()))?;
        let month = i8::try_from(self.mon).map_err(|e| malformed(e.to_string()))?;
        let day = i8::try_from(self.dom).map_err(|e| malformed(e.to_string()))?;
        let hour = i8::try_from(self.hr).map_err(|e| malformed(e.to_string()))?;
        let date = Date::new(year, month, day).map_err(|e| malformed(e.to_string()))?;
        let time = Time::new(hour, 0, 0, 0).map_err(|e| malformed(e.to_string()))?;
        let utc = date
            .to_datetime(time)
            .to_zoned(TimeZone::UTC)
            .map_err(|e| malformed(e.to_string()))?;
        Ok(utc.timestamp())
    }

    pub fn diverted(&self) -> f64 {
        [self.h1d, self.h2d, self.h3d, self.h1b, self.h2b, self.h3b]
            .into_iter()
            .map(kwh)
            .sum()
    }
}

/// Convert one raw API record into an hourly observation in timezone `tz`.
///
/// `with_generation` is decided once per installation, see
/// [`DeviceClass::reports_generation`](crate::myenergi::device::DeviceClass::reports_generation),
/// so that every hour of a month carries the same fields.
pub fn normalize(
    raw: &RawSample,
    with_generation: bool,
    tz: &TimeZone,
) -> Result<HourlyObservation, Error> {
    let local_timestamp = raw.utc_timestamp()?.to_zoned(tz.clone());
    let import_kwh = kwh(raw.imp);
    let export_kwh = kwh(raw.exp);
    let generation_kwh = with_generation.then(|| kwh(raw.gep));

    let (self_consumption_kwh, property_usage_kwh, green_percentage) = match generation_kwh {
        Some(generation) => {
            let self_consumption = generation - export_kwh;
            let property_usage = import_kwh + self_consumption;
            (
                Some(self_consumption),
                Some(property_usage),
                Some(green_percentage(self_consumption, property_usage)),
            )
        }
        None => (None, None, None),
    };

    Ok(HourlyObservation {
        local_timestamp,
        import_kwh,
        export_kwh,
        generation_kwh,
        diverted_kwh: raw.diverted(),
        self_consumption_kwh,
        property_usage_kwh,
        green_percentage,
    })
}

/// Share of the property usage covered by own generation, 0 when nothing was
/// used.
fn green_percentage(self_consumption: f64, property_usage: f64) -> f64 {
    if property_usage == 0.0 {
        return 0.0;
    }
    let pct = 100.0 * self_consumption / property_usage;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use jiff::{tz::TimeZone, Zoned};

    use super::*;
    use crate::myenergi::device::DeviceClass;

    fn berlin() -> TimeZone {
        TimeZone::get("Europe/Berlin").unwrap()
    }

    #[test]
    fn zappi_sample() -> Result<(), Box<dyn std::error::Error>> {
        let raw: RawSample = serde_json::from_str(
            r#"{"yr":2024,"mon":1,"dom":1,"hr":0,"imp":30000,"exp":0,"h1d":60000}"#,
        )?;
        let obs = normalize(&raw, false, &berlin())?;
        assert_eq!(
            obs.local_timestamp,
            "2024-01-01T01:00:00+01:00[Europe/Berlin]".parse::<Zoned>()?
        );
        assert_eq!(
            obs.local_timestamp.strftime("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            "2024-01-01T01:00:00+01:00"
        );
        assert_eq!(obs.import_kwh, 0.5);
        assert_eq!(obs.export_kwh, 0.0);
        assert_eq!(obs.diverted_kwh, 1.0);
        assert_eq!(obs.generation_kwh, None);
        assert_eq!(obs.green_percentage, None);
        Ok(())
    }

    #[test]
    fn missing_counters_are_zero() -> Result<(), Box<dyn std::error::Error>> {
        // hr is left out by the API for midnight
        let raw: RawSample =
            serde_json::from_str(r#"{"yr":2024,"mon":7,"dom":14,"dow":"Sun","imp":null}"#)?;
        assert_eq!(raw.hr, 0);
        let obs = normalize(&raw, true, &TimeZone::UTC)?;
        assert_eq!(obs.import_kwh, 0.0);
        assert_eq!(obs.export_kwh, 0.0);
        assert_eq!(obs.diverted_kwh, 0.0);
        assert_eq!(obs.generation_kwh, Some(0.0));
        assert_eq!(obs.self_consumption_kwh, Some(0.0));
        assert_eq!(obs.property_usage_kwh, Some(0.0));
        assert_eq!(obs.green_percentage, Some(0.0));
        Ok(())
    }

    #[test]
    fn scale() {
        let raw = RawSample {
            yr: 2024,
            mon: 3,
            dom: 5,
            hr: 12,
            imp: 60_000.0,
            h1d: 30_000.0,
            h2d: 15_000.0,
            h3b: 15_000.0,
            ..Default::default()
        };
        let obs = normalize(&raw, false, &berlin()).unwrap();
        assert_eq!(obs.import_kwh, 1.0);
        assert_eq!(obs.diverted_kwh, 1.0);
    }

    #[test]
    fn eddi_derived_values() {
        let raw = RawSample {
            yr: 2024,
            mon: 6,
            dom: 1,
            hr: 10,
            imp: 60_000.0,
            exp: 120_000.0,
            gep: 300_000.0,
            ..Default::default()
        };
        let obs = normalize(&raw, true, &berlin()).unwrap();
        assert_eq!(obs.generation_kwh, Some(5.0));
        assert_eq!(obs.self_consumption_kwh, Some(3.0));
        assert_eq!(obs.property_usage_kwh, Some(4.0));
        assert_eq!(obs.green_percentage, Some(75.0));
        // summer time in Berlin
        assert_eq!(obs.local_timestamp.hour(), 12);
        assert_eq!(obs.local_timestamp.day(), 1);
    }

    #[test]
    fn zappi_with_solar() {
        let raw = RawSample {
            yr: 2024,
            mon: 6,
            dom: 1,
            hr: 10,
            gep: 120_000.0,
            exp: 60_000.0,
            ..Default::default()
        };
        let with_generation = DeviceClass::Zappi.reports_generation(true);
        let obs = normalize(&raw, with_generation, &berlin()).unwrap();
        assert_eq!(obs.generation_kwh, Some(2.0));
        assert_eq!(obs.self_consumption_kwh, Some(1.0));
        assert_eq!(obs.green_percentage, Some(100.0));

        // same installation at night: nothing generated, still reported
        let night = RawSample { hr: 22, gep: 0.0, exp: 0.0, imp: 60_000.0, ..raw };
        let obs = normalize(&night, with_generation, &berlin()).unwrap();
        assert_eq!(obs.generation_kwh, Some(0.0));
        assert_eq!(obs.self_consumption_kwh, Some(0.0));
        assert_eq!(obs.property_usage_kwh, Some(1.0));
        assert_eq!(obs.green_percentage, Some(0.0));
    }

    #[test]
    fn generation_by_installation() {
        assert!(DeviceClass::Eddi.reports_generation(false));
        assert!(DeviceClass::Zappi.reports_generation(true));
        assert!(!DeviceClass::Zappi.reports_generation(false));
    }

    #[test]
    fn odd_field_values() -> Result<(), Box<dyn std::error::Error>> {
        let raw: RawSample = serde_json::from_str(
            r#"{"yr":"2024","mon":1,"dom":1.0,"hr":" 3 ","imp":"30000","exp":[1],"gep":true,"h1d":"n/a"}"#,
        )?;
        assert_eq!(raw.yr, 2024);
        assert_eq!(raw.dom, 1);
        assert_eq!(raw.hr, 3);
        assert_eq!(raw.imp, 30000.0);
        assert_eq!(raw.exp, 0.0);
        assert_eq!(raw.gep, 0.0);
        assert_eq!(raw.h1d, 0.0);
        // an hour that is not a number reads as 0
        let raw: RawSample = serde_json::from_str(r#"{"yr":2024,"mon":1,"dom":1,"hr":"x"}"#)?;
        assert_eq!(raw.hr, 0);
        Ok(())
    }

    #[test]
    fn fall_back_hours_stay_distinct() {
        // 00:00 and 01:00 UTC are both 02:00 local on 2024-10-27
        let tz = berlin();
        let a = RawSample { yr: 2024, mon: 10, dom: 27, hr: 0, ..Default::default() };
        let b = RawSample { hr: 1, ..a.clone() };
        let a = normalize(&a, false, &tz).unwrap();
        let b = normalize(&b, false, &tz).unwrap();
        assert_eq!(a.local_timestamp.hour(), 2);
        assert_eq!(b.local_timestamp.hour(), 2);
        assert!(a.local_timestamp < b.local_timestamp);
        assert_eq!(a.local_timestamp.offset().seconds(), 7200);
        assert_eq!(b.local_timestamp.offset().seconds(), 3600);
    }

    #[test]
    fn malformed_samples() {
        let tz = berlin();
        for raw in [
            RawSample { yr: 2024, mon: 2, dom: 30, ..Default::default() },
            RawSample { yr: 2024, mon: 1, dom: 1, hr: 24, ..Default::default() },
            RawSample { yr: 2024, mon: 13, dom: 1, ..Default::default() },
            RawSample { yr: 2024, mon: 1, dom: 1, hr: -1, ..Default::default() },
            RawSample::default(),
        ] {
            assert!(matches!(
                normalize(&raw, false, &tz),
                Err(Error::MalformedSample { .. })
            ));
        }
    }

    #[test]
    fn no_nan_percentage() {
        assert_eq!(green_percentage(0.0, 0.0), 0.0);
        assert_eq!(green_percentage(-1.0, 0.0), 0.0);
        assert_eq!(green_percentage(1.0, 2.0), 50.0);
    }
}

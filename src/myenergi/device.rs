use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The kind of controller behind a device id, given by its one-letter prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Heating diverter, `E` prefix
    Eddi,
    /// EV charger, `Z` prefix
    Zappi,
}

impl DeviceClass {
    pub fn prefix(&self) -> char {
        match self {
            DeviceClass::Eddi => 'E',
            DeviceClass::Zappi => 'Z',
        }
    }

    /// Whether generation and the values derived from it are reported.  An
    /// Eddi always reports them.  A Zappi only does on an installation with
    /// solar, i.e. when it has measured generation at some point.
    pub fn reports_generation(&self, generation_measured: bool) -> bool {
        match self {
            DeviceClass::Eddi => true,
            DeviceClass::Zappi => generation_measured,
        }
    }

    /// Label of the diverted energy column.
    pub fn diverted_label(&self) -> &'static str {
        match self {
            DeviceClass::Eddi => "Eddi",
            DeviceClass::Zappi => "BEV",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceClass::Eddi => write!(f, "Eddi"),
            DeviceClass::Zappi => write!(f, "Zappi"),
        }
    }
}

/// A device id as used in the API urls, e.g. `Z12345678`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId {
    class: DeviceClass,
    serial: String,
}

impl DeviceId {
    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Keys under which the hourly records may come back.  The servers answer
    /// with a `U` prefix instead of the device class letter.
    pub fn response_keys(&self) -> [String; 2] {
        [format!("U{}", self.serial), self.to_string()]
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.class.prefix(), self.serial)
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let class = match chars.next() {
            Some('E') => DeviceClass::Eddi,
            Some('Z') => DeviceClass::Zappi,
            _ => return Err(Error::UnknownDeviceClass(s.to_string())),
        };
        let serial = chars.as_str();
        if serial.is_empty() || !serial.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Config(format!("Invalid serial number in device id {}", s)));
        }
        Ok(DeviceId {
            class,
            serial: serial.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_id() {
        let id = "Z12345678".parse::<DeviceId>().unwrap();
        assert_eq!(id.class(), DeviceClass::Zappi);
        assert_eq!(id.serial(), "12345678");
        assert_eq!(id.to_string(), "Z12345678");
        assert_eq!(id.response_keys(), ["U12345678".to_string(), "Z12345678".to_string()]);

        let id = "E1000".parse::<DeviceId>().unwrap();
        assert_eq!(id.class(), DeviceClass::Eddi);
        assert_eq!(id.class().diverted_label(), "Eddi");
    }

    #[test]
    fn reject_unknown_prefix() {
        assert!(matches!(
            "H12345678".parse::<DeviceId>(),
            Err(Error::UnknownDeviceClass(_))
        ));
        assert!(matches!("".parse::<DeviceId>(), Err(Error::UnknownDeviceClass(_))));
        assert!(matches!("Z".parse::<DeviceId>(), Err(Error::Config(_))));
        assert!(matches!("Z12-34".parse::<DeviceId>(), Err(Error::Config(_))));
    }
}

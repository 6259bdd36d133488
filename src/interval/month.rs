use std::fmt::{self, Formatter};
use std::str::FromStr;

use jiff::civil::Date;

use crate::error::Error;

/// A calendar month, without a timezone attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i16,
    month: i8,
}

/// Convenience constructor for a month known to be valid, e.g. in tests.
/// Panics if the month is outside 1..12.
pub fn month(year: i16, month: i8) -> Month {
    Month::new(year.into(), month.into()).unwrap()
}

impl Month {
    pub fn new(year: i64, month: i64) -> Result<Month, Error> {
        let invalid = || Error::InvalidPeriod { year, month };
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let year = i16::try_from(year).map_err(|_| invalid())?;
        // Both this month and the next one need to be representable.
        Date::new(year, month as i8, 1).map_err(|_| invalid())?;
        if month == 12 {
            Date::new(year.checked_add(1).ok_or_else(invalid)?, 1, 1).map_err(|_| invalid())?;
        }
        Ok(Month {
            year,
            month: month as i8,
        })
    }

    pub fn containing(day: Date) -> Month {
        Month {
            year: day.year(),
            month: day.month(),
        }
    }

    pub fn year(&self) -> i16 {
        self.year
    }

    pub fn month(&self) -> i8 {
        self.month
    }

    /// Fails for a month stepped to outside the supported civil range, e.g.
    /// the `next()` of 9999-12.
    pub fn start_date(&self) -> Result<Date, Error> {
        Date::new(self.year, self.month, 1).map_err(|_| Error::InvalidPeriod {
            year: self.year.into(),
            month: self.month.into(),
        })
    }

    /// December rolls over into January of the next year.
    pub fn next(&self) -> Month {
        Month {
            year: self.year + (self.month / 12) as i16,
            month: (self.month % 12) + 1,
        }
    }

    pub fn previous(&self) -> Month {
        if self.month == 1 {
            Month {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Month {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// All months between self and end, both ends included.
    pub fn up_to(&self, end: Month) -> Vec<Month> {
        let mut months = Vec::new();
        let mut current = *self;
        while current <= end {
            months.push(current);
            current = current.next();
        }
        months
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Parse a month in the `YYYY-MM` format, e.g. `2024-03`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::Config(format!("Failed parsing {} as a month, expected YYYY-MM", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(malformed)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(malformed());
        }
        let year = year.parse::<i64>().map_err(|_| malformed())?;
        let month = month.parse::<i64>().map_err(|_| malformed())?;
        Month::new(year, month)
    }
}

pub mod month;
pub mod month_tz;

use jiff::{SignedDuration, Zoned};

pub trait IntervalTzLike {
    fn start(&self) -> Zoned;
    fn end(&self) -> Zoned;

    fn contains(&self, dt: &Zoned) -> bool {
        dt >= &self.start() && dt < &self.end()
    }

    /// Elapsed physical time between start and end.  Always computed on the
    /// absolute instants, so a DST change inside the interval is accounted for.
    fn duration(&self) -> SignedDuration {
        self.end().timestamp().duration_since(self.start().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use jiff::{civil::date, tz::TimeZone, SignedDuration, Zoned};

    use super::IntervalTzLike;

    struct Window(Zoned, Zoned);

    impl IntervalTzLike for Window {
        fn start(&self) -> Zoned {
            self.0.clone()
        }
        fn end(&self) -> Zoned {
            self.1.clone()
        }
    }

    #[test]
    fn wall_clock_vs_physical() {
        let tz = TimeZone::get("Europe/Berlin").unwrap();
        let start = date(2024, 3, 31).at(0, 0, 0, 0).to_zoned(tz.clone()).unwrap();
        let end = date(2024, 4, 1).at(0, 0, 0, 0).to_zoned(tz).unwrap();
        let span = Window(start.clone(), end);
        // 2024-03-31 only has 23 hours in Berlin
        assert_eq!(span.duration(), SignedDuration::from_hours(23));
        assert!(span.contains(&start));
        assert!(!span.contains(&span.end()));
    }
}

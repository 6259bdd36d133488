use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jiff::tz::TimeZone;
use myenergi_report::interval::{
    month::month,
    month_tz::{compute_period, MonthTz},
};

fn by_zone_name(c: &mut Criterion) {
    c.bench_function("compute_period Europe/Berlin 2024", |b| {
        b.iter(|| {
            for m in 1..=12 {
                let _ = compute_period(black_box(2024), black_box(m), "Europe/Berlin");
            }
        });
    });
}

fn by_time_zone(c: &mut Criterion) {
    let tz = TimeZone::get("America/New_York").unwrap();
    c.bench_function("MonthTz hours America/New_York 2020-2029", |b| {
        b.iter(|| {
            let mut hours = 0.0;
            for m in month(2020, 1).up_to(month(2029, 12)) {
                hours += MonthTz::new(m, &tz).unwrap().period().hour_count();
            }
            hours
        });
    });
}

criterion_group!(benches, by_zone_name, by_time_zone);
criterion_main!(benches);

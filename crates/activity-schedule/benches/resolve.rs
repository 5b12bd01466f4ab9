use activity_schedule::{Occurrence, RawOccurrence, ScheduleResolver};
use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_resolve(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let resolver = ScheduleResolver::default();

    let occurrences: Vec<Occurrence> = (-100..100)
        .map(|d| Occurrence::new(now + Duration::days(d * 3)).with_time("09:00"))
        .collect();

    let raw: Vec<RawOccurrence> = occurrences
        .iter()
        .map(|o| RawOccurrence::new(o.date.format("%Y-%m-%d %H:%M").to_string().as_str()))
        .chain(std::iter::repeat_with(|| RawOccurrence::new("not-a-date")).take(20))
        .collect();

    c.bench_function("resolve_200_occurrences", |b| {
        b.iter(|| resolver.resolve(black_box(&occurrences), black_box(now)))
    });

    c.bench_function("resolve_raw_220_records", |b| {
        b.iter(|| resolver.resolve_raw(black_box(&raw), black_box(now)))
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);

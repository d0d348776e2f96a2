use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_fanout::{InMemoryOfferCache, LookupKey, Offer, OfferCache, Segment};
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn sample_offers(count: usize) -> Vec<Offer> {
    let date = NaiveDate::from_ymd_opt(2026, 1, 19).unwrap();
    let departs = date.and_hms_opt(20, 0, 0).unwrap();
    (0..count)
        .map(|i| Offer {
            airline: "TK".to_string(),
            date,
            price: 500.0 + i as f64,
            segments: vec![Segment {
                origin: "BOS".to_string(),
                destination: "SYD".to_string(),
                start_time: departs,
                end_time: departs + chrono::Duration::hours(30),
            }],
        })
        .collect()
}

// Mixed read/write traffic from several threads over a pool of routes
pub fn cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("flight_offer_cache");

    for offers_per_entry in [1, 10, 50].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(offers_per_entry),
            offers_per_entry,
            |b, &offers_per_entry| {
                let payload = sample_offers(offers_per_entry);
                let airports = ["BOS", "JFK", "LAX", "SYD", "LHR", "CDG", "DXB", "IST"];
                let dates: Vec<NaiveDate> = (1..29)
                    .map(|d| NaiveDate::from_ymd_opt(2026, 2, d).unwrap())
                    .collect();

                b.iter(|| {
                    let cache = Arc::new(InMemoryOfferCache::with_ttl(Duration::from_secs(300)));

                    let mut handles = vec![];
                    for _ in 0..4 {
                        let cache = Arc::clone(&cache);
                        let payload = payload.clone();
                        let dates = dates.clone();

                        handles.push(thread::spawn(move || {
                            let mut rng = thread_rng();
                            for _ in 0..250 {
                                let key = LookupKey::new(
                                    airports.choose(&mut rng).unwrap(),
                                    airports.choose(&mut rng).unwrap(),
                                    *dates.choose(&mut rng).unwrap(),
                                );

                                if rng.gen_bool(0.3) {
                                    cache.set(key, payload.clone());
                                } else {
                                    let _ = cache.get(&key);
                                }
                            }
                        }));
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }

                    black_box(cache.stats())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, cache_benchmark);
criterion_main!(benches);

use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use hotel_core::scheduler::queue::{self, ServiceRequest};
use hotel_protocol::{AcMode, FanSpeed};

fn serving_set(n: usize) -> Vec<ServiceRequest> {
    let now = Utc::now();
    let speeds = [FanSpeed::Low, FanSpeed::Medium, FanSpeed::High];
    (0..n)
        .map(|i| ServiceRequest {
            room_id: i as u32 + 1,
            fan_speed: speeds[i % speeds.len()],
            mode: AcMode::Cooling,
            target_temp: 25.0,
            serving_time: Some(now - Duration::seconds((i as i64 * 17) % 600)),
            waiting_time: None,
        })
        .collect()
}

fn waiting_queue(n: usize) -> Vec<ServiceRequest> {
    let now = Utc::now();
    let speeds = [FanSpeed::Low, FanSpeed::Medium, FanSpeed::High];
    (0..n)
        .map(|i| ServiceRequest {
            room_id: i as u32 + 1,
            fan_speed: speeds[(i + 1) % speeds.len()],
            mode: AcMode::Cooling,
            target_temp: 25.0,
            serving_time: None,
            waiting_time: Some(now - Duration::seconds((i as i64 * 31) % 600)),
        })
        .collect()
}

// Victim selection is the hot scan on every admission and capacity pass.
fn bench_victim_selection(c: &mut Criterion) {
    c.bench_function("eviction_victim_10", |b| {
        let set = serving_set(10);
        b.iter(|| std::hint::black_box(queue::eviction_victim(&set)));
    });

    c.bench_function("eviction_victim_100", |b| {
        let set = serving_set(100);
        b.iter(|| std::hint::black_box(queue::eviction_victim(&set)));
    });

    c.bench_function("rotation_victim_100", |b| {
        let set = serving_set(100);
        b.iter(|| std::hint::black_box(queue::rotation_victim(&set, FanSpeed::Medium.priority())));
    });
}

fn bench_promotion_pick(c: &mut Criterion) {
    c.bench_function("promotion_pick_100", |b| {
        let q = waiting_queue(100);
        b.iter(|| std::hint::black_box(queue::promotion_pick(&q)));
    });
}

criterion_group!(benches, bench_victim_selection, bench_promotion_pick);
criterion_main!(benches);

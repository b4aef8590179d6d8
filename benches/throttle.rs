use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use throttled::{MaxConcurrentTasks, ThrottleOptions, ThrottledFn, throttle};

fn options(period_ms: u64, capacity: usize) -> ThrottleOptions {
    ThrottleOptions {
        max_concurrent_tasks: MaxConcurrentTasks::try_from(capacity).unwrap(),
        ..ThrottleOptions::with_period_ms(period_ms)
    }
}

/// A throttled function whose pool is full of calls waiting out a one minute window.
fn saturated(capacity: usize) -> ThrottledFn {
    let throttled = ThrottledFn::new(|| {}, options(60_000, capacity));

    // The first call executes at once and opens the window.
    throttled.call().unwrap();
    throttled.wait_idle();

    for _ in 0..capacity {
        throttled.call().unwrap();
    }

    throttled
}

fn bench_call_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("threaded/call_and_drain");
    group.sample_size(20);

    for calls in [1_usize, 10, 50] {
        group.bench_function(format!("period_ms=0/calls={calls}"), |b| {
            b.iter_batched(
                || throttle(|| {}, 0),
                |throttled| {
                    for _ in 0..calls {
                        black_box(throttled.call()).unwrap();
                    }
                    throttled.wait_idle();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_reject_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("threaded/reject_path");
    group.sample_size(200);

    for capacity in [1_usize, 50] {
        let throttled = saturated(capacity);

        group.bench_function(format!("call/capacity={capacity}"), |b| {
            b.iter(|| {
                black_box(throttled.call()).unwrap_err();
            });
        });

        group.bench_function(format!("pending/capacity={capacity}"), |b| {
            b.iter(|| {
                black_box(throttled.pending());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_call_and_drain, bench_reject_path);
criterion_main!(benches);

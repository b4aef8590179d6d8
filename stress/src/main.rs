use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use tracing_subscriber::EnvFilter;

use throttled::{
    ErrorObserver, MaxConcurrentTasks, ThrottleOptions, ThrottledError, ThrottledFn,
};

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Backend {
    /// One OS thread per pending call.
    Threaded,
    /// Tokio tasks (requires `--features tokio`).
    Async,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "throttled-stress",
    about = "Load test harness for throttled: hammers one throttled function and checks window spacing"
)]
struct Args {
    #[arg(long, value_enum, default_value_t = Backend::Threaded)]
    backend: Backend,

    /// Number of caller threads.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    #[arg(long, default_value_t = 10)]
    duration_s: u64,

    #[arg(long, default_value_t = 20)]
    period_ms: u64,

    #[arg(long, default_value_t = 50)]
    max_concurrent_tasks: usize,

    /// Calls per second per caller thread. Unpaced when omitted.
    #[arg(long)]
    target_qps: Option<u64>,

    /// Make every n-th execution fail. `0` never fails.
    #[arg(long, default_value_t = 0)]
    fail_every: u64,

    /// How long to wait for pending calls after callers stop.
    #[arg(long, default_value_t = 60)]
    drain_timeout_s: u64,
}

#[derive(Default)]
struct Counts {
    admitted: AtomicU64,
    rejected: AtomicU64,
    spawn_errors: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    violations: AtomicU64,
}

/// Gaps between consecutive execution starts.
struct Gaps {
    last_start: Option<Instant>,
    hist: Histogram<u64>,
}

#[derive(Clone)]
enum Invoker {
    Threaded(ThrottledFn),
    #[cfg(feature = "tokio")]
    Async(throttled::AsyncThrottledFn, Arc<tokio::runtime::Runtime>),
}

impl Invoker {
    fn call(&self) -> Result<(), ThrottledError> {
        match self {
            Invoker::Threaded(throttled) => throttled.call(),
            #[cfg(feature = "tokio")]
            Invoker::Async(throttled, rt) => {
                let _enter = rt.enter();
                throttled.call()
            }
        }
    }

    fn pending(&self) -> usize {
        match self {
            Invoker::Threaded(throttled) => throttled.pending(),
            #[cfg(feature = "tokio")]
            Invoker::Async(throttled, _) => throttled.pending(),
        }
    }
}

fn build_options(args: &Args, counts: &Arc<Counts>) -> ThrottleOptions {
    let on_error: ErrorObserver = {
        let counts = Arc::clone(counts);
        Arc::new(move |err: &ThrottledError| {
            tracing::debug!(error = ?err, "stress.action.failed");
            counts.failed.fetch_add(1, Ordering::Relaxed);
        })
    };

    ThrottleOptions {
        max_concurrent_tasks: MaxConcurrentTasks::try_from(args.max_concurrent_tasks).unwrap(),
        on_error: Some(on_error),
        name: Some("stress".to_string()),
        ..ThrottleOptions::with_period_ms(args.period_ms)
    }
}

fn build_action(
    args: &Args,
    counts: &Arc<Counts>,
    gaps: &Arc<Mutex<Gaps>>,
) -> impl Fn() -> Result<(), String> + Send + Sync + use<> {
    let counts = Arc::clone(counts);
    let gaps = Arc::clone(gaps);
    let period = Duration::from_millis(args.period_ms);
    let fail_every = args.fail_every;

    move || {
        let now = Instant::now();

        {
            let mut gaps = gaps.lock().unwrap();
            if let Some(last_start) = gaps.last_start {
                let gap = now.duration_since(last_start);
                if gap < period {
                    counts.violations.fetch_add(1, Ordering::Relaxed);
                }
                let _ = gaps.hist.record((gap.as_micros() as u64).max(1));
            }
            gaps.last_start = Some(now);
        }

        let n = counts.executed.fetch_add(1, Ordering::Relaxed) + 1;

        if fail_every > 0 && n.is_multiple_of(fail_every) {
            return Err(format!("injected failure #{n}"));
        }

        Ok(())
    }
}

#[cfg(feature = "tokio")]
fn build_async(args: &Args, counts: &Arc<Counts>, gaps: &Arc<Mutex<Gaps>>) -> Invoker {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    Invoker::Async(
        throttled::AsyncThrottledFn::new(
            build_action(args, counts, gaps),
            build_options(args, counts),
        ),
        Arc::new(rt),
    )
}

#[cfg(not(feature = "tokio"))]
fn build_async(_: &Args, _: &Arc<Counts>, _: &Arc<Mutex<Gaps>>) -> Invoker {
    eprintln!("async backend requires: cargo run -p throttled-stress --features tokio -- ...");
    std::process::exit(2);
}

fn print_results(args: &Args, elapsed: Duration, drained: bool, gaps: &Gaps, counts: &Counts) {
    println!(
        "backend={:?} threads={} period_ms={} max_concurrent_tasks={} target_qps={:?}",
        args.backend, args.threads, args.period_ms, args.max_concurrent_tasks, args.target_qps
    );
    println!(
        "elapsed_s={:.3} drained={}",
        elapsed.as_secs_f64(),
        drained
    );
    println!(
        "admitted={} rejected={} spawn_errors={} executed={} failed={} violations={}",
        counts.admitted.load(Ordering::Relaxed),
        counts.rejected.load(Ordering::Relaxed),
        counts.spawn_errors.load(Ordering::Relaxed),
        counts.executed.load(Ordering::Relaxed),
        counts.failed.load(Ordering::Relaxed),
        counts.violations.load(Ordering::Relaxed)
    );

    let hist = &gaps.hist;
    if !hist.is_empty() {
        println!(
            "gap_us min={} p50={} p95={} p99={} max={}",
            hist.min(),
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.max()
        );
    } else {
        println!("fewer than two executions, no gaps recorded");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let counts = Arc::new(Counts::default());
    let gaps = Arc::new(Mutex::new(Gaps {
        last_start: None,
        hist: Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3).unwrap(),
    }));

    let invoker = match args.backend {
        Backend::Threaded => Invoker::Threaded(ThrottledFn::new(
            build_action(&args, &counts, &gaps),
            build_options(&args, &counts),
        )),
        Backend::Async => build_async(&args, &counts, &gaps),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_s);

    let mut handles = Vec::with_capacity(args.threads);
    for _ in 0..args.threads {
        let invoker = invoker.clone();
        let stop = Arc::clone(&stop);
        let counts = Arc::clone(&counts);
        let target_qps = args.target_qps;

        handles.push(std::thread::spawn(move || {
            let mut next_deadline = Instant::now();

            while !stop.load(Ordering::Relaxed) && Instant::now() < deadline {
                if let Some(qps) = target_qps {
                    let per_op_ns = 1_000_000_000u64 / qps.max(1);
                    let now = Instant::now();
                    if now < next_deadline {
                        std::thread::sleep(next_deadline - now);
                    }
                    next_deadline += Duration::from_nanos(per_op_ns);
                }

                match invoker.call() {
                    Ok(()) => counts.admitted.fetch_add(1, Ordering::Relaxed),
                    Err(ThrottledError::PoolExhausted { .. }) => {
                        counts.rejected.fetch_add(1, Ordering::Relaxed)
                    }
                    Err(err) => {
                        tracing::error!(error = ?err, "stress.call.error");
                        counts.spawn_errors.fetch_add(1, Ordering::Relaxed)
                    }
                };

                if target_qps.is_none() {
                    // Unpaced callers mostly hit a full pool; yield so tasks get scheduled.
                    std::thread::yield_now();
                }
            }
        }));
    }

    std::thread::sleep(Duration::from_secs(args.duration_s));
    stop.store(true, Ordering::Relaxed);

    for h in handles {
        h.join().unwrap();
    }

    let drain_deadline = Instant::now() + Duration::from_secs(args.drain_timeout_s);
    while invoker.pending() > 0 && Instant::now() < drain_deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let drained = invoker.pending() == 0;

    let elapsed = started.elapsed();
    let gaps = gaps.lock().unwrap();
    print_results(&args, elapsed, drained, &gaps, &counts);

    if counts.violations.load(Ordering::Relaxed) > 0 {
        std::process::exit(1);
    }
}

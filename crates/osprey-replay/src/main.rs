//! Osprey Replay - synthetic load replay and benchmarking.
//!
//! Drives synthetic order flow through the matcher and the full threaded
//! pipeline and reports latency distributions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hdrhistogram::Histogram;
use osprey_core::{
    Engine, Matcher, Order, OrderId, Price, Quantity, Side, Trade, TradeSink,
};
use osprey_metrics::Clock;

/// Synthetic order generator.
struct OrderGenerator {
    next_id: u64,
}

impl OrderGenerator {
    fn new() -> Self {
        Self { next_id: 1 }
    }

    fn next(&mut self, side: Side, price_ticks: u64, qty: u32) -> Order {
        let id = self.next_id;
        self.next_id += 1;
        Order::new(
            OrderId(id),
            side,
            Price::from_ticks(price_ticks),
            Quantity(qty),
            id,
        )
    }
}

/// Sink that only counts, for pipeline throughput runs.
struct CountingSink {
    trades: Arc<AtomicU64>,
}

impl TradeSink for CountingSink {
    fn on_trade(&self, _trade: &Trade) {
        self.trades.fetch_add(1, Ordering::Relaxed);
    }
}

fn print_summary(prefix: &str, histogram: &Histogram<u64>) {
    println!("{} Distribution:", prefix);
    println!("{}   P50:   {:>8} ns", prefix, histogram.value_at_quantile(0.50));
    println!("{}   P90:   {:>8} ns", prefix, histogram.value_at_quantile(0.90));
    println!("{}   P99:   {:>8} ns", prefix, histogram.value_at_quantile(0.99));
    println!("{}   P99.9: {:>8} ns", prefix, histogram.value_at_quantile(0.999));
    println!("{}   Max:   {:>8} ns", prefix, histogram.max());
}

fn main() {
    println!("==============================================================");
    println!("                      OSPREY REPLAY");
    println!("           Matching engine latency benchmark");
    println!("==============================================================");
    println!();

    let clock = Clock::new();

    // Warm up allocator, branch predictors, clock calibration.
    println!("[1/4] Warming up...");
    {
        let mut matcher = Matcher::with_pool_capacity(1 << 14);
        let mut gen = OrderGenerator::new();
        for _ in 0..10_000 {
            let order = gen.next(Side::Buy, 10_000, 100);
            matcher.process(order, &clock, &mut |_| {});
        }
    }

    // Phase 1: insertion latency, non-crossing flow.
    println!("[2/4] Benchmarking insertions...");
    let mut matcher = Matcher::with_pool_capacity(1 << 18);
    let mut gen = OrderGenerator::new();
    let mut insert_hist: Histogram<u64> =
        Histogram::new(3).expect("failed to create histogram");

    let insert_count = 100_000u64;
    let start = Instant::now();
    for i in 0..insert_count {
        let order = if i % 2 == 0 {
            gen.next(Side::Buy, 10_000 + (i % 100), 100)
        } else {
            // One unit above the whole bid range: rests without matching.
            gen.next(Side::Sell, 10_100 + (i % 100), 100)
        };

        let begin = Instant::now();
        matcher.process(order, &clock, &mut |_| {});
        let _ = insert_hist.record(begin.elapsed().as_nanos() as u64);
    }
    let insert_elapsed = start.elapsed();
    let insert_rate = insert_count as f64 / insert_elapsed.as_secs_f64();

    println!("   Inserted {} orders in {:.2?}", insert_count, insert_elapsed);
    println!("   Rate: {:.0} orders/sec", insert_rate);
    print_summary("   Insert Latency", &insert_hist);

    // Phase 2: matching latency against the seeded book.
    println!();
    println!("[3/4] Benchmarking matching...");
    let mut match_hist: Histogram<u64> =
        Histogram::new(3).expect("failed to create histogram");
    let mut trade_count = 0u64;

    let match_count = 50_000u64;
    let start = Instant::now();
    for _ in 0..match_count {
        // Crosses the whole resting ask range.
        let order = gen.next(Side::Buy, 10_199, 50);

        let begin = Instant::now();
        matcher.process(order, &clock, &mut |_| trade_count += 1);
        let _ = match_hist.record(begin.elapsed().as_nanos() as u64);
    }
    let match_elapsed = start.elapsed();
    let match_rate = match_count as f64 / match_elapsed.as_secs_f64();

    println!("   Matched {} orders in {:.2?}", match_count, match_elapsed);
    println!("   Rate: {:.0} orders/sec", match_rate);
    println!("   Trades: {}", trade_count);
    print_summary("   Match Latency", &match_hist);

    let (pool_active, pool_capacity) = matcher.pool_stats();

    // Phase 3: full pipeline, queue handoff included.
    println!();
    println!("[4/4] Benchmarking threaded pipeline...");
    let trades = Arc::new(AtomicU64::new(0));
    let mut engine = Engine::with_pool_capacity(1 << 18);
    engine
        .set_trade_sink(CountingSink {
            trades: Arc::clone(&trades),
        })
        .expect("sink installed before start");
    engine.start().expect("engine start");

    let mut gen = OrderGenerator::new();
    let pipeline_count = 100_000u64;
    let start = Instant::now();
    for i in 0..pipeline_count {
        let order = match i % 10 {
            0..=6 => gen.next(Side::Buy, 10_000 + (i % 50), 100),
            7..=8 => gen.next(Side::Sell, 10_000 + (i % 50), 100),
            _ => gen.next(Side::Buy, 10_100, 50),
        };
        engine.submit(order);
    }
    engine.stop();
    let pipeline_elapsed = start.elapsed();
    let pipeline_rate = pipeline_count as f64 / pipeline_elapsed.as_secs_f64();

    let stats = engine.latency_stats();
    println!(
        "   Processed {} orders in {:.2?}",
        pipeline_count, pipeline_elapsed
    );
    println!("   Rate: {:.0} orders/sec", pipeline_rate);
    println!("   Trades: {}", trades.load(Ordering::Relaxed));
    println!(
        "   Worker latency: avg {:.2}µs  min {:.2}µs  max {:.2}µs",
        stats.average_micros(),
        stats.min_micros(),
        stats.max_micros()
    );

    // Summary.
    println!();
    println!("==============================================================");
    println!("                     BENCHMARK SUMMARY");
    println!("--------------------------------------------------------------");
    println!("  Insert rate:    {:>12.0} orders/sec", insert_rate);
    println!("  Match rate:     {:>12.0} orders/sec", match_rate);
    println!("  Pipeline rate:  {:>12.0} orders/sec", pipeline_rate);
    println!("  Pool usage:     {:>12} / {}", pool_active, pool_capacity);
    println!("==============================================================");
}

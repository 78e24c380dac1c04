//! Osprey order book server.
//!
//! Wires the full pipeline: TCP gateway and console ingress feed the
//! matching engine; the engine's trade sink echoes executions to stdout
//! and hands them to the CSV trade log. One positional argument selects
//! the listen port (default 8080). Stdin accepts `stats`, `quit`/`exit`,
//! or raw JSON order lines.

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use osprey_core::{Engine, OrderIdSource, StatsView, Trade, TradeSink};
use osprey_log::{TradeLogHandle, TradeLogger};
use osprey_metrics::{format_nanos, Clock};
use osprey_net::Gateway;
use osprey_proto::{trade_line, OrderDecoder};

const DEFAULT_PORT: u16 = 8080;
const TRADE_LOG_PATH: &str = "trades.csv";
const POOL_CAPACITY: usize = 4096;

/// Seconds between periodic stats snapshots.
const STATS_INTERVAL_SECS: u64 = 10;

/// Engine trade sink: echo to the console, count, persist.
struct ServerSink {
    log: TradeLogHandle,
    total_trades: Arc<AtomicU64>,
}

impl TradeSink for ServerSink {
    fn on_trade(&self, trade: &Trade) {
        self.log.log(*trade);
        println!("{}", trade_line(trade));
        self.total_trades.fetch_add(1, Ordering::Relaxed);
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let port = match parse_port() {
        Ok(port) => port,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(port) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal error");
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Single positional numeric argument: the TCP listen port.
fn parse_port() -> anyhow::Result<u16> {
    match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u16>()
            .with_context(|| format!("invalid port {:?}", arg)),
        None => Ok(DEFAULT_PORT),
    }
}

fn run(port: u16) -> anyhow::Result<()> {
    let mut engine = Engine::with_pool_capacity(POOL_CAPACITY);
    let clock = engine.clock().clone();
    let ids = Arc::new(OrderIdSource::new());
    let decoder = OrderDecoder::new(ids, clock.clone());
    let total_trades = Arc::new(AtomicU64::new(0));

    let mut trade_log = TradeLogger::create(TRADE_LOG_PATH, clock.clone())
        .with_context(|| format!("failed to open trade log {:?}", TRADE_LOG_PATH))?;

    engine.set_trade_sink(ServerSink {
        log: trade_log.handle(),
        total_trades: Arc::clone(&total_trades),
    })?;

    // Bind before spawning anything: a taken port must fail the process.
    let addr = format!("0.0.0.0:{}", port);
    let mut gateway = Gateway::bind(&addr, decoder.clone(), engine.handle())
        .with_context(|| format!("failed to listen on {}", addr))?;

    trade_log.start();
    engine.start()?;

    println!("Osprey Order Book Engine starting...");
    println!("Server listening on port {}", port);
    info!(%addr, "gateway listening");

    let running = Arc::new(AtomicBool::new(true));

    let gateway_thread = thread::Builder::new()
        .name("osprey-gateway".into())
        .spawn({
            let running = Arc::clone(&running);
            move || {
                if let Err(err) = gateway.run(&running) {
                    error!(%err, "gateway terminated");
                }
            }
        })
        .context("failed to spawn gateway thread")?;

    let stats_thread = thread::Builder::new()
        .name("osprey-stats".into())
        .spawn({
            let running = Arc::clone(&running);
            let view = engine.stats_view();
            let total_trades = Arc::clone(&total_trades);
            move || stats_loop(&running, &view, &total_trades)
        })
        .context("failed to spawn stats thread")?;

    console_loop(&engine, &decoder, &total_trades, &clock);

    info!("shutting down");
    running.store(false, Ordering::Relaxed);
    let _ = gateway_thread.join();
    let _ = stats_thread.join();

    // Both workers drain their queues before joining.
    engine.stop();
    trade_log.stop();

    info!("shutdown complete");
    Ok(())
}

/// Interactive command loop; returns on `quit`, `exit`, or EOF.
fn console_loop(engine: &Engine, decoder: &OrderDecoder, total_trades: &AtomicU64, clock: &Clock) {
    println!("Commands: 'quit', 'stats', or JSON orders");
    println!("Example: {{\"side\":\"buy\",\"price\":100.50,\"quantity\":10}}");
    println!();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "stats" => print_stats(&engine.stats_view(), total_trades),
            order_text => submit_console_order(engine, decoder, order_text, clock),
        }
    }
}

fn submit_console_order(engine: &Engine, decoder: &OrderDecoder, line: &str, clock: &Clock) {
    let begin = clock.raw();

    match decoder.decode_line(line) {
        Ok(order) => {
            engine.submit(order);
            let elapsed = clock.delta_nanos(begin, clock.raw());
            println!(
                "Input processing: {} | Buy orders: {} | Sell orders: {}",
                format_nanos(elapsed),
                engine.buy_depth(),
                engine.sell_depth()
            );
        }
        Err(err) => eprintln!("Error: invalid order: {}", err),
    }
}

/// Periodic snapshot printer, sliced so shutdown is prompt.
fn stats_loop(running: &AtomicBool, view: &StatsView, total_trades: &AtomicU64) {
    let slices = STATS_INTERVAL_SECS * 10;
    while running.load(Ordering::Relaxed) {
        for _ in 0..slices {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        print_stats(view, total_trades);
    }
}

fn print_stats(view: &StatsView, total_trades: &AtomicU64) {
    let latency = view.latency();
    println!();
    println!("=== ORDER BOOK STATISTICS ===");
    println!("Total Orders Processed: {}", latency.count());
    println!(
        "Total Trades Executed: {}",
        total_trades.load(Ordering::Relaxed)
    );
    println!("Average Latency: {:.2}µs", latency.average_micros());
    println!("Min Latency: {:.2}µs", latency.min_micros());
    println!("Max Latency: {:.2}µs", latency.max_micros());
    println!("Active Buy Orders: {}", view.buy_depth());
    println!("Active Sell Orders: {}", view.sell_depth());
    println!("=============================");
    println!();
}

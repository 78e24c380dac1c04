//! Threaded matching engine.
//!
//! Wires the submission queue to a single matching worker that owns both
//! books and the order arena. Producers hand owned orders to `submit`;
//! the worker crosses them and pushes every execution through the
//! installed trade sink, synchronously, on the worker thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use osprey_metrics::{Clock, LatencyStats};
use osprey_queue::BlockingQueue;
use thiserror::Error;
use tracing::debug;

use crate::matcher::{Matcher, DEFAULT_POOL_CAPACITY};
use crate::order::Order;
use crate::trade::Trade;

/// Consumer of executions, invoked from the matching worker.
///
/// Installed once before `start()` and never changed afterward. The sink
/// runs inside the hot path and must not panic or block.
pub trait TradeSink: Send + 'static {
    fn on_trade(&self, trade: &Trade);
}

/// Channel senders work directly as sinks; handy for tests and fan-out.
impl TradeSink for std::sync::mpsc::Sender<Trade> {
    fn on_trade(&self, trade: &Trade) {
        let _ = self.send(*trade);
    }
}

/// Engine lifecycle errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("matching worker is already running")]
    AlreadyRunning,
    #[error("a trade sink must be installed before start")]
    MissingSink,
}

struct DepthCounters {
    buys: AtomicU64,
    sells: AtomicU64,
}

/// Cloneable producer endpoint for ingress threads.
#[derive(Clone)]
pub struct SubmitHandle {
    queue: Arc<BlockingQueue<Order>>,
}

impl SubmitHandle {
    /// Enqueue an order for matching. Returns `false` once the engine has
    /// been stopped.
    #[inline]
    pub fn submit(&self, order: Order) -> bool {
        self.queue.push(order)
    }
}

/// Cloneable read-only view of the engine's counters, for reporting
/// threads that outlive a borrow of the engine itself.
#[derive(Clone)]
pub struct StatsView {
    stats: Arc<LatencyStats>,
    depth: Arc<DepthCounters>,
}

impl StatsView {
    pub fn latency(&self) -> &LatencyStats {
        &self.stats
    }

    pub fn buy_depth(&self) -> u64 {
        self.depth.buys.load(Ordering::Relaxed)
    }

    pub fn sell_depth(&self) -> u64 {
        self.depth.sells.load(Ordering::Relaxed)
    }
}

/// The matching engine: submission queue, one worker, one trade sink.
pub struct Engine {
    queue: Arc<BlockingQueue<Order>>,
    stats: Arc<LatencyStats>,
    depth: Arc<DepthCounters>,
    clock: Clock,
    pool_capacity: usize,
    sink: Option<Box<dyn TradeSink>>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_pool_capacity(pool_capacity: usize) -> Self {
        Self {
            queue: Arc::new(BlockingQueue::new()),
            stats: Arc::new(LatencyStats::new()),
            depth: Arc::new(DepthCounters {
                buys: AtomicU64::new(0),
                sells: AtomicU64::new(0),
            }),
            clock: Clock::new(),
            pool_capacity,
            sink: None,
            worker: None,
        }
    }

    /// The clock orders are timestamped against. Decoders share it so
    /// capture timestamps and latency samples live in one time domain.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Install the trade sink. Must happen before `start()`.
    pub fn set_trade_sink(&mut self, sink: impl TradeSink) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        self.sink = Some(Box::new(sink));
        Ok(())
    }

    /// Spawn the matching worker.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let sink = self.sink.take().ok_or(EngineError::MissingSink)?;

        let queue = Arc::clone(&self.queue);
        let stats = Arc::clone(&self.stats);
        let depth = Arc::clone(&self.depth);
        let clock = self.clock.clone();
        let pool_capacity = self.pool_capacity;

        let worker = thread::Builder::new()
            .name("osprey-match".into())
            .spawn(move || {
                let mut matcher = Matcher::with_pool_capacity(pool_capacity);
                debug!("matching worker started");

                while let Some(order) = queue.pop() {
                    let begin = clock.raw();
                    matcher.process(order, &clock, &mut |trade| sink.on_trade(&trade));
                    let end = clock.raw();

                    stats.record(clock.delta_nanos(begin, end));
                    depth.buys.store(matcher.buy_depth(), Ordering::Relaxed);
                    depth.sells.store(matcher.sell_depth(), Ordering::Relaxed);
                }

                debug!(
                    resting_buys = matcher.buy_depth(),
                    resting_sells = matcher.sell_depth(),
                    "matching worker drained and stopped"
                );
            })
            .expect("failed to spawn matching worker");

        self.worker = Some(worker);
        Ok(())
    }

    /// Hand an owned order to the engine. Non-blocking beyond the enqueue;
    /// returns `false` once the engine has been stopped.
    #[inline]
    pub fn submit(&self, order: Order) -> bool {
        self.queue.push(order)
    }

    /// Producer endpoint that can be cloned into ingress threads.
    pub fn handle(&self) -> SubmitHandle {
        SubmitHandle {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Stop accepting orders, drain the queue, join the worker.
    ///
    /// After this returns no further sink callbacks fire. Idempotent and
    /// invoked from `Drop`.
    pub fn stop(&mut self) {
        self.queue.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Count of resting buy orders, as of the last processed order.
    pub fn buy_depth(&self) -> u64 {
        self.depth.buys.load(Ordering::Relaxed)
    }

    /// Count of resting sell orders, as of the last processed order.
    pub fn sell_depth(&self) -> u64 {
        self.depth.sells.load(Ordering::Relaxed)
    }

    /// Hot-path latency counters.
    pub fn latency_stats(&self) -> &LatencyStats {
        &self.stats
    }

    /// Detachable view of the counters for reporting threads.
    pub fn stats_view(&self) -> StatsView {
        StatsView {
            stats: Arc::clone(&self.stats),
            depth: Arc::clone(&self.depth),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

//! CSV trade sink with an asynchronous drain worker.
//!
//! The matching worker pushes `Trade` records into an unbounded queue and
//! returns immediately; a dedicated worker formats and persists them. The
//! queue being unbounded trades memory growth for matching latency when
//! the disk falls behind.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Local;
use osprey_core::Trade;
use osprey_metrics::Clock;
use osprey_queue::BlockingQueue;
use tracing::{debug, error};

/// Column header written once per file.
pub const CSV_HEADER: &str = "timestamp,buy_order_id,sell_order_id,price,quantity";

/// Producer endpoint handed to the trade sink.
#[derive(Clone)]
pub struct TradeLogHandle {
    queue: Arc<BlockingQueue<Trade>>,
}

impl TradeLogHandle {
    /// Enqueue a trade for persistence. Never blocks on the disk.
    #[inline]
    pub fn log(&self, trade: Trade) {
        self.queue.push(trade);
    }
}

/// File-backed trade log.
///
/// Opens the file append-or-create at construction, writes the header for
/// a fresh file, and drains its queue from a background worker. `stop()`
/// finishes writing everything already enqueued before returning.
pub struct TradeLogger {
    queue: Arc<BlockingQueue<Trade>>,
    clock: Clock,
    path: PathBuf,
    file: Option<File>,
    worker: Option<JoinHandle<()>>,
}

impl TradeLogger {
    /// Open (or create) the log file and prepare the queue.
    pub fn create(path: impl AsRef<Path>, clock: Clock) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        // A fresh file gets the header; an existing log keeps appending.
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", CSV_HEADER)?;
            file.flush()?;
        }

        Ok(Self {
            queue: Arc::new(BlockingQueue::new()),
            clock,
            path,
            file: Some(file),
            worker: None,
        })
    }

    /// Producer endpoint for the trade sink.
    pub fn handle(&self) -> TradeLogHandle {
        TradeLogHandle {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Spawn the drain worker.
    pub fn start(&mut self) {
        let Some(mut file) = self.file.take() else {
            return; // already started
        };
        let queue = Arc::clone(&self.queue);
        let clock = self.clock.clone();
        let path = self.path.clone();

        let worker = thread::Builder::new()
            .name("osprey-tradelog".into())
            .spawn(move || {
                debug!(path = %path.display(), "trade log worker started");

                while let Some(trade) = queue.pop() {
                    let row = format_trade(&trade, &clock);
                    // A failed write loses this row from persistence only;
                    // the trade was already delivered to in-memory
                    // subscribers.
                    if let Err(err) = writeln!(file, "{}", row).and_then(|_| file.flush()) {
                        error!(%err, path = %path.display(), "trade log write failed");
                    }
                }

                debug!(path = %path.display(), "trade log drained and stopped");
            })
            .expect("failed to spawn trade log worker");

        self.worker = Some(worker);
    }

    /// Close the queue, drain pending records, join the worker.
    /// Idempotent; also invoked from `Drop`.
    pub fn stop(&mut self) {
        self.queue.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Number of records still waiting for the disk.
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for TradeLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One CSV row: wall-clock timestamp, ids, price (two decimals), quantity.
///
/// The trade carries a monotonic capture; the wall-clock instant is
/// recovered by subtracting the capture's age from the current wall time,
/// the same arithmetic the matching clock domain was built on.
fn format_trade(trade: &Trade, clock: &Clock) -> String {
    let age_nanos = clock.now_nanos().saturating_sub(trade.timestamp);
    let wall = Local::now() - chrono::Duration::nanoseconds(age_nanos as i64);

    format!(
        "{},{},{},{},{}",
        wall.format("%Y-%m-%d %H:%M:%S"),
        trade.buy_order_id.0,
        trade.sell_order_id.0,
        trade.price,
        trade.quantity
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use osprey_core::{OrderId, Price, Quantity};
    use std::fs;

    fn temp_log_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("osprey-test-{}-{}.csv", std::process::id(), name))
    }

    fn trade(buy: u64, sell: u64, price_ticks: u64, qty: u32, ts: u64) -> Trade {
        Trade::new(
            OrderId(buy),
            OrderId(sell),
            Price::from_ticks(price_ticks),
            Quantity(qty),
            ts,
        )
    }

    #[test]
    fn test_format_trade_row() {
        let clock = Clock::new();
        let row = format_trade(&trade(1, 2, 10_050, 10, clock.now_nanos()), &clock);

        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 5);
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(fields[0].len(), 19);
        assert_eq!(fields[1], "1");
        assert_eq!(fields[2], "2");
        assert_eq!(fields[3], "100.50");
        assert_eq!(fields[4], "10");
    }

    #[test]
    fn test_logger_writes_header_and_rows() {
        let path = temp_log_path("header-rows");
        let _ = fs::remove_file(&path);

        let clock = Clock::new();
        let mut logger = TradeLogger::create(&path, clock.clone()).unwrap();
        let handle = logger.handle();
        logger.start();

        handle.log(trade(1, 2, 10_000, 10, clock.now_nanos()));
        handle.log(trade(3, 4, 10_050, 5, clock.now_nanos()));
        logger.stop();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].ends_with(",1,2,100.00,10"));
        assert!(lines[2].ends_with(",3,4,100.50,5"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_logger_appends_without_second_header() {
        let path = temp_log_path("append");
        let _ = fs::remove_file(&path);

        let clock = Clock::new();
        for ids in [(1u64, 2u64), (3, 4)] {
            let mut logger = TradeLogger::create(&path, clock.clone()).unwrap();
            let handle = logger.handle();
            logger.start();
            handle.log(trade(ids.0, ids.1, 10_000, 1, clock.now_nanos()));
            logger.stop();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains(",1,2,"));
        assert!(lines[2].contains(",3,4,"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stop_drains_backlog() {
        let path = temp_log_path("drain");
        let _ = fs::remove_file(&path);

        let clock = Clock::new();
        let mut logger = TradeLogger::create(&path, clock.clone()).unwrap();
        let handle = logger.handle();

        // Enqueue before the worker even starts.
        for i in 0..100u64 {
            handle.log(trade(i, i + 1000, 10_000, 1, clock.now_nanos()));
        }
        logger.start();
        logger.stop();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 101);
        assert_eq!(logger.backlog(), 0);

        let _ = fs::remove_file(&path);
    }
}

//! Per-wallet status board and terminal reporter
//!
//! Each session owns the sending half of a `watch` channel; the reporter
//! holds every receiver and renders snapshots until all wallets are done.

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::intent::ResultLabel;

/// One table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletOutputData {
    pub session_duration_min: f64,
    pub done: u64,
    pub total: u64,
    pub current_tx_type: String,
    pub last_tx_result: String,
    pub min_until_next_tx: f64,
    /// 0 running, 1 complete
    pub status: u8,
}

impl WalletOutputData {
    /// "done/total"
    pub fn progress(&self) -> String {
        format!("{}/{}", self.done, self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.status == 1
    }
}

impl Default for WalletOutputData {
    fn default() -> Self {
        Self {
            session_duration_min: 0.0,
            done: 0,
            total: 0,
            current_tx_type: "-".to_string(),
            last_tx_result: "-".to_string(),
            min_until_next_tx: 0.0,
            status: 0,
        }
    }
}

/// Writer handle for one wallet's row
pub struct StatusSlot {
    tx: watch::Sender<WalletOutputData>,
}

impl StatusSlot {
    pub fn set_plan(&self, total: u64, session_duration_min: f64) {
        self.tx.send_modify(|row| {
            if row.is_complete() {
                return;
            }
            row.total = total;
            row.session_duration_min = session_duration_min;
        });
    }

    pub fn set_until_next(&self, minutes: f64) {
        self.tx.send_modify(|row| row.min_until_next_tx = minutes);
    }

    pub fn set_current(&self, tx_type: &str) {
        self.tx
            .send_modify(|row| row.current_tx_type = tx_type.to_string());
    }

    pub fn set_result(&self, label: ResultLabel) {
        self.tx.send_modify(|row| row.last_tx_result = label.to_string());
    }

    /// Progress never moves backwards or past the total
    pub fn set_progress(&self, done: u64) {
        self.tx.send_modify(|row| {
            row.done = row.done.max(done.min(row.total));
        });
    }

    /// Mark the wallet complete; later calls are no-ops
    pub fn mark_complete(&self) {
        self.tx.send_modify(|row| {
            row.status = 1;
            row.min_until_next_tx = 0.0;
        });
    }

    pub fn snapshot(&self) -> WalletOutputData {
        self.tx.borrow().clone()
    }
}

/// Reader side: one receiver per wallet, in input order
pub struct StatusBoard {
    rows: Vec<watch::Receiver<WalletOutputData>>,
}

impl StatusBoard {
    /// Board and writer slots for `wallets` wallets
    pub fn new(wallets: usize) -> (Self, Vec<StatusSlot>) {
        let (slots, rows): (Vec<StatusSlot>, Vec<_>) = (0..wallets)
            .map(|_| {
                let (tx, rx) = watch::channel(WalletOutputData::default());
                (StatusSlot { tx }, rx)
            })
            .unzip();
        (Self { rows }, slots)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn snapshot(&self) -> Vec<WalletOutputData> {
        self.rows.iter().map(|rx| rx.borrow().clone()).collect()
    }

    pub fn all_complete(&self) -> bool {
        self.rows.iter().all(|rx| rx.borrow().is_complete())
    }

    /// Complete, or the session holding the writer is gone
    pub fn all_settled(&self) -> bool {
        self.rows
            .iter()
            .all(|rx| rx.borrow().is_complete() || rx.has_changed().is_err())
    }
}

/// Pad first so ANSI codes do not break column alignment
fn colored_result(result: &str, width: usize) -> String {
    let padded = format!("{:<width$}", result, width = width);
    if result == ResultLabel::Success.to_string() {
        padded.green().to_string()
    } else if result == ResultLabel::Failed.to_string() {
        padded.red().to_string()
    } else if result == ResultLabel::ConstructionError.to_string() {
        padded.yellow().to_string()
    } else {
        padded
    }
}

/// Render the status table, one row per wallet
pub fn render_table(rows: &[WalletOutputData], now: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        format!("Wallet Status - Updated: {}", now.format("%H:%M:%S")).bold()
    ));
    out.push_str(&format!(
        "{:<8} {:>14} {:>10} {:<24} {:<26} {:>12} {:<8}\n",
        "Wallet", "Session (min)", "Progress", "Current TX", "Last result", "Next (min)", "Status"
    ));
    out.push_str(&format!("{}\n", "-".repeat(110)));

    for (index, row) in rows.iter().enumerate() {
        let status = if row.is_complete() {
            "done".green().to_string()
        } else {
            "running".cyan().to_string()
        };
        let result = colored_result(&row.last_tx_result, 26);
        out.push_str(&format!(
            "{:<8} {:>14.2} {:>10} {:<24} {} {:>12.2} {}\n",
            index + 1,
            row.session_duration_min,
            row.progress(),
            row.current_tx_type,
            result,
            row.min_until_next_tx,
            status
        ));
    }
    out
}

/// Redraw the table every `every` until all wallets are settled
pub async fn run_reporter(board: StatusBoard, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    loop {
        ticker.tick().await;

        let table = render_table(&board.snapshot(), Local::now());
        let mut stdout = std::io::stdout();
        // clear screen, cursor home
        if let Err(e) = write!(stdout, "\x1B[2J\x1B[1;1H{}", table).and_then(|_| stdout.flush()) {
            warn!("Failed to draw status table: {}", e);
        }

        if board.all_settled() {
            if !board.all_complete() {
                warn!("Some wallet sessions ended without completing");
            }
            info!("All {} wallet sessions finished", board.len());
            return;
        }
    }
}

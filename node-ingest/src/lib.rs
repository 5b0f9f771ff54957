//! External event source interfaces (spec §6).

pub mod ingest;
pub mod window;

pub use ingest::{BalanceIngester, MessageIngester, ReplayBalanceIngester, ReplayMessageIngester};
pub use window::{SeenWindow, DEFAULT_SEEN_WINDOW_CAPACITY};

pub mod domain;
pub mod ports;
pub mod usage;

pub use domain::{
    Account, AccountCredentials, HistoryEntry, HistoryKind, HistoryStats, UsageWindow,
    DEFAULT_DAILY_LIMIT,
};
pub use ports::{
    CompletionService, DatabaseService, HistoryFilter, HistoryPage, PortError, PortResult,
};

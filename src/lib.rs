pub mod config;
pub mod safe_browsing;
pub mod scanner;

pub use config::{Category, Config};
pub use safe_browsing::{
    CheckError, CheckResult, MockOutcome, MockService, SafeBrowsingChecker, Verdict,
};
pub use scanner::{BatchScanner, ScanSummary};

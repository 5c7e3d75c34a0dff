use crate::safe_browsing::{CheckResult, SafeBrowsingChecker, Verdict};
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Per-batch tallies for summary lines.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ScanSummary {
    pub safe: usize,
    pub flagged: usize,
    pub errors: usize,
}

impl ScanSummary {
    pub fn tally(results: &[CheckResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match &result.verdict {
                Verdict::Safe => summary.safe += 1,
                Verdict::Unsafe { .. } => summary.flagged += 1,
                Verdict::Error(_) => summary.errors += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.safe + self.flagged + self.errors
    }
}

/// Runs one batch at a time on a background task. The worker reports once,
/// with the complete result list; there is no per-URL progress channel and
/// no way to cancel a batch once started.
pub struct BatchScanner {
    checker: Arc<SafeBrowsingChecker>,
    pending: Option<oneshot::Receiver<Vec<CheckResult>>>,
}

impl BatchScanner {
    pub fn new(checker: SafeBrowsingChecker) -> Self {
        Self {
            checker: Arc::new(checker),
            pending: None,
        }
    }

    /// A batch counts as in flight from `start` until its results are
    /// collected with `wait` or `try_take_results`.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Spawn a worker for the batch. Refuses to start while a previous
    /// batch's results are still outstanding.
    pub fn start(&mut self, urls: Vec<String>) -> anyhow::Result<()> {
        if self.is_busy() {
            anyhow::bail!("a scan is already running");
        }

        log::info!("Starting scan of {} URLs", urls.len());
        let (tx, rx) = oneshot::channel();
        let checker = Arc::clone(&self.checker);
        tokio::spawn(async move {
            let results = checker.check_urls(&urls).await;
            if tx.send(results).is_err() {
                log::warn!("Scan finished but nobody was waiting for the results");
            }
        });

        self.pending = Some(rx);
        Ok(())
    }

    /// Block until the in-flight batch reports, then hand over its results.
    pub async fn wait(&mut self) -> anyhow::Result<Vec<CheckResult>> {
        let rx = self.pending.take().context("no scan is running")?;
        let results = rx
            .await
            .context("scan worker exited without reporting results")?;
        log::info!("Scan finished with {} results", results.len());
        Ok(results)
    }

    /// Non-blocking poll. `None` while the worker is still checking or when
    /// no scan is running.
    pub fn try_take_results(&mut self) -> Option<Vec<CheckResult>> {
        let rx = self.pending.as_mut()?;
        match rx.try_recv() {
            Ok(results) => {
                self.pending = None;
                Some(results)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                log::warn!("Scan worker exited without reporting results");
                self.pending = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe_browsing::{CheckError, MockOutcome, MockService};
    use std::time::Duration;

    fn mock_scanner() -> (Arc<MockService>, BatchScanner) {
        let mock = Arc::new(
            MockService::new()
                .respond_with("https://ok.example.com", MockOutcome::NoMatches)
                .respond_with(
                    "https://bad.example.com",
                    MockOutcome::Matches(vec!["MALWARE".to_string()]),
                )
                .refuse_resolution("gone.invalid"),
        );
        let scanner = BatchScanner::new(SafeBrowsingChecker::with_mock(mock.clone()));
        (mock, scanner)
    }

    fn demo_batch() -> Vec<String> {
        vec![
            "https://ok.example.com".to_string(),
            "https://gone.invalid".to_string(),
            "https://bad.example.com".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_scan_reports_once_with_all_results() {
        let (_, mut scanner) = mock_scanner();
        let urls = demo_batch();

        scanner.start(urls.clone()).unwrap();
        let results = scanner.wait().await.unwrap();

        assert_eq!(results.len(), urls.len());
        for (result, url) in results.iter().zip(&urls) {
            assert_eq!(&result.url, url);
        }
        assert_eq!(results[0].verdict, Verdict::Safe);
        assert_eq!(
            results[1].verdict,
            Verdict::Error(CheckError::DomainInvalid)
        );
        assert_eq!(
            results[2].verdict,
            Verdict::Unsafe {
                threats: vec!["MALWARE".to_string()]
            }
        );

        // Delivery is one-shot
        assert!(!scanner.is_busy());
        assert!(scanner.try_take_results().is_none());
        assert!(scanner.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_second_start_is_refused_while_busy() {
        let (_, mut scanner) = mock_scanner();

        scanner.start(demo_batch()).unwrap();
        assert!(scanner.is_busy());
        assert!(scanner.start(vec!["https://ok.example.com".to_string()]).is_err());

        let _ = scanner.wait().await.unwrap();
        assert!(!scanner.is_busy());
        scanner.start(demo_batch()).unwrap();
        let _ = scanner.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_polling_eventually_yields_results() {
        let (_, mut scanner) = mock_scanner();
        assert!(scanner.try_take_results().is_none());

        scanner.start(demo_batch()).unwrap();

        let mut results = None;
        for _ in 0..100 {
            if let Some(r) = scanner.try_take_results() {
                results = Some(r);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let results = results.expect("scan never reported");
        assert_eq!(results.len(), 3);
        assert!(!scanner.is_busy());
    }

    #[tokio::test]
    async fn test_summary_tallies_verdicts() {
        let (_, mut scanner) = mock_scanner();

        scanner.start(demo_batch()).unwrap();
        let results = scanner.wait().await.unwrap();
        let summary = ScanSummary::tally(&results);

        assert_eq!(summary.safe, 1);
        assert_eq!(summary.flagged, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total(), 3);
    }
}

use std::sync::Arc;
use url_audit::safe_browsing::{MockService, SafeBrowsingChecker};
use url_audit::scanner::{BatchScanner, ScanSummary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Testing mock scan functionality...");

    let checker = SafeBrowsingChecker::with_mock(Arc::new(MockService::demo()));

    println!("\n=== Test Case 1: clean URL, scheme added ===");
    let result = checker.check_url("example.com").await;
    println!("URL: {}", result.url);
    println!("Verdict: {:?}", result.verdict);

    println!("\n=== Test Case 2: malware test page ===");
    let result = checker
        .check_url("http://testsafebrowsing.appspot.com/s/malware.html")
        .await;
    println!("Verdict: {:?}", result.verdict);
    println!("Threats: {:?}", result.verdict.threats());

    println!("\n=== Test Case 3: unresolvable host ===");
    let result = checker
        .check_url("https://this-domain-does-not-exist.invalid")
        .await;
    println!("Verdict: {:?}", result.verdict);

    println!("\n=== Test Case 4: batch through the scanner ===");
    let urls = vec![
        "http://testsafebrowsing.appspot.com/s/malware.html".to_string(),
        "http://testsafebrowsing.appspot.com/s/phishing.html".to_string(),
        "https://this-domain-does-not-exist.invalid".to_string(),
        "https://example.com".to_string(),
    ];
    let mut scanner = BatchScanner::new(checker);
    scanner.start(urls)?;
    println!("Scanner busy: {}", scanner.is_busy());
    let results = scanner.wait().await?;
    for result in &results {
        println!("  {} -> {:?}", result.url, result.verdict);
    }
    let summary = ScanSummary::tally(&results);
    println!(
        "Summary: {} safe, {} flagged, {} errors",
        summary.safe, summary.flagged, summary.errors
    );

    println!("\n=== Mock Scan Testing Complete ===");
    Ok(())
}

use hickory_resolver::TokioAsyncResolver;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const THREAT_MATCHES_ENDPOINT: &str =
    "https://safebrowsing.googleapis.com/v4/threatMatches:find";

/// Fixed socket timeout applied to the DNS pre-flight and to each API request.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Threat categories declared in every lookup request. Response labels are
/// passed through verbatim and are not validated against this list.
pub const THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckError {
    /// The host failed DNS resolution; no API request was made.
    #[error("Domain tidak valid atau tidak dapat diakses")]
    DomainInvalid,
    /// The API request failed: connection error, timeout, non-2xx status,
    /// or a response body that would not parse.
    #[error("Error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Safe,
    Unsafe { threats: Vec<String> },
    Error(CheckError),
}

impl Verdict {
    /// Threat labels for a flagged URL, in response order with duplicates
    /// preserved. Empty for `Safe` and `Error`.
    pub fn threats(&self) -> &[String] {
        match self {
            Verdict::Unsafe { threats } => threats,
            _ => &[],
        }
    }
}

/// Outcome of checking one URL. `url` is the normalized form that was
/// actually checked.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub url: String,
    pub verdict: Verdict,
}

/// Trim the input and prepend `https://` when no scheme prefix is present.
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|h| h.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatchRequest {
    client: ClientInfo,
    threat_info: ThreatInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo {
    client_id: &'static str,
    client_version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo {
    threat_types: Vec<&'static str>,
    platform_types: Vec<&'static str>,
    threat_entry_types: Vec<&'static str>,
    threat_entries: Vec<ThreatEntry>,
}

#[derive(Debug, Serialize)]
struct ThreatEntry {
    url: String,
}

impl ThreatMatchRequest {
    fn for_url(url: &str) -> Self {
        Self {
            client: ClientInfo {
                client_id: env!("CARGO_PKG_NAME"),
                client_version: env!("CARGO_PKG_VERSION"),
            },
            threat_info: ThreatInfo {
                threat_types: THREAT_TYPES.to_vec(),
                platform_types: vec!["ANY_PLATFORM"],
                threat_entry_types: vec!["URL"],
                threat_entries: vec![ThreatEntry {
                    url: url.to_string(),
                }],
            },
        }
    }

    fn entry_url(&self) -> &str {
        &self.threat_info.threat_entries[0].url
    }
}

// An empty body `{}` deserializes to an empty match list.
#[derive(Debug, Default, Deserialize)]
struct ThreatMatchResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    threat_type: String,
}

/// Canned stand-in for DNS and the threat-matching API, used by tests and
/// demo mode. Counts requests and records the last URL put on the wire so
/// callers can verify the fail-fast short-circuit and scheme normalization.
#[derive(Debug, Default)]
pub struct MockService {
    outcomes: HashMap<String, MockOutcome>,
    unresolvable: HashSet<String>,
    requests: AtomicUsize,
    last_entry_url: Mutex<Option<String>>,
}

#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// 2xx with no matches.
    NoMatches,
    /// 2xx flagging the URL with these threat labels.
    Matches(Vec<String>),
    /// Non-2xx HTTP status.
    Status(u16),
    /// Request never completes within the timeout.
    Timeout,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory of Google's Safe Browsing test pages, for demo runs that
    /// need no network or API key.
    pub fn demo() -> Self {
        Self::new()
            .respond_with(
                "http://testsafebrowsing.appspot.com/s/malware.html",
                MockOutcome::Matches(vec!["MALWARE".to_string()]),
            )
            .respond_with(
                "http://testsafebrowsing.appspot.com/s/phishing.html",
                MockOutcome::Matches(vec!["SOCIAL_ENGINEERING".to_string()]),
            )
            .respond_with(
                "http://testsafebrowsing.appspot.com/s/unwanted.html",
                MockOutcome::Matches(vec!["UNWANTED_SOFTWARE".to_string()]),
            )
            .refuse_resolution("this-domain-does-not-exist.invalid")
    }

    pub fn respond_with(mut self, url: &str, outcome: MockOutcome) -> Self {
        self.outcomes.insert(url.to_string(), outcome);
        self
    }

    pub fn refuse_resolution(mut self, host: &str) -> Self {
        self.unresolvable.insert(host.to_string());
        self
    }

    /// Number of API requests the mock has served. DNS pre-flight failures
    /// never reach the mock, so this doubles as the outbound-call counter.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// The `threatEntries[0].url` value of the most recent request.
    pub fn last_entry_url(&self) -> Option<String> {
        self.last_entry_url.lock().unwrap().clone()
    }

    fn resolves(&self, host: &str) -> bool {
        !self.unresolvable.contains(host)
    }

    fn observe(&self, request: &ThreatMatchRequest) -> anyhow::Result<Vec<String>> {
        let url = request.entry_url();
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_entry_url.lock().unwrap() = Some(url.to_string());

        log::debug!("Mock response for {url}");
        match self.outcomes.get(url) {
            None | Some(MockOutcome::NoMatches) => Ok(Vec::new()),
            Some(MockOutcome::Matches(threats)) => Ok(threats.clone()),
            Some(MockOutcome::Status(code)) => {
                Err(anyhow::anyhow!("HTTP status {code} for url ({url})"))
            }
            Some(MockOutcome::Timeout) => Err(anyhow::anyhow!(
                "operation timed out after {REQUEST_TIMEOUT_SECONDS}s"
            )),
        }
    }
}

/// Client for the Safe Browsing v4 `threatMatches:find` endpoint. Stateless
/// beyond its HTTP client: one DNS resolution and at most one API request
/// per checked URL, nothing cached, nothing retried.
pub struct SafeBrowsingChecker {
    endpoint: String,
    http: Client,
    mock: Option<Arc<MockService>>,
}

impl SafeBrowsingChecker {
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .user_agent(format!("url-audit/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint: format!("{THREAT_MATCHES_ENDPOINT}?key={api_key}"),
            http,
            mock: None,
        })
    }

    /// Checker that answers from the mock directory instead of performing
    /// real DNS lookups or API requests.
    pub fn with_mock(mock: Arc<MockService>) -> Self {
        Self {
            endpoint: String::new(),
            http: Client::new(),
            mock: Some(mock),
        }
    }

    /// Classify one URL. Never fails: DNS and transport problems come back
    /// as an `Error` verdict carrying the message to show the user.
    pub async fn check_url(&self, url: &str) -> CheckResult {
        let url = normalize_url(url);
        log::debug!("Checking URL: {url}");

        let host = match host_of(&url) {
            Some(host) => host,
            None => {
                log::debug!("No usable host in {url}");
                return CheckResult {
                    url,
                    verdict: Verdict::Error(CheckError::DomainInvalid),
                };
            }
        };

        if !self.domain_resolves(&host).await {
            return CheckResult {
                url,
                verdict: Verdict::Error(CheckError::DomainInvalid),
            };
        }

        let verdict = match self.query_threat_matches(&url).await {
            Ok(threats) if threats.is_empty() => Verdict::Safe,
            Ok(threats) => {
                log::info!("Threats found for {url}: {}", threats.join(", "));
                Verdict::Unsafe { threats }
            }
            Err(e) => {
                log::debug!("Lookup failed for {url}: {e}");
                Verdict::Error(CheckError::Transport(e.to_string()))
            }
        };

        CheckResult { url, verdict }
    }

    /// Check a batch strictly in order, one result per input URL. A failure
    /// for one URL never aborts the rest of the batch.
    pub async fn check_urls(&self, urls: &[String]) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(urls.len());
        for (idx, url) in urls.iter().enumerate() {
            log::info!("Checking {}/{}: {url}", idx + 1, urls.len());
            results.push(self.check_url(url).await);
        }
        results
    }

    async fn domain_resolves(&self, host: &str) -> bool {
        if let Some(mock) = &self.mock {
            return mock.resolves(host);
        }

        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                log::warn!("Failed to create DNS resolver for {host}: {e}");
                return false;
            }
        };

        let lookup = resolver.lookup_ip(host);
        match tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS), lookup).await {
            Ok(Ok(response)) => {
                let found = response.iter().next().is_some();
                if !found {
                    log::debug!("DNS lookup returned no IPs for {host}");
                }
                found
            }
            Ok(Err(e)) => {
                log::debug!("DNS lookup failed for {host}: {e}");
                false
            }
            Err(_) => {
                log::debug!("DNS lookup timed out for {host} after {REQUEST_TIMEOUT_SECONDS}s");
                false
            }
        }
    }

    async fn query_threat_matches(&self, url: &str) -> anyhow::Result<Vec<String>> {
        let payload = ThreatMatchRequest::for_url(url);

        if let Some(mock) = &self.mock {
            return mock.observe(&payload);
        }

        log::debug!("POST threatMatches:find for {url}");
        let response = self.http.post(&self.endpoint).json(&payload).send().await?;
        let body: ThreatMatchResponse = response.error_for_status()?.json().await?;

        Ok(body.matches.into_iter().map(|m| m.threat_type).collect())
    }
}

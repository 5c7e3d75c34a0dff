use clap::{Arg, Command};
use log::LevelFilter;
use std::process;
use std::sync::Arc;
use url_audit::config::Config;
use url_audit::safe_browsing::{CheckResult, MockService, SafeBrowsingChecker, Verdict};
use url_audit::scanner::{BatchScanner, ScanSummary};

#[tokio::main]
async fn main() {
    let matches = Command::new("url-audit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Checks URLs against the Google Safe Browsing v4 API")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("url-audit.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-categories")
                .long("list-categories")
                .help("List configured URL categories and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .value_name("NAME")
                .help("Scan all URLs in the named category")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Check a single URL")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .value_name("KEY")
                .help("Safe Browsing API key (overrides the configuration file)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Answer from a built-in directory of test pages, no network or API key needed")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logger based on verbose flag
    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if let Some(key) = matches.get_one::<String>("api-key") {
        config.api_key = key.clone();
    }

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        println!();
        println!("Number of categories: {}", config.categories.len());
        for (i, category) in config.categories.iter().enumerate() {
            println!(
                "  Category {}: {} ({} URLs)",
                i + 1,
                category.name,
                category.urls.len()
            );
        }
        if config.api_key.is_empty() {
            println!("⚠️  No API key configured; scans need api_key or --api-key");
        }
        println!("✅ Configuration is valid");
        return;
    }

    if matches.get_flag("list-categories") {
        for category in &config.categories {
            println!("{} ({} URLs)", category.name, category.urls.len());
            for url in &category.urls {
                println!("  {url}");
            }
        }
        return;
    }

    let demo_mode = matches.get_flag("demo");

    let checker = if demo_mode {
        log::info!("Demo mode: answering from the built-in mock directory");
        SafeBrowsingChecker::with_mock(Arc::new(MockService::demo()))
    } else {
        if config.api_key.is_empty() {
            eprintln!("❌ No API key configured. Set api_key in {config_path} or pass --api-key.");
            process::exit(1);
        }
        match SafeBrowsingChecker::new(&config.api_key) {
            Ok(checker) => checker,
            Err(e) => {
                eprintln!("❌ Failed to create checker: {e}");
                process::exit(1);
            }
        }
    };

    if let Some(url) = matches.get_one::<String>("url") {
        if url.trim().is_empty() {
            eprintln!("❌ URL must not be empty");
            process::exit(1);
        }
        let result = checker.check_url(url).await;
        print_result(&result);
        return;
    }

    // Demo mode without an explicit selection scans the dangerous list
    let category_name = match matches.get_one::<String>("category") {
        Some(name) => name.clone(),
        None if demo_mode => "dangerous".to_string(),
        None => {
            eprintln!("Nothing to do. Pass --url, --category, or --demo.");
            process::exit(2);
        }
    };

    let category = match config.category(&category_name) {
        Some(category) => category.clone(),
        None => {
            eprintln!(
                "❌ Unknown category: {category_name}. Available: {}",
                config.category_names().join(", ")
            );
            process::exit(1);
        }
    };

    println!("🔍 Scanning category: {}", category.name);
    println!("═══════════════════════════════════════");

    let mut scanner = BatchScanner::new(checker);
    if let Err(e) = scanner.start(category.urls) {
        eprintln!("❌ Failed to start scan: {e}");
        process::exit(1);
    }
    let results = match scanner.wait().await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("❌ Scan failed: {e}");
            process::exit(1);
        }
    };

    for result in &results {
        print_result(result);
    }
    print_summary(&results);
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn print_result(result: &CheckResult) {
    match &result.verdict {
        Verdict::Safe => println!("✅ Safe     {}", result.url),
        Verdict::Unsafe { threats } => {
            println!("⚠️  Flagged  {}", result.url);
            for threat in threats {
                println!("              - {threat}");
            }
        }
        Verdict::Error(e) => println!("❌ Error    {} ({e})", result.url),
    }
}

fn print_summary(results: &[CheckResult]) {
    let summary = ScanSummary::tally(results);
    println!();
    println!("📊 Scan summary");
    println!("═══════════════════════════════════════");
    println!("  Total URLs: {}", summary.total());
    println!("  ├─ Safe:    {}", summary.safe);
    println!("  ├─ Flagged: {}", summary.flagged);
    println!("  └─ Errors:  {}", summary.errors);
}

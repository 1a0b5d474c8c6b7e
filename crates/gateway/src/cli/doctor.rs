//! `threadline doctor`: preflight checks for a deployment.

use std::path::Path;
use std::time::Duration;

use tl_domain::config::{Config, ConfigSeverity};
use tl_providers::util::resolve_api_key;

/// Outcome of one check.
struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
    /// Extra lines printed under the check.
    notes: Vec<String>,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
            notes: Vec::new(),
        }
    }
}

/// Run every check, print a report and return whether all passed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    let checks = vec![
        config_file(config_path),
        config_issues(config),
        api_key(config),
        store(config),
        provider(config).await,
    ];

    println!("threadline doctor\n");
    for check in &checks {
        print_check(check);
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    println!();
    if failed == 0 {
        println!("All {} checks passed.", checks.len());
    } else {
        println!("{failed} of {} checks failed.", checks.len());
    }
    Ok(failed == 0)
}

fn config_file(config_path: &str) -> Check {
    if Path::new(config_path).is_file() {
        Check::new("Config file", true, config_path)
    } else {
        Check::new(
            "Config file",
            false,
            format!("{config_path} missing, built-in defaults in use"),
        )
    }
}

fn config_issues(config: &Config) -> Check {
    let issues = config.validate();
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    let detail = match (issues.len(), errors) {
        (0, _) => "clean".to_owned(),
        (n, 0) => format!("{n} warning(s)"),
        (n, e) => format!("{e} error(s), {} warning(s)", n - e),
    };
    let mut check = Check::new("Config validation", errors == 0, detail);
    check.notes = issues.iter().map(ToString::to_string).collect();
    check
}

fn api_key(config: &Config) -> Check {
    match resolve_api_key(&config.provider.auth) {
        Ok(_) => Check::new("Provider API key", true, "found"),
        Err(e) => Check::new("Provider API key", false, e.to_string()),
    }
}

fn store(config: &Config) -> Check {
    if config.store.in_memory {
        return Check::new("User store", true, "in-memory, records are not persisted");
    }
    let dir = &config.store.path;
    let passed = store_dir_writable(dir);
    let state = if passed { "writable" } else { "NOT writable" };
    Check::new("User store", passed, format!("{} is {state}", dir.display()))
}

/// Create `dir` if needed and prove a file can be written into it.
fn store_dir_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".threadline_doctor_probe");
    let written = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    written
}

async fn provider(config: &Config) -> Check {
    let base = config.provider.base_url.trim_end_matches('/');
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(e) => return Check::new("Provider reachable", false, e.to_string()),
    };

    // Any HTTP answer (even 401 without a key) proves reachability.
    match client.get(format!("{base}/models")).send().await {
        Ok(resp) => Check::new(
            "Provider reachable",
            true,
            format!("{base} answered {}", resp.status()),
        ),
        Err(e) => Check::new("Provider reachable", false, format!("{base}: {e}")),
    }
}

fn print_check(check: &Check) {
    let status = if check.passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {}: {}", check.name, check.detail);
    for note in &check.notes {
        println!("         {note}");
    }
}

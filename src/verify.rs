//! API Verification Module
//!
//! Checks a configured AirLens API to determine which endpoints are reachable
//! and returning usable data. Use this before pointing the client at a new
//! deployment.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;

use crate::config::Config;
use crate::ingest::SourceError;
use crate::ingest::airlens::{
    build_aqi_url, build_polluted_url, build_search_url, parse_list_body, parse_search_body,
};
use crate::model::Metric;

/// City looked up when checking `/search`.
pub const CHECK_CITY: &str = "London";

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub base_url: String,
    pub results: Vec<EndpointVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointVerification {
    pub endpoint: String,
    pub url: String,
    pub status: VerificationStatus,
    pub http_status: Option<u16>,
    pub records_accepted: usize,
    pub records_rejected: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    /// Reachable, but empty or with rejected records.
    PartialSuccess,
    Failed,
}

impl EndpointVerification {
    fn new(endpoint: &str, url: &Url) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            url: url.to_string(),
            status: VerificationStatus::Failed,
            http_status: None,
            records_accepted: 0,
            records_rejected: 0,
            error_message: None,
        }
    }
}

// ============================================================================
// Endpoint Checks
// ============================================================================

fn fetch(client: &Client, url: &Url) -> Result<(u16, String), String> {
    let response = client
        .get(url.clone())
        .header("Accept", "application/json")
        .send()
        .map_err(|e| format!("Request failed: {}", e))?;
    let status = response.status().as_u16();
    let body = response.text().map_err(|e| format!("Read failed: {}", e))?;
    Ok((status, body))
}

/// Grades a decoded list response.
pub fn grade_list(result: &mut EndpointVerification, status: u16, body: &str) {
    result.http_status = Some(status);
    match parse_list_body(status, body) {
        Ok(batch) => {
            result.records_accepted = batch.measurements.len();
            result.records_rejected = batch.rejected.len();
            result.status = if batch.measurements.is_empty() || !batch.rejected.is_empty() {
                VerificationStatus::PartialSuccess
            } else {
                VerificationStatus::Success
            };
        }
        Err(e) => result.error_message = Some(e.to_string()),
    }
}

/// Grades a decoded search response. A not-found answer still proves the
/// endpoint works.
pub fn grade_search(result: &mut EndpointVerification, status: u16, body: &str) {
    result.http_status = Some(status);
    match parse_search_body(status, body) {
        Ok(_) => {
            result.records_accepted = 1;
            result.status = VerificationStatus::Success;
        }
        Err(SourceError::NotFound(message)) => {
            result.status = VerificationStatus::PartialSuccess;
            result.error_message = Some(message);
        }
        Err(SourceError::InvalidRecord(e)) => {
            result.records_rejected = 1;
            result.status = VerificationStatus::PartialSuccess;
            result.error_message = Some(e.to_string());
        }
        Err(e) => result.error_message = Some(e.to_string()),
    }
}

pub fn verify_list_endpoint(client: &Client, endpoint: &str, url: Url) -> EndpointVerification {
    let mut result = EndpointVerification::new(endpoint, &url);
    match fetch(client, &url) {
        Ok((status, body)) => grade_list(&mut result, status, &body),
        Err(e) => result.error_message = Some(e),
    }
    result
}

pub fn verify_search_endpoint(client: &Client, url: Url) -> EndpointVerification {
    let mut result = EndpointVerification::new("/search", &url);
    match fetch(client, &url) {
        Ok((status, body)) => grade_search(&mut result, status, &body),
        Err(e) => result.error_message = Some(e),
    }
    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn summarize(results: &[EndpointVerification]) -> VerificationSummary {
    let working = results
        .iter()
        .filter(|r| r.status != VerificationStatus::Failed)
        .count();
    VerificationSummary {
        total: results.len(),
        working,
        failed: results.len() - working,
    }
}

pub fn run_verification(config: &Config) -> Result<VerificationReport, Box<dyn Error>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()?;
    let base_url = config.api.base_url.trim_end_matches('/');
    let metric = config.api.default_metric;

    let checks: Vec<(&str, Url)> = vec![
        ("/aqi", build_aqi_url(base_url, metric)?),
        ("/polluted", build_polluted_url(base_url, metric, config.api.top_n)?),
    ];

    println!("🔍 Verifying AirLens API at {} ({})...", base_url, metric);
    let mut results = Vec::new();
    for (endpoint, url) in checks {
        announce_stdout(endpoint);
        let result = verify_list_endpoint(&client, endpoint, url);
        report_line(&result);
        results.push(result);
    }

    announce_stdout(&format!("/search?city={}", CHECK_CITY));
    let result = verify_search_endpoint(&client, build_search_url(base_url, CHECK_CITY, metric)?);
    report_line(&result);
    results.push(result);

    // Per-gas list, only when the default metric did not already cover it.
    if metric == Metric::Composite {
        for pollutant in crate::model::Pollutant::ALL {
            let gas = Metric::Gas(pollutant);
            let label = format!("/aqi?gas={}", pollutant.code());
            announce_stdout(&label);
            let result = verify_list_endpoint(&client, &label, build_aqi_url(base_url, gas)?);
            report_line(&result);
            results.push(result);
        }
    }

    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        base_url: base_url.to_string(),
        summary: summarize(&results),
        results,
    })
}

/// Writes the endpoint label without a newline and flushes it.
fn announce<W: Write>(out: &mut W, label: &str) -> io::Result<()> {
    write!(out, "  {} ... ", label)?;
    out.flush()
}

fn announce_stdout(label: &str) {
    let _ = announce(&mut io::stdout(), label);
}

fn report_line(result: &EndpointVerification) {
    match result.status {
        VerificationStatus::Success => println!("✓ OK ({} records)", result.records_accepted),
        VerificationStatus::PartialSuccess => println!(
            "⚠ Partial ({} accepted, {} rejected{})",
            result.records_accepted,
            result.records_rejected,
            result
                .error_message
                .as_deref()
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        ),
        VerificationStatus::Failed => println!(
            "✗ FAILED: {}",
            result.error_message.as_deref().unwrap_or("Unknown")
        ),
    }
}

pub fn print_summary(report: &VerificationReport) {
    let rule = "═".repeat(59);
    println!("\n{}", rule);
    println!("📊 VERIFICATION SUMMARY");
    println!("{}", rule);
    println!();
    println!(
        "Endpoints:    {}/{} working  ({} failed)",
        report.summary.working, report.summary.total, report.summary.failed
    );

    let success_rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Overall Success Rate: {:.1}% ({}/{})",
        success_rate, report.summary.working, report.summary.total
    );
    println!("{}", rule);
}

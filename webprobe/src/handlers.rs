use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, warn};
use url::Url;
use webprobe_core::report::{Report, extract_url_path, generate_text_summary};
use webprobe_core::{ScanOrchestrator, ScanPhase};
use webprobe_scanner::{Cancellation, Category, ScanConfig, Target};

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    None
}

/// Parse a `name=value; name2=value2` cookie string. Pairs without `=` or
/// with an empty name are skipped.
pub fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn load_cookies_from_file(path: &Path) -> Result<Vec<(String, String)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cookie file {}", path.display()))?;

    let cookies: Vec<(String, String)> = content
        .lines()
        .flat_map(parse_cookie_string)
        .collect();

    if cookies.is_empty() {
        bail!("No cookies found in {}", path.display());
    }
    Ok(cookies)
}

/// Parse a `Name: value` header argument.
pub fn parse_header_arg(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header '{}', expected 'Name: value'", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{}', name is empty", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Turn `scan` arguments into a [`ScanConfig`]. Paths get `~` expansion.
pub fn build_scan_config(args: &ArgMatches) -> Result<ScanConfig> {
    let raw_url = args
        .get_one::<String>("url")
        .context("--url is required")?;
    let target = parse_url_line(raw_url).with_context(|| format!("Invalid URL '{}'", raw_url))?;

    let mut config = ScanConfig::new(target)
        .with_threads(*args.get_one::<usize>("threads").unwrap_or(&5))
        .with_max_depth(*args.get_one::<usize>("depth").unwrap_or(&2))
        .with_timeout_secs(*args.get_one::<u64>("timeout").unwrap_or(&10));

    if let Some(agent) = args.get_one::<String>("user-agent") {
        config = config.with_user_agent(agent.clone());
    }

    if let Some(cookie_file) = args.get_one::<String>("cookies") {
        config = config.with_cookies(load_cookies_from_file(&expand_path(cookie_file))?);
    }

    if let Some(headers) = args.get_many::<String>("header") {
        let headers = headers
            .map(|h| parse_header_arg(h))
            .collect::<Result<Vec<_>>>()?;
        config = config.with_headers(headers);
    }

    Ok(config)
}

pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// First Ctrl-C cancels the scan so partial results are kept. Returns true
/// when the scan was already cancelled and the caller should exit.
pub fn handle_interrupt(cancel: &Cancellation) -> bool {
    if cancel.is_cancelled() {
        return true;
    }
    warn!("Interrupted, finishing in-flight requests (Ctrl-C again to quit)");
    cancel.cancel();
    false
}

pub async fn handle_scan(args: &ArgMatches, quiet: bool) -> Result<()> {
    init_tracing(args.get_flag("verbose"));

    let config = build_scan_config(args)?;
    let target = Target::from_config(&config)?;
    let output = args.get_one::<String>("output").map(|p| expand_path(p));

    if !quiet {
        println!("\n{} Scanning {}", "→".blue(), target.seed().as_str().bright_white());
        println!("Workers: {}", target.concurrency());
        println!("Max depth: {}", target.max_depth());
        println!("Timeout: {}s\n", target.timeout().as_secs());
    }

    let cancel = Cancellation::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle_interrupt(&signal_cancel) {
                eprintln!("{} Interrupted twice, exiting", "✗".red().bold());
                std::process::exit(130);
            }
        }
    });

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Checking target...");
        pb
    };

    let phase_spinner = spinner.clone();
    let crawl_spinner = spinner.clone();
    let probe_spinner = spinner.clone();

    let scan = ScanOrchestrator::new(target)?
        .with_cancellation(cancel.clone())
        .with_phase_callback(Arc::new(move |phase: ScanPhase| {
            let message = match phase {
                ScanPhase::Crawling => "Crawling...",
                ScanPhase::Probing => "Probing discovered URLs...",
                ScanPhase::Auditing => "Auditing security headers...",
                ScanPhase::Idle | ScanPhase::Done => return,
            };
            phase_spinner.set_message(message);
        }))
        .with_progress_callback(Arc::new(move |worker_id: usize, url: String| {
            crawl_spinner.set_message(format!("Crawling [{}] {}", worker_id, extract_url_path(&url)));
        }))
        .with_probe_progress_callback(Arc::new(move |url: String| {
            probe_spinner.set_message(format!("Probing {}", extract_url_path(&url)));
        }));

    let result = scan.run().await;
    spinner.finish_and_clear();
    let report = result?;

    print_report_summary(&report);

    if let Some(path) = output {
        report
            .write_json(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!(
            "{} Report written to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }

    Ok(())
}

pub fn handle_summary(args: &ArgMatches) -> Result<()> {
    let raw = args.get_one::<String>("FILE").context("FILE is required")?;
    let path = expand_path(raw);
    let report = Report::load_json(&path)
        .with_context(|| format!("Failed to load report {}", path.display()))?;

    if args.get_flag("plain") {
        print!("{}", generate_text_summary(&report));
    } else {
        print_report_summary(&report);
    }
    Ok(())
}

pub fn print_report_summary(report: &Report) {
    println!();
    print_divider();
    println!("{}", "  SCAN SUMMARY".bright_white().bold());
    print_divider();
    println!();

    println!("{} Target: {}", "→".blue(), report.target.bright_white());
    println!(
        "{} URLs visited: {}",
        "→".blue(),
        report.urls_visited.to_string().cyan()
    );
    println!(
        "{} Requests sent: {}",
        "→".blue(),
        report.stats.requests.to_string().cyan()
    );
    println!(
        "{} Duration: {:.2}s",
        "→".blue(),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    if report.cancelled {
        println!("{} Scan was interrupted, results are partial", "⚠".yellow().bold());
    }
    println!();

    for category in Category::ALL {
        let count = report.findings.get(category).len();
        let marker = if count > 0 {
            "✗".red().bold()
        } else {
            "✓".green().bold()
        };
        println!("{} {}: {}", marker, category.label(), count);
    }

    if report.total_findings() == 0 {
        println!();
        return;
    }

    println!();
    println!("{}", "FINDINGS".bright_blue().bold());
    for finding in report.findings.iter() {
        println!(
            "  {} [{}] {}",
            "•".yellow(),
            finding.category().as_str().red(),
            finding.url().bright_white()
        );
        if let Some(parameter) = finding.parameter() {
            println!("      parameter: {}", parameter.cyan());
        }
        if let Some(payload) = finding.payload() {
            println!("      payload:   {}", payload);
        }
        if let Some(evidence) = finding.evidence() {
            println!("      evidence:  {}", evidence);
        }
        if let Some(location) = finding.redirect_location() {
            println!("      location:  {}", location);
        }
        if !finding.missing_headers().is_empty() {
            println!("      missing:   {}", finding.missing_headers().join(", "));
        }
    }
    println!();
}

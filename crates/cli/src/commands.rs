// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use std::path::Path;
use std::time::Duration;
use stowage_config::{Config, ConfigManager, DownloadConfig, HttpConfig};
use stowage_network::{
    Client, ClientConfig, DownloadManager, DownloadOptions, DownloadReport, HttpRange,
    HttpTransport, ObjectRequest,
};
use stowage_resilience::RetryPolicy;

/// Download the object named on the command line
pub async fn get(config: &Config, matches: &ArgMatches) -> Result<()> {
    let url = matches
        .get_one::<String>("url")
        .context("URL is required")?;

    let request = build_request(
        url,
        matches.get_one::<String>("range").map(String::as_str),
        matches.get_one::<String>("if-match").map(String::as_str),
    )?;

    let mut options = download_options(&config.download);
    if matches.get_flag("no-resume") {
        options = options.with_resumable(false);
    }
    if let Some(max) = matches.get_one::<u32>("max-continuations") {
        options = options.with_max_continuations(Some(*max));
    }

    let client = Client::with_config(client_config(&config.http))
        .context("Failed to create HTTP client")?;
    let manager = DownloadManager::with_options(client, options);

    let output = matches.get_one::<String>("output").map(Path::new);
    let report = fetch(&manager, request, output).await?;

    eprintln!(
        "{} {} in {:.1}s ({} continuation{})",
        style("Downloaded").green().bold(),
        format_size(report.bytes_read),
        report.duration().num_milliseconds() as f64 / 1000.0,
        report.continuations,
        if report.continuations == 1 { "" } else { "s" },
    );

    if matches.get_flag("report") {
        let json = report.to_json()?;
        // stdout carries the body when no output file was given
        if output.is_some() {
            println!("{}", json);
        } else {
            eprintln!("{}", json);
        }
    }

    Ok(())
}

/// Writes the body of `request` to `output`, or to stdout
pub async fn fetch<T: HttpTransport>(
    manager: &DownloadManager<T>,
    request: ObjectRequest,
    output: Option<&Path>,
) -> Result<DownloadReport> {
    let url = request.url().to_string();

    match output {
        Some(path) => manager
            .download_file(request, path)
            .await
            .with_context(|| format!("Failed to download {} to {}", url, path.display())),
        None => {
            let mut body = manager
                .open(request)
                .await
                .with_context(|| format!("Failed to open {}", url))?;
            let mut stdout = tokio::io::stdout();
            body.copy_to(&mut stdout)
                .await
                .with_context(|| format!("Failed to download {}", url))?;
            Ok(body.close())
        }
    }
}

/// Builds a GET for `url`, optionally restricted to `range` (`START-END`)
/// and pinned to `if_match`
pub fn build_request(url: &str, range: Option<&str>, if_match: Option<&str>) -> Result<ObjectRequest> {
    let mut request = ObjectRequest::get(url).with_context(|| format!("Invalid URL: {}", url))?;

    if let Some(range) = range {
        let parsed = HttpRange::parse_request(&format!("bytes={}", range))
            .with_context(|| format!("Invalid range '{}', expected START-END", range))?;
        request = request.with_header(reqwest::header::RANGE, &parsed.render())?;
    }

    if let Some(etag) = if_match {
        if etag.trim().is_empty() || etag.trim() == "*" {
            bail!("--if-match needs a concrete ETag");
        }
        request = request.with_header(reqwest::header::IF_MATCH, etag)?;
    }

    Ok(request)
}

pub fn client_config(http: &HttpConfig) -> ClientConfig {
    let defaults = ClientConfig::default();
    ClientConfig {
        timeout: (http.timeout_secs > 0).then(|| Duration::from_secs(http.timeout_secs)),
        connect_timeout: Duration::from_secs(http.connect_timeout_secs),
        user_agent: if http.user_agent.is_empty() {
            defaults.user_agent
        } else {
            http.user_agent.clone()
        },
        max_redirects: http.max_redirects,
        retry_policy: Some(
            RetryPolicy::new(http.retry_attempts)
                .with_initial_delay(Duration::from_millis(http.retry_initial_delay_ms)),
        ),
    }
}

pub fn download_options(download: &DownloadConfig) -> DownloadOptions {
    DownloadOptions::default()
        .with_resumable(download.resumable)
        .with_max_continuations(download.max_continuations)
        .with_buffer_size(download.buffer_size)
}

pub fn config_init(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write default configuration")?;

    if created {
        println!(
            "{} {}",
            style("Created").green().bold(),
            manager.config_path().display()
        );
    } else {
        println!(
            "{} {}",
            style("Already exists:").yellow(),
            manager.config_path().display()
        );
    }
    Ok(())
}

pub fn config_show(manager: &ConfigManager) -> Result<()> {
    let config = manager
        .load_with_env_overrides()
        .context("Failed to load configuration")?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

pub fn config_validate(manager: &ConfigManager) -> Result<()> {
    let problems = manager.validate().context("Failed to load configuration")?;

    if problems.is_empty() {
        println!("{} {}", style("Valid:").green().bold(), manager.config_path().display());
        return Ok(());
    }

    println!("{} {}", style("Invalid:").red().bold(), manager.config_path().display());
    for problem in &problems {
        println!("  - {}", problem);
    }
    bail!("{} problem(s) found", problems.len())
}

pub fn config_set(manager: &ConfigManager, matches: &ArgMatches) -> Result<()> {
    let key = matches.get_one::<String>("key").context("Key is required")?;
    let value = matches.get_one::<String>("value").context("Value is required")?;

    manager
        .set(key, value)
        .with_context(|| format!("Failed to set {}", key))?;
    println!("{} {} = {}", style("Set").green().bold(), key, value);
    Ok(())
}

pub fn config_reset(manager: &ConfigManager) -> Result<()> {
    manager.reset().context("Failed to reset configuration")?;
    println!(
        "{} {} (previous file kept as .bak)",
        style("Reset").green().bold(),
        manager.config_path().display()
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

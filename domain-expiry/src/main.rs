//! Domain Expiration Check
//!
//! A monitoring plugin reporting the number of days until a domain name
//! expires, read from RDAP. Output and exit codes follow the Nagios plugin
//! conventions so the binary can be dropped into Nagios, Icinga or any
//! compatible scheduler.

mod report;
mod threshold;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Parser};
use domain_expiry_lib::config::parse_duration;
use domain_expiry_lib::{
    load_env_config, ConfigManager, ExpirationResolver, ExpiryError, FileConfig, ResolverConfig,
};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

use report::JsonOutput;
use threshold::{Status, Thresholds};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const DEFAULT_WARNING_DAYS: i64 = 30;
const DEFAULT_CRITICAL_DAYS: i64 = 15;

/// File receiving DEBUG logs when `-d` is given.
const DEBUG_LOG_NAME: &str = "nagios-check_domain_expiration_rdap.log";

/// CLI arguments for check_domain_expiration
#[derive(Parser, Debug)]
#[command(name = "check_domain_expiration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Check the number of days until a domain expires, using RDAP")]
#[command(
    long_about = "Check the number of days until a domain expires, using RDAP.\n\nThe RDAP server is found through the IANA bootstrap registry. When the registry does not publish the expiration date, the registrar's own RDAP server is asked."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain name to check (Unicode names are accepted)
    #[arg(value_name = "DOMAIN")]
    pub domain: String,

    /// Warning when the domain expires within this many days [default: 30]
    #[arg(
        short = 'w',
        long = "warning",
        value_name = "DAYS",
        allow_negative_numbers = true,
        help_heading = "Thresholds"
    )]
    pub warning: Option<i64>,

    /// Critical when the domain expires within this many days [default: 15]
    #[arg(
        short = 'c',
        long = "critical",
        value_name = "DAYS",
        allow_negative_numbers = true,
        help_heading = "Thresholds"
    )]
    pub critical: Option<i64>,

    /// Output the result in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Be more verbose (repeat for more)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, help_heading = "Output Format")]
    pub verbose: u8,

    /// Request timeout, e.g. "30s" or "2m" [default: 120s]
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Configuration")]
    pub timeout: Option<String>,

    /// Directory caching the IANA registries
    #[arg(long = "cache-dir", value_name = "DIR", help_heading = "Configuration")]
    pub cache_dir: Option<PathBuf>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Debug logging to <tmp>/nagios-check_domain_expiration_rdap.log
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

/// Everything a run needs, after all configuration layers are merged.
#[derive(Debug)]
struct Settings {
    resolver: ResolverConfig,
    thresholds: Thresholds,
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Usage errors are UNKNOWN, not clap's default of 2 (CRITICAL)
            process::exit(if e.use_stderr() {
                Status::Unknown.exit_code()
            } else {
                Status::Ok.exit_code()
            });
        }
    };

    if let Err(e) = init_logging(args.verbose, args.debug) {
        println!(
            "{}",
            report::unknown_line(&format!("Cannot open debug log: {}", e))
        );
        process::exit(Status::Unknown.exit_code());
    }

    let status = run_check(&args).await;
    process::exit(status.exit_code());
}

/// Install the tracing subscriber.
///
/// stderr gets WARN by default, INFO with `-v` and DEBUG with `-vv`;
/// `RUST_LOG` overrides it. `-d` adds a DEBUG-level file log.
fn init_logging(verbose: u8, debug: bool) -> std::io::Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "domain_expiry_lib={0},check_domain_expiration={0}",
            level
        ))
    });
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let file_layer = if debug {
        let path = std::env::temp_dir().join(DEBUG_LOG_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(EnvFilter::new(
                    "domain_expiry_lib=debug,check_domain_expiration=debug",
                )),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Resolve the domain and print the plugin output.
async fn run_check(args: &Args) -> Status {
    let settings = match build_settings(args) {
        Ok(settings) => settings,
        Err(e) => {
            print_failure(args, &e, None);
            return Status::Unknown;
        }
    };
    let thresholds = settings.thresholds;
    debug!(
        "Thresholds: warning {} critical {}",
        thresholds.warning, thresholds.critical
    );

    let resolver = match ExpirationResolver::with_config(settings.resolver) {
        Ok(resolver) => resolver,
        Err(e) => {
            print_failure(args, &e, Some(&thresholds));
            return Status::Unknown;
        }
    };

    info!("Checking expiration of {}", args.domain);
    match resolver.resolve(&args.domain).await {
        Ok(expiration) => {
            let status = thresholds.evaluate(expiration.days);
            info!(
                "{} expires on {} ({} days, {})",
                expiration.ascii_domain, expiration.expiration_date, expiration.days, status
            );

            if args.json {
                print_json(&JsonOutput::success(status, &expiration, &thresholds));
            } else {
                println!(
                    "{}",
                    report::status_line(status, expiration.days, &thresholds)
                );
                if args.verbose > 0 {
                    for line in report::long_output(&expiration) {
                        println!("{}", line);
                    }
                }
            }
            status
        }
        Err(e) => {
            print_failure(args, &e, Some(&thresholds));
            Status::Unknown
        }
    }
}

fn print_failure(args: &Args, error: &ExpiryError, thresholds: Option<&Thresholds>) {
    if let Some(body) = error.raw_body() {
        debug!("Raw RDAP response: {}", body);
    }

    if args.json {
        print_json(&JsonOutput::failure(error, thresholds));
    } else {
        println!("{}", report::unknown_line(&error.to_string()));
        if args.verbose > 0 {
            if let Some(body) = error.raw_body() {
                println!("{}", body);
            }
        }
    }
}

fn print_json(output: &JsonOutput<'_>) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(
            "{}",
            report::unknown_line(&format!("Cannot serialize result: {}", e))
        ),
    }
}

/// Build the run settings with proper precedence.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (DE_*)
/// 3. Explicit `--config` file, or discovered config files
/// 4. Built-in defaults
fn build_settings(args: &Args) -> Result<Settings, ExpiryError> {
    let config_manager = ConfigManager::new();

    // Step 1: config files
    let file_config = match &args.config {
        Some(path) => {
            debug!("Using explicit config file: {}", path);
            config_manager.load_file(path)?
        }
        None => config_manager.discover_and_load()?,
    };
    let mut resolver = file_config.apply_to(ResolverConfig::default())?;

    // Step 2: environment
    let env_config = load_env_config();
    resolver = env_config.apply_to(resolver)?;

    // Step 3: CLI arguments
    if let Some(timeout) = &args.timeout {
        resolver.timeout = parse_duration(timeout)?;
    }
    if let Some(dir) = &args.cache_dir {
        resolver.cache_dir = dir.clone();
    }
    if args.debug {
        resolver.debug = true;
    }

    let (file_warning, file_critical) = file_thresholds(&file_config);
    let warning = args
        .warning
        .or(env_config.warning)
        .or(file_warning)
        .unwrap_or(DEFAULT_WARNING_DAYS);
    let critical = args
        .critical
        .or(env_config.critical)
        .or(file_critical)
        .unwrap_or(DEFAULT_CRITICAL_DAYS);
    let thresholds = Thresholds::from_days(warning, critical).map_err(ExpiryError::config)?;

    Ok(Settings {
        resolver,
        thresholds,
    })
}

fn file_thresholds(file_config: &FileConfig) -> (Option<i64>, Option<i64>) {
    file_config
        .defaults
        .as_ref()
        .map(|d| (d.warning, d.critical))
        .unwrap_or((None, None))
}

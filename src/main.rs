use anyhow::{Context, Result};
use clap::Parser;
use ppewatch::{
    create_detector, AlertDispatcher, MessagingCredentials, PpeConfig, PpeOrchestrator,
    SitesConfig, TwilioNotifier,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ppewatch")]
#[command(about = "Real-time PPE compliance monitor with SMS and WhatsApp alerts")]
#[command(version)]
#[command(long_about = "Reads frames from a camera, runs them through an object detection \
model, checks detected items against the safety equipment required on the active site and \
alerts site administrators over SMS and WhatsApp when items are missing. A web dashboard \
shows the annotated live feed, compliance status and recent alerts.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ppewatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Override the sites file from the configuration
    #[arg(short, long, value_name = "FILE", help = "Path to the YAML or TOML sites file")]
    sites: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and sites files and exit without starting")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - initialize components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting ppewatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = PpeConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(sites_file) = &args.sites {
        config.monitor.sites_file = sites_file.clone();
    }

    let validation = config.validate().and_then(|()| {
        let sites = SitesConfig::load_from_file(&config.monitor.sites_file)?;
        sites.validate(&config.monitor)?;
        Ok(sites)
    });

    let sites = match validation {
        Ok(sites) => sites,
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            if args.validate_config {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            return Err(e).context("invalid configuration");
        }
    };

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid ({} site(s))", sites.len());
        return Ok(());
    }

    let detector = create_detector(&config.detector).map_err(|e| {
        error!("Failed to create detector: {}", e);
        e
    })?;

    let dispatcher = build_dispatcher(&config)?;

    let mut orchestrator =
        PpeOrchestrator::new(config, sites, detector, dispatcher).map_err(|e| {
            error!("Failed to create orchestrator: {}", e);
            e
        })?;

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start system: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("ppewatch exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

/// Messaging is optional: without credentials every alert is recorded as not configured
fn build_dispatcher(config: &PpeConfig) -> Result<AlertDispatcher> {
    let Some(credentials) = MessagingCredentials::from_env() else {
        warn!(
            "{}, {} and {} are not all set; alerts will not be delivered",
            MessagingCredentials::SID_VAR,
            MessagingCredentials::TOKEN_VAR,
            MessagingCredentials::PHONE_VAR
        );
        return Ok(AlertDispatcher::unconfigured());
    };

    let sender = credentials.from_number.clone();
    let notifier = TwilioNotifier::new(
        credentials,
        &config.alert.api_base_url,
        Duration::from_millis(config.alert.request_timeout_ms),
    )
    .context("failed to create messaging client")?;

    Ok(AlertDispatcher::new(Arc::new(notifier), sender))
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ppewatch={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format, followed by a sample sites file
fn print_default_config() -> Result<()> {
    let rendered = toml::to_string_pretty(&PpeConfig::default())
        .context("failed to render default configuration")?;

    println!("# ppewatch configuration file");
    println!("# Every value can be overridden with PPEWATCH_<SECTION>__<KEY>, e.g.");
    println!("# PPEWATCH_ALERT__COOLDOWN_SECONDS=300");
    println!("# Messaging credentials come from TWILIO_SID, TWILIO_TOKEN and TWILIO_PHONE.");
    println!();
    println!("{}", rendered);
    println!("# Sample sites file (monitor.sites_file):");
    println!("#");
    for line in SAMPLE_SITES.lines() {
        println!("# {}", line);
    }
    Ok(())
}

const SAMPLE_SITES: &str = r#"regular_site:
  required_ppe: []
construction_site:
  required_ppe: [helmet, vest]
  admin_contacts:
    sms: "+15550001111"
    whatsapp: "+15550002222""#;

use std::{error::Error, process, sync::Arc};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use dzstream::{
    arl::Arl,
    config::{Config, Secrets, Settings},
    credentials::MemoryCache,
    deezer::Deezer,
    download::Downloader,
    error::ErrorKind,
    events::{JsonListener, Listener, LogListener},
    failure::RunError,
    format::Format,
    generate::generate,
    link::Link,
    service::Service,
    signal,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Links to download
    ///
    /// Deezer track, album or playlist URLs, numeric track ids or ISRC codes.
    #[arg(required = true, value_name = "LINK")]
    links: Vec<Link>,

    /// Deezer `arl` cookie
    ///
    /// Takes precedence over the secrets file.
    #[arg(short, long, env = "DEEZER_ARL", hide_env_values = true)]
    arl: Option<Arl>,

    /// Secrets file
    ///
    /// Ensure that the this file is kept secure and not shared publicly, as it
    /// contains sensitive information that can grant access to your Deezer
    /// account.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Settings file
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    settings: Option<String>,

    /// Bitrate to request
    ///
    /// One of `flac`, `320`, `128`, `misc`, `360_hq`, `360_mq`, `360_lq`, or
    /// a service format code.
    #[arg(short, long, value_name = "FORMAT")]
    bitrate: Option<Format>,

    /// Bitrate to try once if the requested one is not available
    #[arg(long, value_name = "FORMAT")]
    fallback_bitrate: Option<Format>,

    /// Try every lower bitrate if the requested one is not available
    #[arg(long, default_value_t = false)]
    feeling_lucky: bool,

    /// Search by artist and title for tracks that are not encoded
    #[arg(long, default_value_t = false)]
    fallback_search: bool,

    /// Output file
    ///
    /// [default: standard output]
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    output: Option<String>,

    /// Write progress events as JSON lines to standard error
    #[arg(long, default_value_t = false)]
    progress: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            // Quiet and verbose are mutually exclusive.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
        logger.filter_module("dzstream", level);
    }

    logger.init();
}

/// Settings from the settings file, overridden by the command line.
fn load_settings(args: &Args) -> Result<Settings, Box<dyn Error>> {
    let mut settings = match &args.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    if let Some(bitrate) = args.bitrate {
        settings.max_bitrate = bitrate;
    }
    if let Some(bitrate) = args.fallback_bitrate {
        settings.fallback_bitrate = bitrate;
    }
    settings.feeling_lucky |= args.feeling_lucky;
    settings.fallback_search |= args.fallback_search;

    Ok(settings)
}

/// Builds the configuration from the command line and the secrets file.
///
/// The secrets file is optional when the `arl` is given on the command line.
fn load_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    let secrets = match Secrets::from_file(&args.secrets_file) {
        Ok(secrets) => secrets,
        Err(e) if e.kind == ErrorKind::NotFound && args.arl.is_some() => Secrets::default(),
        Err(e) => {
            if e.kind == ErrorKind::NotFound {
                info!(
                    "read the documentation on how to set your ARL in {}",
                    args.secrets_file
                );
            }
            return Err(e.into());
        }
    };

    let arl = match &args.arl {
        Some(arl) => arl.clone(),
        None => secrets.arl()?,
    };

    let mut config = Config::with_arl(arl)?;
    config.bf_secret = secrets.bf_secret()?;
    Ok(config)
}

async fn sink(output: Option<&str>) -> Result<Box<dyn AsyncWrite + Unpin + Send>, Box<dyn Error>> {
    let sink: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };
    Ok(sink)
}

/// Resolves the links and downloads them.
///
/// # Errors
///
/// Returns an error on an invalid credential, unresolvable links, a failed
/// single-track download or an unrecoverable error of the output.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(&args)?;
    let config = load_config(&args)?;
    debug!("{settings:?}");

    let cancel = CancellationToken::new();
    let signals = signal::Handler::new()?.cancel_on_signal(cancel.clone());

    let deezer = Deezer::connect(&config, Arc::new(MemoryCache::default())).await?;
    let service: Arc<dyn Service> = Arc::new(deezer);

    let downloadable = generate(&*service, &args.links, &cancel).await?;
    info!("{} tracks to download", downloadable.size());

    let listener: Arc<dyn Listener> = if args.progress {
        Arc::new(JsonListener::new(std::io::stderr()))
    } else {
        Arc::new(LogListener)
    };

    let sink = sink(args.output.as_deref()).await?;
    let mut downloader = Downloader::new(
        Arc::clone(&service),
        listener,
        settings,
        config.bf_secret,
        sink,
    );

    let result = downloader.run(downloadable).await;
    cancel.cancel();
    signals.await?;

    match result {
        Ok(report) => {
            if report.downloaded == 0 && report.failed > 0 {
                warn!("nothing was downloaded");
            }
            Ok(())
        }
        Err(RunError::Failed(failure)) => Err(failure.into()),
        Err(e) => Err(e.into()),
    }
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the download.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();
    let lang = String::from("en");

    info!("starting {name}/{version}; {BUILD_PROFILE}; {lang}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}

use argh::FromArgs;
use openaq_harvest::{HarvestConfig, HarvestError, Harvester, OutputConfig, OutputSink};
use std::path::PathBuf;

#[derive(FromArgs)]
/// Harvest OpenAQ sensor measurements around a point into a table or NDJSON file
struct Args {
    /// path to a YAML configuration file (optional, uses defaults otherwise)
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// stream rows to this NDJSON file instead of writing a table at the end
    #[argh(option)]
    ndjson: Option<PathBuf>,

    /// override the lookback window, in days
    #[argh(option)]
    lookback_days: Option<u32>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        log::error!("Harvest failed: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            log::error!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<HarvestConfig, HarvestError> {
    let mut config = match &args.config {
        Some(path) => HarvestConfig::from_file(path)?,
        None => {
            log::info!("No config file specified, using defaults");
            HarvestConfig::default()
        }
    };
    if let Some(path) = &args.ndjson {
        config.output = OutputConfig::Stream { path: path.clone() };
    }
    if let Some(days) = args.lookback_days {
        config.lookback_days = days;
    }
    let config = config.with_env_api_key();
    if config.api_key.is_none() {
        log::warn!("No API key configured; requests will likely be rejected");
    }
    Ok(config)
}

async fn run(config: HarvestConfig) -> Result<(), HarvestError> {
    let harvester = Harvester::from_config(config)?;
    let mut sink = OutputSink::from_config(&harvester.config().output)?;

    let summary = harvester.run(&mut sink).await?;
    sink.finish().await?;
    log::info!("Done: {}", summary);
    Ok(())
}

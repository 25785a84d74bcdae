use anyhow::Context;
use clap::{Parser, ValueEnum};
use mirage_server::config::{Config, MetricsConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mirage")]
#[command(about = "Fixture-driven HTTP mock server")]
#[command(version)]
struct Args {
    /// Listen address, `:port` or `host:port`
    #[arg(long, env = "MIRAGE_HTTP")]
    http: Option<String>,

    /// Directory holding `<path>.json` endpoint definitions
    #[arg(long, env = "MIRAGE_DIR")]
    dir: Option<PathBuf>,

    /// YAML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root for `.js`, `.css`, `.jpg` and `.png` requests
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Decode definitions on every request
    #[arg(long)]
    no_cache: bool,

    /// Prometheus listener address, e.g. `:9091`
    #[arg(long)]
    metrics: Option<String>,

    /// Log output format; the level comes from RUST_LOG
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> Result<Config, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(http) = self.http {
            config.listen = http;
        }
        if let Some(dir) = self.dir {
            config.dir = dir;
        }
        if let Some(static_dir) = self.static_dir {
            config.static_dir = static_dir;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if let Some(listen) = self.metrics {
            config.metrics = Some(MetricsConfig { listen });
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.into_config()?;
    mirage_server::server::serve(config).await
}

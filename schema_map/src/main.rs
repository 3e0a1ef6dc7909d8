//! CLI entry point for `schema_map`.

use anyhow::Context;
use clap::Parser;

use schema_map::config::{self, Config, LoggingConfig};
use schema_map::{utils, OutputFormat, SchemaMapClient};

#[derive(Parser)]
#[command(
    name = "schema_map",
    about = "Reflect a database and print its classes, columns and relationships"
)]
struct Cli {
    /// Database to reflect, e.g. sqlite://shop.db or postgres://localhost/shop
    #[arg(long)]
    src: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Schema to reflect instead of the connection default
    #[arg(long)]
    schema: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Namespace prefix stripped from every name (repeatable)
    #[arg(long = "ignore-prefix")]
    ignore_prefixes: Vec<String>,

    /// Log progress at debug level
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => config::load_from_file(path)
                .with_context(|| format!("loading configuration from {}", path))?,
            None => Config::default(),
        };

        if let Some(src) = self.src {
            config.database.url = src;
        }
        if let Some(schema) = self.schema {
            config.database.schema = Some(schema);
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        config.naming.ignore_prefixes.extend(self.ignore_prefixes);
        if self.verbose {
            let logging = config.logging.get_or_insert_with(LoggingConfig::default);
            logging.level = "debug".to_string();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    utils::init_logging(&config.logging).context("initializing logging")?;

    let source = config.database.url.clone();
    let client = SchemaMapClient::new(config)
        .await
        .with_context(|| format!("connecting to {}", source))?;

    let rendered = client
        .render()
        .await
        .with_context(|| format!("generating schema document for {}", source))?;

    println!("{}", rendered);
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use dniscan_core::{Parser, ParserConfig, TaxIdSource};
use dniscan_store::RestStore;

use crate::session::SessionFile;

const DEFAULT_TABLE: &str = "dni_data";

/// Flags shared by every subcommand. Each can also come from the environment.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Hosted database project URL
    #[arg(long, env = "DNISCAN_STORE_URL", global = true)]
    pub store_url: Option<String>,

    /// API key for the hosted database
    #[arg(long, env = "DNISCAN_STORE_KEY", global = true, hide_env_values = true)]
    pub store_key: Option<String>,

    /// Table that receives scanned rows
    #[arg(long, default_value = DEFAULT_TABLE, global = true)]
    pub table: String,

    /// Session file (default: ~/.dniscan/session.json)
    #[arg(long, env = "DNISCAN_SESSION", global = true)]
    pub session_file: Option<PathBuf>,

    /// Tax id handling: embedded, required or computed
    #[arg(long, default_value = "embedded", global = true)]
    pub tax_id: TaxIdSource,
}

/// Resolved configuration, passed explicitly to commands.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub table: String,
    pub session_file: PathBuf,
    pub parser: ParserConfig,
}

impl Config {
    pub fn from_args(args: GlobalArgs) -> Result<Self> {
        let session_file = match args.session_file {
            Some(path) => path,
            None => SessionFile::default_path()
                .context("could not determine home directory; pass --session-file")?,
        };
        Ok(Self {
            store_url: args.store_url.filter(|s| !s.is_empty()),
            store_key: args.store_key.filter(|s| !s.is_empty()),
            table: args.table,
            session_file,
            parser: ParserConfig {
                tax_id: args.tax_id,
            },
        })
    }

    pub fn parser(&self) -> Parser {
        Parser::with_config(self.parser)
    }

    pub fn session(&self) -> SessionFile {
        SessionFile::new(self.session_file.clone())
    }

    /// Fails fast when the store URL or key is missing.
    pub fn open_store(&self) -> Result<RestStore> {
        let url = self
            .store_url
            .clone()
            .context("DNISCAN_STORE_URL (or --store-url) must be set")?;
        let key = self
            .store_key
            .clone()
            .context("DNISCAN_STORE_KEY (or --store-key) must be set")?;
        Ok(RestStore::new(url, key).with_table(self.table.clone()))
    }
}

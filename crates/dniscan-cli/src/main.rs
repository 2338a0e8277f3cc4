mod commands;
mod config;
mod display;
mod session;

use std::io::{self, Write};

use anyhow::Result;
use clap::{Parser as ClapParser, Subcommand};
use dniscan_core::{ManualEntry, compute_cuil, mask_date_input, to_persistable, verify_embedded};
use dniscan_store::RecordStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, GlobalArgs};

const DEFAULT_LOG_FILTER: &str = "dniscan=info,dniscan_core=info,dniscan_store=info";

#[derive(ClapParser)]
#[command(name = "dniscan", version)]
#[command(about = "Parse, check and store Argentine DNI barcodes", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a raw barcode payload and show its fields
    Parse {
        raw: String,
        /// Print the dni_data row as JSON instead of a card
        #[arg(long)]
        json: bool,
    },

    /// Compute the CUIL for a DNI number and sex code (M, F or E)
    Cuil { dni: String, sex: String },

    /// Log in by username
    Login { username: String },

    /// Forget the logged-in user
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Read payloads from the scanner (stdin), saving each one
    Scan,

    /// Parse and save a single payload
    Save { raw: String },

    /// Save a hand-typed entry
    Manual(ManualArgs),

    /// List rows saved by the logged-in user
    List {
        /// Print copy-ready blocks instead of a table
        #[arg(long)]
        copy: bool,
    },

    /// Delete a saved row by id
    Delete { id: i64 },
}

#[derive(clap::Args)]
struct ManualArgs {
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    dni: String,
    /// DD/MM/YYYY; separators optional (01021990 works)
    #[arg(long)]
    birth_date: String,
    /// M or F
    #[arg(long)]
    sex: String,
}

impl From<ManualArgs> for ManualEntry {
    fn from(args: ManualArgs) -> Self {
        ManualEntry {
            last_name: args.last_name,
            first_name: args.first_name,
            national_id: args.dni,
            birth_date: mask_date_input(&args.birth_date),
            sex: args.sex.to_ascii_uppercase(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_args(cli.global)?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Parse { raw, json } => {
            let identity = commands::parse_line(&config.parser(), &raw)?;
            if json {
                let record = to_persistable(&identity);
                writeln!(stdout, "{}", serde_json::to_string_pretty(&record)?)?;
            } else {
                display::write_identity(&mut stdout, &identity, &verify_embedded(&identity))?;
            }
        }
        Commands::Cuil { dni, sex } => {
            writeln!(stdout, "{}", compute_cuil(&dni, &sex)?)?;
        }
        Commands::Login { username } => {
            let store = config.open_store()?;
            let user = commands::login(&store, &config.session(), &username).await?;
            writeln!(stdout, "Logged in as {}", user.username)?;
        }
        Commands::Logout => {
            if config.session().clear()? {
                writeln!(stdout, "Logged out")?;
            } else {
                writeln!(stdout, "Not logged in")?;
            }
        }
        Commands::Whoami => match config.session().load()? {
            Some(user) => writeln!(stdout, "{} (id {})", user.username, user.id)?,
            None => writeln!(stdout, "Not logged in")?,
        },
        Commands::Scan => {
            let user = config.session().require()?;
            let store = config.open_store()?;
            eprintln!("Scanning as {}. Ctrl-D to stop.", user.username);
            let summary = commands::scan_loop(
                &store,
                &user,
                &config.parser(),
                io::stdin().lock(),
                &mut stdout,
            )
            .await?;
            writeln!(stdout, "{} saved, {} rejected", summary.saved, summary.failed)?;
        }
        Commands::Save { raw } => {
            let user = config.session().require()?;
            let store = config.open_store()?;
            let (identity, stored) =
                commands::save_scan(&store, &user, &config.parser(), &raw).await?;
            display::write_identity(&mut stdout, &identity, &verify_embedded(&identity))?;
            writeln!(stdout, "saved as #{}", stored.id)?;
        }
        Commands::Manual(args) => {
            let user = config.session().require()?;
            let store = config.open_store()?;
            let stored = commands::save_manual(&store, &user, &args.into()).await?;
            writeln!(stdout, "saved as #{}", stored.id)?;
        }
        Commands::List { copy } => {
            let user = config.session().require()?;
            let store = config.open_store()?;
            let rows = store.list_for_user(user.id).await?;
            writeln!(stdout, "User: {}", user.username)?;
            if copy {
                display::write_copy_blocks(&mut stdout, &rows)?;
            } else {
                display::write_rows(&mut stdout, &rows)?;
            }
        }
        Commands::Delete { id } => {
            config.session().require()?;
            let store = config.open_store()?;
            commands::delete(&store, id).await?;
            writeln!(stdout, "Deleted #{id}")?;
        }
    }

    Ok(())
}

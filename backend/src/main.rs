//! Same Store CLI - build the quarterly same-store dataload file
//!
//! # Commands
//!
//! ```bash
//! samestore process status.xlsx -u user@example.com -p secret   # Build Same_Store_Dataload.xlsx
//! samestore columns status.xlsx                                 # List quarterly status columns
//! samestore reference -u user@example.com -p secret             # Print the cost center table
//! samestore serve                                               # Start HTTP server (port 3000)
//! ```

use clap::{ArgAction, Args, Parser, Subcommand};
use samestore::api::types::ColumnsResponse;
use samestore::crm::fetch_reference_table;
use samestore::logging::init_logging;
use samestore::{
    parse_file, run_dataload, write_xlsx_file, ColumnChoice, CrmConnector, Credentials,
    DataloadOptions, DateSource, Quarter, SalesforceConnector, SecretsStore, Selection, Session,
    Upload, DATALOAD_FILE_NAME,
};
use std::error::Error;
use std::path::{Path, PathBuf};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "samestore")]
#[command(about = "Build the quarterly Same Store dataload file for Cost_Center__c", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where CRM secrets come from.
#[derive(Args)]
struct SecretsArgs {
    /// Secrets file
    #[arg(long, default_value = samestore::config::DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,

    /// Environment name inside the secrets file
    #[arg(short, long, default_value = samestore::config::DEFAULT_ENVIRONMENT)]
    environment: String,
}

#[derive(Args)]
struct LoginArgs {
    /// CRM username
    #[arg(short, long)]
    username: String,

    /// CRM password
    #[arg(short, long)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Full dataload: status file + CRM cost centers → xlsx
    Process {
        /// Status spreadsheet (xlsx, xls or csv)
        input: PathBuf,

        #[command(flatten)]
        login: LoginArgs,

        /// Quarter for the dates (Q1-Q4); default: taken from the status column
        #[arg(short, long)]
        quarter: Option<Quarter>,

        /// Year for --quarter (default: current year)
        #[arg(short, long, requires = "quarter")]
        year: Option<i32>,

        /// Status column header (default: most recent quarter)
        #[arg(short, long)]
        column: Option<String>,

        /// Output file
        #[arg(short, long, default_value = DATALOAD_FILE_NAME)]
        output: PathBuf,

        #[command(flatten)]
        secrets: SecretsArgs,
    },

    /// List the quarterly status columns of a spreadsheet
    Columns {
        /// Status spreadsheet (xlsx, xls or csv)
        input: PathBuf,
    },

    /// Fetch the cost center reference table and print it as JSON
    Reference {
        #[command(flatten)]
        login: LoginArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        secrets: SecretsArgs,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,

        #[command(flatten)]
        secrets: SecretsArgs,
    },
}

#[tokio::main]
async fn main() {
    // .env only carries RUST_LOG
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            input,
            login,
            quarter,
            year,
            column,
            output,
            secrets,
        } => {
            let selection = Selection {
                column: column.map(ColumnChoice::Named).unwrap_or_default(),
                dates: quarter
                    .map(|quarter| DateSource::Explicit { quarter, year })
                    .unwrap_or_default(),
            };
            cmd_process(&input, login, selection, &output, &secrets).await
        }
        Commands::Columns { input } => cmd_columns(&input),
        Commands::Reference {
            login,
            output,
            secrets,
        } => cmd_reference(login, output.as_deref(), &secrets).await,
        Commands::Serve { port, secrets } => cmd_serve(port, &secrets).await,
    };

    if let Err(e) = result {
        tracing::error!("❌ {}", e);
        std::process::exit(1);
    }
}

fn connector(args: &SecretsArgs) -> CliResult<SalesforceConnector> {
    let store = SecretsStore::load(&args.secrets)?;
    let secrets = store.environment(&args.environment)?;
    Ok(SalesforceConnector::new(secrets.clone()))
}

async fn cmd_process(
    input: &Path,
    login: LoginArgs,
    selection: Selection,
    output: &Path,
    secrets: &SecretsArgs,
) -> CliResult<()> {
    let connector = connector(secrets)?;

    let bytes = std::fs::read(input)?;
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let mut session = Session::new();
    session.set_credentials(Credentials::new(login.username, login.password));
    session.set_upload(Upload::new(file_name, bytes));
    session.selection = selection;

    let dataload = run_dataload(&mut session, &connector, &DataloadOptions::default()).await?;
    write_xlsx_file(&dataload.rows, output)?;
    session.clear();

    let report = &dataload.report;
    eprintln!("\n📊 Summary");
    eprintln!("   Column:        {}", report.column);
    eprintln!("   Period:        {}", report.date_range);
    eprintln!("   Cost centers:  {}", report.reference_count);
    eprintln!("   Input rows:    {}", report.input_rows);
    eprintln!("   Dropped:       {}", report.dropped_rows);
    eprintln!("   Unmatched:     {}", report.unmatched_rows);
    if !report.bad_values.is_empty() {
        eprintln!("   Bad values:    {}", report.bad_values.join(", "));
    }
    eprintln!("   Output rows:   {}", report.output_rows);
    eprintln!("\n💾 Saved to: {}", output.display());

    Ok(())
}

fn cmd_columns(input: &Path) -> CliResult<()> {
    let sheet = parse_file(input)?;
    let response = ColumnsResponse::from(&sheet);

    eprintln!("📄 {} ({}, {} rows)", input.display(), response.format, response.row_count);
    if response.columns.is_empty() {
        eprintln!("   No quarterly status columns found");
    }
    for column in &response.columns {
        let marker = if response.latest.as_deref() == Some(column.name.as_str()) {
            " (latest)"
        } else {
            ""
        };
        println!("{}\t{} {}{}", column.name, column.quarter, column.year, marker);
    }

    Ok(())
}

async fn cmd_reference(
    login: LoginArgs,
    output: Option<&Path>,
    secrets: &SecretsArgs,
) -> CliResult<()> {
    let connector = connector(secrets)?;
    let credentials = Credentials::new(login.username, login.password);
    let connection = connector.connect(&credentials).await?;

    let options = DataloadOptions::default();
    let table = fetch_reference_table(&connection, &options.object_name, &options.query).await?;

    let json = serde_json::to_string_pretty(&table)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("💾 {} cost centers saved to: {}", table.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn cmd_serve(port: u16, secrets: &SecretsArgs) -> CliResult<()> {
    let connector = connector(secrets)?;

    samestore::server::start_server(port, connector, DataloadOptions::default()).await?;
    Ok(())
}

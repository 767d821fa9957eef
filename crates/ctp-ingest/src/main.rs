//! CTP Ingest - clinical trials registry ingestion

use clap::{Args, Parser, Subcommand};
use ctp_common::logging::{init_logging, LogConfig, LogLevel};
use ctp_ingest::pipeline::{
    self, PipelineConfig, DEFAULT_DBT_BIN, DEFAULT_DBT_LOG_PATH, DEFAULT_DBT_PROFILES_DIR,
    DEFAULT_DBT_PROJECT_DIR, DEFAULT_DBT_TARGET, DEFAULT_DBT_TARGET_PATH, DEFAULT_DBT_THREADS,
};
use ctp_ingest::{IngestConfig, IngestError, IngestReport, Ingestor};
use std::path::PathBuf;
use std::process;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "ctp-ingest")]
#[command(author, version, about = "Load ClinicalTrials.gov studies into bronze.raw_trials")]
struct Cli {
    /// Defaults to `ingest`
    #[command(subcommand)]
    command: Option<Command>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the latest trials and load them into the staging table
    Ingest(IngestArgs),

    /// Ingest, then build the silver and gold layers with dbt
    Pipeline {
        #[command(flatten)]
        ingest: IngestArgs,

        #[command(flatten)]
        dbt: DbtArgs,
    },
}

#[derive(Args, Debug, Default)]
struct IngestArgs {
    /// Maximum number of studies to ingest
    #[arg(long)]
    limit: Option<usize>,

    /// Studies requested per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Studies endpoint
    #[arg(long)]
    base_url: Option<String>,
}

impl IngestArgs {
    fn apply(self, mut config: IngestConfig) -> ctp_ingest::Result<IngestConfig> {
        if let Some(limit) = self.limit {
            config.api.record_limit = limit;
        }
        if let Some(page_size) = self.page_size {
            config.api.page_size = page_size;
        }
        if let Some(base_url) = self.base_url {
            config.api.base_url = base_url;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct DbtArgs {
    /// dbt executable
    #[arg(long, env = "CTP_DBT_BIN", default_value = DEFAULT_DBT_BIN)]
    dbt_bin: String,

    /// Directory containing dbt_project.yml
    #[arg(long, env = "CTP_DBT_PROJECT_DIR", default_value = DEFAULT_DBT_PROJECT_DIR)]
    project_dir: PathBuf,

    /// Directory containing profiles.yml
    #[arg(long, env = "CTP_DBT_PROFILES_DIR", default_value = DEFAULT_DBT_PROFILES_DIR)]
    profiles_dir: PathBuf,

    #[arg(long, env = "CTP_DBT_LOG_PATH", default_value = DEFAULT_DBT_LOG_PATH)]
    log_path: PathBuf,

    #[arg(long, env = "CTP_DBT_TARGET_PATH", default_value = DEFAULT_DBT_TARGET_PATH)]
    target_path: PathBuf,

    /// dbt target from profiles.yml
    #[arg(long, env = "CTP_DBT_TARGET", default_value = DEFAULT_DBT_TARGET)]
    target: String,

    #[arg(long, env = "CTP_DBT_THREADS", default_value_t = DEFAULT_DBT_THREADS)]
    threads: u32,

    /// Skip `dbt deps`
    #[arg(long)]
    skip_deps: bool,
}

impl From<DbtArgs> for PipelineConfig {
    fn from(args: DbtArgs) -> Self {
        Self {
            dbt_bin: args.dbt_bin,
            project_dir: args.project_dir,
            profiles_dir: args.profiles_dir,
            log_path: args.log_path,
            target_path: args.target_path,
            target: args.target,
            threads: args.threads,
            skip_deps: args.skip_deps,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("ctp-ingest")
        .filter_directives("sqlx=warn")
        .build();

    // Environment variables take precedence
    let guard = match log_config.merge_env().and_then(|config| init_logging(&config)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        },
    };

    let result = execute(cli.command).await;

    let code = match result {
        Ok(report) => {
            println!("{report}");
            0
        },
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Ingestion failed");
            if let IngestError::Http { ref body, .. } = e {
                eprintln!("API error body: {body}");
            }
            eprintln!("Error: {e}");
            e.exit_code()
        },
    };

    // Flush file logs before exiting
    drop(guard);
    if code != 0 {
        process::exit(code);
    }
}

async fn execute(command: Option<Command>) -> ctp_ingest::Result<IngestReport> {
    let config = IngestConfig::load()?;

    match command.unwrap_or_else(|| Command::Ingest(IngestArgs::default())) {
        Command::Ingest(args) => {
            let config = args.apply(config)?;
            Ingestor::new(&config)?.run().await
        },
        Command::Pipeline { ingest, dbt } => {
            let config = ingest.apply(config)?;
            pipeline::run_pipeline(&config, &dbt.into()).await
        },
    }
}

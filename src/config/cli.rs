use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "sales-etl")]
#[command(about = "Load supermarket sales into a SQLite star schema and rank product lines")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override monitoring setting from config (`--monitor` or `--monitor=false`)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub monitor: Option<bool>,

    /// Show what would be processed without executing
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract, normalize, replace the warehouse tables and write the report (default)
    Run,
    /// Rewrite the top-sales report from the existing warehouse
    Report,
    /// Run an analytical query against the existing warehouse and print JSON lines
    Query {
        #[arg(value_enum)]
        kind: QueryKind,

        /// Rank cut-off; defaults to load.top_n
        #[arg(long)]
        top_n: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    TopSales,
    MonthlyTrend,
    TopRated,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

use crate::commands::{run_catalog, run_export, run_score, CatalogArgs, ExportArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use risk_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Building Risk Intake",
    about = "Run the building risk intake service and its offline tools from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a JSON answer file without submitting it
    Score(ScoreArgs),
    /// Print the questionnaire catalog
    Catalog(CatalogArgs),
    /// Export a JSON dump of stored records as the sorted summary table (CSV)
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override PREDICTION_API_BASE_URL
    #[arg(long)]
    pub(crate) prediction_url: Option<String>,
    /// Treat new email/password accounts as verified on signup
    #[arg(long)]
    pub(crate) auto_verify: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Catalog(args) => run_catalog(args),
        Command::Export(args) => run_export(args),
    }
}

use crate::demo::{run_analyze, run_demo, AnalyzeArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use inspectiq::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "InspectIQ",
    about = "Run the field inspection review service or exercise its workflows from the command line",
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
    /// Run the automatic risk classifier on an inspection draft and print the result
    Analyze(AnalyzeArgs),
    /// Drive one inspection from assignment to second-tier closure in memory
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analyze(args) => run_analyze(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["inspectiq-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn analyze_requires_a_report_path() {
        assert!(Cli::try_parse_from(["inspectiq-api", "analyze"]).is_err());
        let cli = Cli::try_parse_from(["inspectiq-api", "analyze", "--report", "draft.json"])
            .expect("parses");
        match cli.command {
            Some(Command::Analyze(args)) => {
                assert_eq!(args.report, std::path::PathBuf::from("draft.json"));
                assert!(args.now.is_none());
            }
            other => panic!("expected analyze, got {other:?}"),
        }
    }
}

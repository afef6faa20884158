// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process::ExitCode;

use clap::Parser;
use yolo_detect_server::cli::args::{Cli, Commands};
use yolo_detect_server::cli::check::run_check;
use yolo_detect_server::cli::detect::run_detect;
use yolo_detect_server::cli::logging::{init_tracing, set_verbose};
use yolo_detect_server::cli::serve::run_serve;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.quiet);
    set_verbose(!cli.quiet);

    match cli.command {
        Commands::Serve(args) => run_serve(args).await?,
        Commands::Detect(args) => tokio::task::spawn_blocking(move || run_detect(&args)).await??,
        Commands::Check(args) => {
            if !run_check(&args) {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

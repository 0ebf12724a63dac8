// CLI modules
mod cli;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Daemon, Health, Init, Version};

command_enum! {
    (Daemon, Daemon),
    (Health, Health),
    (Init, Init),
    (Version, Version),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());
    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: unable to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

use assistant_cli::cli::{run, Args};
use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    if let Err(err) = run::run(args).await {
        eprintln!("{} {err}", "Error:".red().bold());
        std::process::exit(1);
    }
}

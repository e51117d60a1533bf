use clap::Parser;
use dvrd::cli::Args;
use dvrd::{dev_tracing, supervisor};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dev_tracing::init_tracing();
    let args = Args::parse();

    match supervisor::run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dvrd: {err}");
            std::process::ExitCode::from(if err.is_fatal() { 1 } else { 0 })
        }
    }
}

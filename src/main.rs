use clap::Parser;
use station_summary::cli::{self, Args};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();
    cli::init_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    // The pipeline is synchronous; run it on the blocking pool so Ctrl+C
    // can abandon the whole run.
    let result = runtime.block_on(async {
        let task = tokio::task::spawn_blocking(move || cli::run(&args));

        tokio::select! {
            joined = task => {
                match joined {
                    Ok(result) => result.map(|_| ()),
                    Err(e) => Err(anyhow::anyhow!("Processing task failed: {}", e)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Processing interrupted by user"))
            }
        }
    });

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

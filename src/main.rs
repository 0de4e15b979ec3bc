//! askflow CLI binary entry point.

use askflow::ask::Client;
use askflow::cli::{AskArgs, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => handle_ask(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_ask(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::from_env()?;
    let answer = client.ask_text(args.to_options()).await?;
    println!("{answer}");
    Ok(())
}

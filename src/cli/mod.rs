//! CLI entry point for askflow.

use clap::{Parser, Subcommand};

use crate::ask::AskOptions;

/// askflow CLI
#[derive(Parser, Debug)]
#[command(name = "askflow", version, about = "Ask a chat-completion model from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and print the free-text answer
    Ask(AskArgs),
}

/// Arguments for the `ask` subcommand.
#[derive(Parser, Debug)]
pub struct AskArgs {
    /// User prompt
    pub prompt: String,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Model to use (defaults to the configured default model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Attempts per model call
    #[arg(long)]
    pub retries: Option<u32>,
}

impl AskArgs {
    /// Ask options for these arguments.
    pub fn to_options(&self) -> AskOptions {
        let mut opts = AskOptions::new(self.prompt.clone());
        if let Some(system) = &self.system {
            opts = opts.with_system(system.clone());
        }
        if let Some(model) = &self.model {
            opts = opts.with_model(model.clone());
        }
        if let Some(t) = self.temperature {
            opts = opts.with_temperature(t);
        }
        if let Some(max) = self.max_tokens {
            opts = opts.with_max_tokens(max);
        }
        if let Some(retries) = self.retries {
            opts = opts.with_retries(retries);
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ask_arguments_into_options() {
        let cli = Cli::parse_from([
            "askflow",
            "ask",
            "capital of France?",
            "--model",
            "gpt-4o-mini",
            "-t",
            "0",
            "--retries",
            "5",
        ]);

        let Commands::Ask(args) = cli.command;
        let opts = args.to_options();

        assert_eq!(opts.prompt, "capital of France?");
        assert_eq!(opts.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(opts.settings.temperature, Some(0.0));
        assert_eq!(opts.max_attempts, Some(5));
        assert_eq!(opts.system, None);
    }
}

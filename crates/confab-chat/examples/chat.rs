//! Interactive chat REPL over a real backend.
//!
//! Usage:
//!   GOOGLE_API_KEY=... cargo run --example chat
//!   GOOGLE_API_KEY=... cargo run --example chat -- --model gemini-2.0-flash --stream
//!   HF_TOKEN=hf_... cargo run --example chat -- --provider hf --model meta-llama/Llama-3.1-8B-Instruct
//!
//! Ctrl-C or type "exit" / "quit" to leave. "/reset" clears the history.

use std::io::{self, BufRead, Write};

use clap::Parser;
use confab_ai::{BackendConfig, CallOptions, Provider};
use confab_chat::{CallSpec, ChatClient, ChatReply};
use futures::StreamExt;

#[derive(Parser)]
#[command(name = "chat", about = "Chat through a confab backend")]
struct Cli {
    /// Provider: "google" or "hf"
    #[arg(long, default_value = "google")]
    provider: String,

    /// Model to use
    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,

    /// Stream fragments as they arrive
    #[arg(long)]
    stream: bool,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Max output tokens per reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// API base URL (defaults depend on provider)
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let provider: Provider = match cli.provider.parse() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let mut config = BackendConfig::new(provider, &cli.model);
    if let Some(ref url) = cli.base_url {
        config = config.with_base_url(url);
    }

    let client = match ChatClient::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e} (is {} set?)", provider.api_key_env_var());
            std::process::exit(1);
        }
    };

    eprintln!("confab chat");
    eprintln!("provider: {}", provider.name());
    eprintln!("model: {}", cli.model);
    eprintln!("---");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        eprint!("\x1b[1;36myou>\x1b[0m ");
        io::stderr().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit" | "/q") {
            break;
        }
        if trimmed == "/reset" {
            client.reset().await;
            eprintln!("(history cleared)");
            continue;
        }

        let mut spec = CallSpec::new().with_options(CallOptions {
            temperature: cli.temperature,
            max_tokens: cli.max_tokens,
            ..Default::default()
        });
        if cli.stream {
            spec = spec.streaming();
        }

        match client.call(trimmed, spec).await {
            Ok(ChatReply::Complete(text)) => {
                eprint!("\x1b[1;32mbot>\x1b[0m ");
                println!("{text}");
            }
            Ok(ChatReply::Fragments(mut fragments)) => {
                eprint!("\x1b[1;32mbot>\x1b[0m ");
                io::stderr().flush().ok();
                while let Some(fragment) = fragments.next().await {
                    match fragment {
                        Ok(text) => {
                            print!("{text}");
                            io::stdout().flush().ok();
                        }
                        Err(e) => {
                            eprintln!("\n\x1b[1;31merror:\x1b[0m {e}");
                            break;
                        }
                    }
                }
                println!();
            }
            Err(e) => {
                eprintln!("\x1b[1;31merror:\x1b[0m {e}");
            }
        }
    }

    eprintln!("bye.");
}

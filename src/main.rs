use std::fs::File;
use std::io::Write;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use courier::config;
use courier::llm::{ChatMessage, LlmClient};

#[derive(Parser)]
#[command(name = "courier", about = "Minimal client for OpenAI-compatible chat endpoints")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the models the provider currently serves
    Models {
        /// Bypass the cached list and fetch fresh
        #[arg(long)]
        refresh: bool,
    },
    /// Send a prompt and print the completion
    Chat {
        /// Prompt text (words are joined with spaces)
        prompt: Vec<String>,
        /// Model identifier (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,
        /// System message prepended to the conversation
        #[arg(long)]
        system: Option<String>,
        /// Wait for the full response instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to courier.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("courier.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let loaded = config::load_config().map_err(std::io::Error::other)?;
    let resolved = config::resolve(&loaded);
    log::info!("Courier starting up: provider={}", resolved.label);

    let client = LlmClient::connect(resolved.provider_config())
        .map_err(std::io::Error::other)?
        .with_model_ttl(resolved.model_ttl);

    match args.command {
        Command::Models { refresh } => {
            let mut client = client;
            let models = client.list_models(refresh).await;
            if models.is_empty() {
                eprintln!("No models available (see courier.log for details)");
                return Ok(());
            }
            for (index, model) in models.iter().enumerate() {
                println!("{index} - {}", model.id);
            }
        }
        Command::Chat {
            prompt,
            model,
            system,
            no_stream,
        } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                eprintln!("Nothing to send: the prompt is empty");
                return Ok(());
            }
            let model = model.unwrap_or(resolved.default_model);

            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(ChatMessage::system(system));
            }
            messages.push(ChatMessage::user(prompt));

            let mut completion = client.chat_completions(&model, &messages, !no_stream);
            let mut stdout = std::io::stdout();
            while let Some(fragment) = completion.next().await {
                print!("{fragment}");
                stdout.flush()?;
            }
            println!();
            if let Some(failure) = completion.failure() {
                eprintln!("Completion failed: {failure}");
            }
        }
    }
    Ok(())
}

//! Terminal chat front-end for the query server
//!
//! Run with: cargo run -p rag-assistant --bin rag-chat -- --endpoint http://localhost:8080

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::time::Duration;

use rag_assistant::client::{ChatClient, ChatSession, Role, DEFAULT_API_URL};
use rag_assistant::config::RagConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rag-chat", about = "Ask questions about the indexed paper")]
struct Cli {
    /// Query server URL
    #[arg(long, env = "RAG_API_URL", default_value = DEFAULT_API_URL)]
    endpoint: String,
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_message(role: Role, content: &str) {
    match role {
        Role::User => println!("{} {}", style("you >").green().bold(), content),
        Role::Assistant => println!("{} {}\n", style("assistant >").cyan().bold(), content),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_assistant=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = RagConfig::load()?.client;
    config.endpoint = cli.endpoint;
    let client = ChatClient::from_config(&config)?;
    let mut session = ChatSession::new();

    println!("{}", style("RAG Research Assistant").bold());
    println!(
        "{}",
        style("Ask me questions about the 'Attention Is All You Need' paper.").dim()
    );
    println!("{}\n", style("/history replays the chat, /quit exits").dim());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", style("What is your question?").bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let prompt = line?;
        let prompt = prompt.trim();

        match prompt {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                if session.is_empty() {
                    println!("{}\n", style("(no messages yet)").dim());
                }
                for message in session.messages() {
                    print_message(message.role, &message.content);
                }
                continue;
            }
            _ => {}
        }

        let spinner = thinking_spinner();
        let answer = session.submit(&client, prompt).await;
        spinner.finish_and_clear();
        print_message(Role::Assistant, &answer);
    }

    Ok(())
}

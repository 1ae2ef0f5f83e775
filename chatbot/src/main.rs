use std::{path::PathBuf, sync::Arc};

use chatbot::{corpus_indexer, ChatMode, ChatSession, Config, DocumentSource, TextSource, WebLoader};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with Gemini or a retrieval-grounded Groq model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat in the terminal. `/reset` clears, `/quit` exits.
    Chat(ChatArgs),
    /// Build the retrieval corpus and optionally query it.
    Index(IndexArgs),
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Overrides CHATBOT_MODE.
    #[arg(long, value_enum)]
    mode: Option<ChatMode>,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Page to index instead of CORPUS_URL.
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,
    /// Local text file to index.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Print the chunks nearest to this text.
    #[arg(long)]
    query: Option<String>,
    #[arg(long, default_value_t = 4)]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Chat(args) => {
            if let Some(mode) = args.mode {
                config.mode = mode;
            }
            chat(&config).await
        }
        Command::Index(args) => index(&config, args).await,
    }
}

async fn chat(config: &Config) -> Result<()> {
    let controller = chatbot::build_controller(config)?;
    let mut session = ChatSession::new();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Chatting with {} ({}).", controller.model(), config.mode.as_str());

    loop {
        stdout.write_all(b"You: ").await.into_diagnostic()?;
        stdout.flush().await.into_diagnostic()?;

        let Some(line) = lines.next_line().await.into_diagnostic()? else {
            break;
        };

        match line.trim() {
            "/quit" => break,
            "/reset" => {
                controller.reset(&mut session);
                println!("(history cleared)");
            }
            _ => {
                if let Some(reply) = controller.submit(&mut session, &line).await {
                    println!("Bot: {}\n", reply.text);
                }
            }
        }
    }

    Ok(())
}

async fn index(config: &Config, args: IndexArgs) -> Result<()> {
    let source: Arc<dyn DocumentSource> = match (&args.file, &args.url) {
        (Some(path), _) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("Could not read {}", path.display()))?;
            Arc::new(TextSource::new(path.display().to_string(), text))
        }
        (None, Some(url)) => Arc::new(WebLoader::new(url.clone())?),
        (None, None) => Arc::new(WebLoader::new(config.corpus.url.clone())?),
    };

    let indexer = corpus_indexer(config, source)?;
    let index = indexer.index().await?;
    println!(
        "Indexed {} chunks of {} dimensions.",
        index.len(),
        index.dimensions()
    );

    if let Some(query) = args.query {
        for (rank, hit) in indexer.retrieve(&query, args.top).await?.iter().enumerate() {
            println!(
                "\n#{} (distance {:.4}, chunk {})\n{}",
                rank + 1,
                hit.distance,
                hit.chunk.id,
                hit.chunk.text
            );
        }
    }

    Ok(())
}

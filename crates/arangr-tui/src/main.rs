use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use arangr_core::{openai_factory, AssistantService, JsonFileStore};
use clap::{Parser, Subcommand};
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "arangr-assistant", version)]
#[command(about = "AI assistant for asking questions about files and naming documents")]
struct Cli {
    /// Path to the AI config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the assistant dialog (default)
    Chat {
        /// File to ask about
        file: Option<PathBuf>,
    },
    /// Print three filename suggestions for a file
    Suggest {
        file: PathBuf,
    },
    /// Ask a single question and print the answer
    Ask {
        question: String,
        /// File to use as context
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Save an OpenAI API key read from stdin
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging();

    let service = match &cli.config {
        Some(path) => AssistantService::load(Arc::new(JsonFileStore::new(path.clone())), openai_factory()),
        None => AssistantService::open(),
    };
    info!(ready = service.is_ready(), "Assistant service started");

    match cli.command.unwrap_or(Commands::Chat { file: None }) {
        Commands::Chat { file } => run_dialog(service, file).await?,
        Commands::Suggest { file } => suggest(&service, &file).await?,
        Commands::Ask { question, file } => ask(&service, &question, file.as_deref()).await?,
        Commands::Setup => setup(service)?,
    }

    Ok(())
}

async fn run_dialog(service: AssistantService, file: Option<PathBuf>) -> Result<()> {
    let content = match &file {
        Some(path) => Some(service.extract_content(path).await),
        None => None,
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(service, events.sender(), file, content);

    let result = async {
        loop {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event)?;

            if app.should_quit {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn suggest(service: &AssistantService, file: &Path) -> Result<()> {
    if !service.is_ready() {
        bail!("AI Assistant is not configured. Run `arangr-assistant setup` first.");
    }
    for name in service.suggest_names(file, None).await {
        println!("{}", name);
    }
    Ok(())
}

async fn ask(service: &AssistantService, question: &str, file: Option<&Path>) -> Result<()> {
    let content = match file {
        Some(path) => Some(service.extract_content(path).await),
        None => None,
    };
    println!("{}", service.ask(question, content.as_deref(), file).await);
    Ok(())
}

fn setup(mut service: AssistantService) -> Result<()> {
    eprintln!("Paste your OpenAI API key and press Enter:");
    let mut key = String::new();
    std::io::stdin().lock().read_line(&mut key)?;

    match service.setup(&key) {
        Ok(()) => {
            println!("{}", arangr_core::prompts::SETUP_SUCCESS_MESSAGE);
            Ok(())
        }
        Err(e) => bail!(e.user_message()),
    }
}

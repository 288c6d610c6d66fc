//! Start command - bootstrap the AI server and run an interactive session.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use sqlman_ai::{
    local_ai_paths, AiSession, BootstrapConfig, BootstrapError, FailureCategory,
    InstallConfirmation, PythonProvider,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

type Session = AiSession<PythonProvider>;

/// The one reader of standard input, shared by the prompt and the REPL.
#[derive(Clone)]
struct Terminal {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

impl Terminal {
    fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }

    async fn read_line(&self) -> std::io::Result<Option<String>> {
        self.lines.lock().await.next_line().await
    }
}

/// y/N question asked while the bootstrap spinner is hidden.
struct TerminalConfirmation {
    yes: bool,
    terminal: Terminal,
    progress: MultiProgress,
}

#[async_trait]
impl InstallConfirmation for TerminalConfirmation {
    async fn confirm_install(&self, reason: &str) -> bool {
        if self.yes {
            return true;
        }

        let _ = self.progress.clear();
        self.progress.set_draw_target(ProgressDrawTarget::hidden());
        let answer = self.ask(reason).await;
        self.progress.set_draw_target(ProgressDrawTarget::stderr());
        answer
    }
}

impl TerminalConfirmation {
    /// Anything but an explicit yes declines.
    async fn ask(&self, question: &str) -> bool {
        print!("{} [y/N] ", question);
        if std::io::stdout().flush().is_err() {
            return false;
        }

        match self.terminal.read_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(e) => {
                debug!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

pub(crate) async fn run(yes: bool, model: Option<&str>) -> miette::Result<()> {
    let config = BootstrapConfig::from_env();

    local_ai_paths::ensure_dirs()
        .map_err(|e| miette::miette!("Failed to create data directories: {}", e))?;

    if config.hf_token.is_empty() {
        println!(
            "Note: SQLMAN_HF_TOKEN is not set; private model repositories will be unreachable."
        );
    }

    let progress = MultiProgress::new();
    let terminal = Terminal::new();
    let confirm = TerminalConfirmation {
        yes,
        terminal: terminal.clone(),
        progress: progress.clone(),
    };

    let provider = PythonProvider::from_config(&config);
    let session = AiSession::new(&config, provider, confirm);

    if bootstrap(&session, &progress).await {
        if let Some(id) = model {
            load(&session, id).await;
        }
    }

    println!();
    println!("Type `help` for a list of commands.");
    repl(&session, &progress, &terminal).await
}

/// Run the pipeline behind a spinner. Returns whether the AI server is ready.
async fn bootstrap(session: &Session, progress: &MultiProgress) -> bool {
    let pb = progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut status = session.subscribe_bootstrap();
    let run = session.start();
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Ok(()) = status.changed() => {
                pb.set_message(status.borrow_and_update().message.clone());
            }
        }
    };

    match result {
        Ok(available) => {
            pb.finish_and_clear();
            println!("AI server ready, {} model(s) available.", available.len());
            print_models(session);
            true
        }
        Err(e) => {
            pb.abandon_with_message("Bootstrap failed");
            report(session, &e);
            false
        }
    }
}

fn report(session: &Session, error: &BootstrapError) {
    println!("Error: {}", error);
    let hint = match error.category() {
        FailureCategory::Busy => return,
        FailureCategory::Provisioning => {
            "Check the Python installation with `sqlman env status`.".to_string()
        }
        FailureCategory::Reachability => format!(
            "The server process started but never answered on {}.",
            session.bootstrapper().client().base_url()
        ),
        FailureCategory::Transport => {
            "The server rejected a request; check SQLMAN_HF_TOKEN and SQLMAN_MODEL_REPO."
                .to_string()
        }
    };
    println!("{}", hint);
    println!("Type `retry` to run the setup again.");
}

fn print_models(session: &Session) {
    let available = session.available_models();
    if available.is_empty() {
        println!("No models available on the server.");
        return;
    }

    let active = session.ai_status();
    println!("Available models:");
    for (i, model) in available.iter().enumerate() {
        let marker = if active.model_name() == Some(model.storage_identifier) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:>2}. {} ({})",
            marker,
            i + 1,
            model.display_name,
            model.storage_identifier
        );
        println!("       {}", model.description);
    }
}

/// Accepts a storage identifier or a 1-based position in the model list.
async fn load(session: &Session, arg: &str) {
    let available = session.available_models();
    let id = arg
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| available.identifiers().nth(i))
        .unwrap_or(arg);

    println!("Loading {}...", id);
    match session.select(id).await {
        Ok(model) => println!("{}", model.detail),
        Err(e) => println!("Error: {}", e),
    }
}

async fn repl(
    session: &Session,
    progress: &MultiProgress,
    terminal: &Terminal,
) -> miette::Result<()> {
    loop {
        print!("sqlman> ");
        std::io::stdout()
            .flush()
            .map_err(|e| miette::miette!("Failed to write prompt: {}", e))?;

        let Some(line) = terminal
            .read_line()
            .await
            .map_err(|e| miette::miette!("Failed to read input: {}", e))?
        else {
            break;
        };

        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => print_help(),
            "models" => print_models(session),
            "load" if !arg.is_empty() => load(session, arg).await,
            "unload" => match session.unload().await {
                Ok(message) => println!("{}", message),
                Err(e) => println!("Error: {}", e),
            },
            "schema" if !arg.is_empty() => schema(session, Path::new(arg)).await,
            "ask" if !arg.is_empty() => match session.generate_sql(arg).await {
                Ok(sql) => println!("{}", sql),
                Err(e) => println!("Error: {}", e),
            },
            "status" => print_status(session),
            "retry" => {
                bootstrap(session, progress).await;
            }
            "stop" => match session.stop().await {
                Ok(message) => println!("{}", message),
                Err(e) => println!("Error: {}", e),
            },
            "quit" | "exit" => break,
            "load" | "schema" | "ask" => println!("Usage: {} <argument>", command),
            other => println!("Unknown command `{}`. Type `help` for a list.", other),
        }
    }

    if let Err(e) = session.stop().await {
        debug!("Nothing to stop on exit: {}", e);
    }
    Ok(())
}

async fn schema(session: &Session, path: &Path) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            println!("Failed to read schema file: {}", e);
            return;
        }
    };
    let schema: serde_json::Value = match serde_json::from_str(&content) {
        Ok(schema) => schema,
        Err(e) => {
            println!("Failed to parse schema JSON: {}", e);
            return;
        }
    };

    match session.set_schema(&schema).await {
        Ok(message) => println!("{}", message),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_status(session: &Session) {
    let status = session.bootstrap_status();
    println!("Bootstrap: {} - {}", status.stage, status.message);
    if let (Some(stage), Some(error)) = (status.failed_at, &status.error) {
        println!("  failed while {}: {}", stage, error);
    }

    let ai = session.ai_status();
    match ai.model_name() {
        Some(name) if ai.loading => println!("Model:     {} (loading)", name),
        Some(name) => println!("Model:     {}", name),
        None if ai.loading => println!("Model:     loading"),
        None => println!("Model:     none"),
    }
    println!("AI ready:  {}", ai.is_ready());
}

fn print_help() {
    println!("Commands:");
    println!("  models           List models available on the server");
    println!("  load <id|n>      Load a model by identifier or list position");
    println!("  unload           Unload the current model");
    println!("  schema <file>    Send a JSON schema file as generation context");
    println!("  ask <prompt>     Generate SQL for a request");
    println!("  status           Show bootstrap and model status");
    println!("  retry            Run the setup pipeline again");
    println!("  stop             Stop the AI server");
    println!("  quit             Stop the server and exit");
}

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use super::files::{confirm_delete, print_files, print_messages};
use crate::chat::{SendOutcome, SessionController, SessionEvent};
use crate::core::ClientConfig;
use crate::transport::{BoxedTransport, HttpTransport, UploadFile};

const HELP: &str = "\
Type a question and press enter. Commands:
  /files              list uploaded documents
  /upload <path>      upload a PDF
  /delete <name>      delete an uploaded document
  /feedback <n> <s>   rate the nth answer with score s
  /new                start a new conversation
  /quit               exit";

#[derive(Debug, PartialEq)]
enum ReplCommand<'a> {
    Ask(&'a str),
    Files,
    Upload(&'a str),
    Delete(&'a str),
    Feedback(usize, i64),
    New,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> ReplCommand<'_> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Ask(line);
    };
    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };

    match (cmd, arg) {
        ("files", _) => ReplCommand::Files,
        ("new", _) => ReplCommand::New,
        ("help", _) => ReplCommand::Help,
        ("quit" | "exit", _) => ReplCommand::Quit,
        ("upload" | "delete", "") => ReplCommand::Invalid(format!("/{} needs a file", cmd)),
        ("upload", path) => ReplCommand::Upload(path),
        ("delete", name) => ReplCommand::Delete(name),
        ("feedback", args) => {
            let mut parts = args.split_whitespace();
            match (
                parts.next().and_then(|n| n.parse::<usize>().ok()),
                parts.next().and_then(|s| s.parse::<i64>().ok()),
            ) {
                (Some(n), Some(score)) => ReplCommand::Feedback(n, score),
                _ => ReplCommand::Invalid("Usage: /feedback <n> <score>".to_string()),
            }
        }
        _ => ReplCommand::Invalid(format!("Unknown command /{}", cmd)),
    }
}

/// Prints session events as they arrive. Answers are re-published in
/// full on every chunk so only the unseen suffix is written.
#[derive(Default)]
struct Renderer {
    printed: usize,
}

impl Renderer {
    fn render(&mut self, event: SessionEvent) {
        let mut stdout = std::io::stdout();
        match event {
            SessionEvent::AssistantOpened(_) => {
                self.printed = 0;
            }
            SessionEvent::AssistantUpdated(text) => {
                if let Some(delta) = text.get(self.printed..) {
                    print!("{}", delta);
                    let _ = stdout.flush();
                }
                self.printed = text.len();
            }
            SessionEvent::AssistantClosed(_) => {
                println!();
            }
            SessionEvent::FilesChanged(files) => {
                println!("{} document(s) in the knowledge base", files.len());
            }
            SessionEvent::HistoryLoaded(count) => {
                println!("Loaded {} message(s) of history", count);
            }
            SessionEvent::Reset => {
                println!("Started a new conversation");
            }
            SessionEvent::Notice(notice) => {
                eprintln!("! {}", notice.message);
            }
            SessionEvent::UserAppended(_) => {}
        }
    }

    fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<SessionEvent>) {
        while let Ok(event) = rx.try_recv() {
            self.render(event);
        }
    }
}

pub async fn run(config: ClientConfig) -> Result<()> {
    let mut rl = DefaultEditor::new().context("Editor failed")?;

    let transport: BoxedTransport = Arc::new(HttpTransport::new(config.clone()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = SessionController::new(transport)
        .with_send_policy(config.send_policy)
        .with_events(tx);
    let mut renderer = Renderer::default();

    session.bootstrap().await;
    renderer.drain(&mut rx);
    print_messages(&session.messages());
    println!("{}", HELP);

    loop {
        let line = match rl.readline(">>> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };
        let _ = rl.add_history_entry(line.as_str());

        match parse_command(&line) {
            ReplCommand::Ask(question) => {
                let send = session.send(question);
                tokio::pin!(send);
                // Render chunks while the answer is still streaming
                let outcome = loop {
                    tokio::select! {
                        outcome = &mut send => break outcome,
                        Some(event) = rx.recv() => renderer.render(event),
                    }
                };
                renderer.drain(&mut rx);
                if let SendOutcome::Rejected(reason) = outcome {
                    tracing::debug!("Send rejected: {}", reason);
                }
            }
            ReplCommand::Files => print_files(&session.files()),
            ReplCommand::Upload(path) => match UploadFile::from_path(Path::new(path)).await {
                Ok(file) => {
                    if session.upload(file).await.is_ok() {
                        println!("Uploaded {}", path);
                    }
                }
                Err(e) => eprintln!("! {}", e),
            },
            ReplCommand::Delete(name) => {
                let _ = session.delete_file(name, |n| confirm_delete(&mut rl, n)).await;
            }
            ReplCommand::Feedback(n, score) => match session.assistant_message_id(n) {
                Some(id) => {
                    session.send_feedback(&id, score);
                }
                None => eprintln!("! No answer #{}", n),
            },
            ReplCommand::New => session.reset(),
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(msg) => eprintln!("! {}", msg),
        }
        renderer.drain(&mut rx);
    }

    Ok(())
}

//! One-shot commands for history and document management.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rustyline::DefaultEditor;

use crate::chat::{DeleteOutcome, FileRecord, FileRegistry, Message, Role, SessionController};
use crate::core::ClientConfig;
use crate::transport::{BoxedTransport, HttpTransport, Transport, UploadFile};

pub(crate) fn print_files(files: &[FileRecord]) {
    if files.is_empty() {
        println!("No documents uploaded");
    }
    for file in files {
        println!("{}\t{}", file.name, file.size.as_deref().unwrap_or("unknown size"));
    }
}

pub(crate) fn print_messages(messages: &[Message]) {
    for msg in messages {
        let who = if msg.role == Role::User { "you" } else { "assistant" };
        println!("[{}] {}", who, msg.content);
    }
}

pub(crate) fn confirm_delete(rl: &mut DefaultEditor, name: &str) -> bool {
    rl.readline(&format!("Delete \"{}\"? [y/N] ", name))
        .map(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false)
}

pub async fn history(config: ClientConfig) -> Result<()> {
    let transport = HttpTransport::new(config);
    let messages = transport
        .fetch_history()
        .await
        .context("Failed to fetch history")?;

    print_messages(&messages);
    Ok(())
}

pub async fn list(config: ClientConfig) -> Result<()> {
    let transport = HttpTransport::new(config);
    let Some(files) = transport
        .fetch_files()
        .await
        .context("Failed to fetch file list")?
    else {
        bail!("Backend returned an unrecognized file list");
    };

    let mut registry = FileRegistry::new();
    registry.set_all(files);
    print_files(registry.records());
    Ok(())
}

pub async fn upload(config: ClientConfig, path: &Path) -> Result<()> {
    let file = UploadFile::from_path(path).await?;
    let transport: BoxedTransport = Arc::new(HttpTransport::new(config));
    let session = SessionController::new(transport);

    session
        .upload(file)
        .await
        .with_context(|| format!("Failed to upload {}", path.display()))?;
    println!("Uploaded {}", path.display());
    print_files(&session.files());
    Ok(())
}

pub async fn delete(config: ClientConfig, name: &str, yes: bool) -> Result<()> {
    let transport: BoxedTransport = Arc::new(HttpTransport::new(config));
    let session = SessionController::new(transport);

    let outcome = session
        .delete_file(name, |n| {
            if yes {
                return true;
            }
            match DefaultEditor::new() {
                Ok(mut rl) => confirm_delete(&mut rl, n),
                Err(_) => false,
            }
        })
        .await
        .with_context(|| format!("Failed to delete {}", name))?;

    match outcome {
        DeleteOutcome::Deleted => {
            println!("Deleted {}", name);
            print_files(&session.files());
        }
        DeleteOutcome::Cancelled => println!("Cancelled"),
    }
    Ok(())
}

//! REPL commands. Every command returns `Result<Reply, String>`; the string
//! is what the user sees when something goes wrong.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::document::DocumentStatus;
use doctalk_core::models::message::{Message, Role};
use doctalk_core::models::upload::UploadFile;
use doctalk_session::{Completion, UploadOutcome};

use crate::config::config_info;
use crate::state::AppState;

pub const HELP: &str = "\
commands:
  /docs                  list documents
  /upload <path>         upload a pdf, csv, txt, docx, mp4, mov or m4v file
  /cancel                forget the current upload
  /open <doc> [conv]     open a document, optionally a specific conversation
  /new                   start a new conversation on the open document
  /switch <conv>         switch to another conversation of the open document
  /lang <code>           answer language, e.g. en
  /model <id>            model id
  /history               show the conversation
  /retry                 reload the conversation after an error
  /clear                 delete this conversation's history
  /delete                delete this conversation and its document
  /status                session and upload state
  /config                show configuration
  /help                  this text
  /quit                  exit
anything else is sent as a question about the open document.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Docs,
    Upload(PathBuf),
    Cancel,
    Open {
        document_id: DocumentId,
        conversation_id: Option<ConversationId>,
    },
    New,
    Switch(ConversationId),
    Lang(String),
    Model(String),
    History,
    Retry,
    Clear,
    Delete,
    Status,
    Config,
    Help,
    Quit,
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

impl Command {
    /// Lines starting with `/` are commands; anything else is a prompt.
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Prompt(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("docs", []) => Command::Docs,
            ("upload", [path]) => Command::Upload(PathBuf::from(path)),
            ("cancel", []) => Command::Cancel,
            ("open", [doc]) => Command::Open {
                document_id: DocumentId::from(*doc),
                conversation_id: None,
            },
            ("open", [doc, conv]) => Command::Open {
                document_id: DocumentId::from(*doc),
                conversation_id: Some(ConversationId::from(*conv)),
            },
            ("new", []) => Command::New,
            ("switch", [conv]) => Command::Switch(ConversationId::from(*conv)),
            ("lang", [code]) => Command::Lang(code.to_string()),
            ("model", [id]) => Command::Model(id.to_string()),
            ("history", []) => Command::History,
            ("retry", []) => Command::Retry,
            ("clear", []) => Command::Clear,
            ("delete", []) => Command::Delete,
            ("status", []) => Command::Status,
            ("config", []) => Command::Config,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            ("upload" | "open" | "switch" | "lang" | "model", _) => {
                return Err(format!("usage: {}", usage(name)));
            }
            _ => return Err(format!("unknown command /{name}; try /help")),
        };
        Ok(command)
    }
}

fn usage(name: &str) -> &'static str {
    match name {
        "upload" => "/upload <path>",
        "open" => "/open <doc> [conv]",
        "switch" => "/switch <conv>",
        "lang" => "/lang <code>",
        _ => "/model <id>",
    }
}

/// Route one input line. A pending `/delete` confirmation consumes the line.
pub async fn handle_line(state: &Arc<AppState>, line: &str) -> Result<Reply, String> {
    {
        let mut confirm = state.confirm_delete.lock().await;
        if *confirm {
            *confirm = false;
            drop(confirm);
            if line.trim() == "yes" {
                return delete_current(state).await;
            }
            return Ok(Reply::Text("delete cancelled".to_string()));
        }
    }
    execute(state, Command::parse(line)?).await
}

pub async fn execute(state: &Arc<AppState>, command: Command) -> Result<Reply, String> {
    let text = match command {
        Command::Docs => docs(state).await?,
        Command::Upload(path) => upload(state, path)?,
        Command::Cancel => {
            state.uploads.reset();
            "upload cancelled".to_string()
        }
        Command::Open {
            document_id,
            conversation_id,
        } => open(state, document_id, conversation_id).await?,
        Command::New => new_conversation(state).await?,
        Command::Switch(conversation_id) => switch(state, conversation_id).await?,
        Command::Lang(code) => {
            state.session.set_language(code.as_str());
            format!("language set to {code}")
        }
        Command::Model(id) => {
            state.session.set_model(id.as_str());
            format!("model set to {id}")
        }
        Command::History => render_messages(&state.session.snapshot().messages),
        Command::Retry => {
            let _ = state.session.reload().await.map_err(|e| e.to_string())?;
            render_messages(&state.session.snapshot().messages)
        }
        Command::Clear => clear(state).await?,
        Command::Delete => confirm_delete(state).await?,
        Command::Status => status(state),
        Command::Config => serde_json::to_string_pretty(&config_info(&state.config))
            .map_err(|e| e.to_string())?,
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
        Command::Prompt(prompt) => ask(state, prompt).await?,
    };
    Ok(Reply::Text(text))
}

async fn docs(state: &AppState) -> Result<String, String> {
    let documents = state.registry.refresh().await.map_err(|e| e.to_string())?;
    state.directory.hydrate(&documents);

    if documents.is_empty() {
        return Ok("no documents; /upload one".to_string());
    }

    let mut out = String::new();
    for d in &documents {
        let _ = writeln!(
            out,
            "{}  {}  [{}]  {} conversation(s)",
            d.id,
            d.name,
            status_label(d.status),
            d.conversations.len()
        );
    }
    Ok(out.trim_end().to_string())
}

fn upload(state: &Arc<AppState>, path: PathBuf) -> Result<String, String> {
    let file = UploadFile::from_path(&path).map_err(|e| e.to_string())?;
    state.uploads.validate(&file).map_err(|e| e.to_string())?;

    let reply = format!("uploading {} ({} bytes)", file.name, file.size());
    let state = state.clone();
    tokio::spawn(async move {
        match state.uploads.upload(file).await {
            Ok(UploadOutcome::Uploaded { file_name, size }) => {
                println!("uploaded {file_name} ({size} bytes); it will be listed by /docs once processed");
                state.uploads.acknowledge();
                if let Ok(documents) = state.registry.refresh().await {
                    state.directory.hydrate(&documents);
                }
            }
            Ok(UploadOutcome::Discarded) => {}
            Err(e) => println!("upload failed: {e}"),
        }
    });
    Ok(reply)
}

async fn open(
    state: &AppState,
    document_id: DocumentId,
    conversation_id: Option<ConversationId>,
) -> Result<String, String> {
    let documents = state.registry.refresh().await.map_err(|e| e.to_string())?;
    state.directory.hydrate(&documents);

    let document = state
        .registry
        .get(&document_id)
        .ok_or_else(|| format!("no document {document_id}"))?;
    if document.status != DocumentStatus::Ready {
        return Err(format!(
            "{} is still {}",
            document.name,
            status_label(document.status)
        ));
    }

    let conversation_id = match conversation_id {
        Some(c) => c,
        None => match state
            .directory
            .active(&document_id)
            .or_else(|| state.directory.list(&document_id).last().cloned())
        {
            Some(c) => c,
            None => state
                .directory
                .create(&document_id)
                .await
                .map_err(|e| e.to_string())?,
        },
    };

    let _ = state
        .session
        .load(&document_id, &conversation_id)
        .await
        .map_err(|e| e.to_string())?;
    state
        .directory
        .set_active(&document_id, &conversation_id)
        .map_err(|e| e.to_string())?;

    Ok(format!(
        "opened {} (conversation {conversation_id})\n{}",
        document.name,
        render_messages(&state.session.snapshot().messages)
    ))
}

fn open_document(state: &AppState) -> Result<DocumentId, String> {
    state
        .session
        .snapshot()
        .document_id
        .ok_or_else(|| "open a document first".to_string())
}

async fn new_conversation(state: &AppState) -> Result<String, String> {
    let document_id = open_document(state)?;
    let conversation_id = state
        .directory
        .create(&document_id)
        .await
        .map_err(|e| e.to_string())?;
    let _ = state
        .session
        .switch_to(&conversation_id)
        .await
        .map_err(|e| e.to_string())?;
    state
        .directory
        .set_active(&document_id, &conversation_id)
        .map_err(|e| e.to_string())?;
    Ok(format!("started conversation {conversation_id}"))
}

async fn switch(state: &AppState, conversation_id: ConversationId) -> Result<String, String> {
    let document_id = open_document(state)?;
    if !state.directory.list(&document_id).contains(&conversation_id) {
        return Err(format!("no conversation {conversation_id} on {document_id}"));
    }
    let _ = state
        .session
        .switch_to(&conversation_id)
        .await
        .map_err(|e| e.to_string())?;
    state
        .directory
        .set_active(&document_id, &conversation_id)
        .map_err(|e| e.to_string())?;
    Ok(format!(
        "switched to {conversation_id}\n{}",
        render_messages(&state.session.snapshot().messages)
    ))
}

async fn clear(state: &AppState) -> Result<String, String> {
    let conversation_id = state
        .session
        .snapshot()
        .conversation_id
        .ok_or_else(|| "no conversation is open".to_string())?;
    let _ = state
        .session
        .delete_history(&conversation_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok("history cleared".to_string())
}

async fn confirm_delete(state: &AppState) -> Result<String, String> {
    let snapshot = state.session.snapshot();
    let (Some(conversation_id), Some(file_name)) = (snapshot.conversation_id, snapshot.file_name)
    else {
        return Err("no conversation is open".to_string());
    };
    *state.confirm_delete.lock().await = true;
    Ok(format!(
        "this permanently deletes conversation {conversation_id} and the document {file_name}.\n\
         type `yes` to confirm"
    ))
}

async fn delete_current(state: &AppState) -> Result<Reply, String> {
    let snapshot = state.session.snapshot();
    let (Some(document_id), Some(conversation_id)) =
        (snapshot.document_id, snapshot.conversation_id)
    else {
        return Err("no conversation is open".to_string());
    };
    let _ = state
        .session
        .delete_conversation_and_document(
            &conversation_id,
            &document_id,
            &state.registry,
            &state.directory,
        )
        .await
        .map_err(|e| e.to_string())?;
    Ok(Reply::Text(format!("deleted {document_id}")))
}

fn status(state: &AppState) -> String {
    let session = state.session.snapshot();
    let upload = state.uploads.snapshot();

    let mut out = String::new();
    let _ = writeln!(out, "session: {:?}", session.status);
    if let (Some(d), Some(c)) = (&session.document_id, &session.conversation_id) {
        let name = session.file_name.as_deref().unwrap_or_default();
        let _ = writeln!(out, "  document {d} ({name}), conversation {c}");
    }
    let _ = writeln!(
        out,
        "  model {}, language {}, {} message(s)",
        session.model_id,
        session.language,
        session.messages.len()
    );
    if let Some(failure) = &session.last_error {
        let _ = writeln!(out, "  last error: {}", failure.message);
    }
    let _ = write!(out, "upload: {:?}", upload.state);
    if let Some(name) = &upload.file_name {
        let _ = write!(out, " {name}");
    }
    if let Some(failure) = &upload.error {
        let _ = write!(out, " ({})", failure.message);
    }
    out
}

async fn ask(state: &AppState, prompt: String) -> Result<String, String> {
    state.session.set_prompt(prompt);
    let completion = state
        .session
        .submit_prompt()
        .await
        .map_err(|e| e.to_string())?;
    if completion == Completion::Discarded {
        return Ok(String::new());
    }
    let messages = state.session.snapshot().messages;
    Ok(messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.clone())
        .unwrap_or_default())
}

pub fn render_messages(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "(no messages yet)".to_string();
    }
    let mut out = String::new();
    for m in messages {
        let who = match m.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        let pending = if m.is_optimistic() { " (not sent)" } else { "" };
        let _ = writeln!(out, "{who}{pending}: {}", m.content);
    }
    out.trim_end().to_string()
}

fn status_label(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Processing => "processing",
        DocumentStatus::Ready => "ready",
        DocumentStatus::Failed => "failed",
    }
}

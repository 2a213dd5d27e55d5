//! Terminal driver for the orchestrator.
//!
//! Plain lines are sent as chat messages.  Slash commands manage
//! conversations:
//!
//! ```text
//! /new [title]          start a conversation
//! /open <id>            switch to a conversation
//! /list                 list conversations with a preview
//! /rename <id> <title>  rename a conversation
//! /delete <id>          delete a conversation
//! /retry [message id]   retry the given (or last failed) reply
//! /image <uri> <prompt> ask about an image (URL, base64:… or local path)
//! /name <name>          change the name shown on your messages
//! /quit
//! ```

use std::sync::Arc;

use anyhow::Context;
use chatrobot_client::{init_tracing, ClientConfig, HttpGateway, HttpRelay, Orchestrator};
use chatrobot_shared::constants::{DEFAULT_CONVERSATION_TITLE, DEFAULT_USER_NAME};
use chatrobot_shared::MessageStatus;
use chatrobot_store::{lock, Database, Message, SharedDatabase, User};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env();
    if config.api_key.is_empty() {
        tracing::warn!("CHATROBOT_API_KEY is not set, gateway calls will be rejected");
    }

    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    }
    .into_shared();
    let user = local_user(&db)?;
    tracing::info!(user_id = user.id, name = %user.name, "local user ready");

    let gateway = Arc::new(HttpGateway::new(&config)?);
    let relay = Arc::new(HttpRelay::new(&config)?);
    let orch = Orchestrator::new(user.id, db, gateway, relay, &config);
    let session = orch.bootstrap().await?;
    tracing::info!(session, relay = %orch.relay_url(), "chat ready");

    let mut loading = orch.loading_updates();
    tokio::spawn(async move {
        while loading.changed().await.is_ok() {
            if *loading.borrow_and_update() {
                eprintln!("…");
            }
        }
    });

    let mut profile = orch.profile_live()?;
    tokio::spawn(async move {
        while let Ok(user) = profile.changed().await {
            eprintln!("now chatting as {}", user.name);
        }
    });

    print_active(&orch).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        if let Err(e) = handle(&orch, line).await {
            eprintln!("error: {e:#}");
        }
    }

    orch.settle().await;
    Ok(())
}

/// The first local user, created on first launch.
fn local_user(db: &SharedDatabase) -> anyhow::Result<User> {
    let db = lock(db)?;
    match db.first_user()? {
        Some(user) => Ok(user),
        None => Ok(db.create_user(DEFAULT_USER_NAME, "", None)?),
    }
}

async fn handle(orch: &Orchestrator, line: &str) -> anyhow::Result<()> {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/new" => {
            let title = if rest.is_empty() {
                DEFAULT_CONVERSATION_TITLE
            } else {
                rest
            };
            orch.start_new_session(title).await?;
        }
        "/open" => {
            orch.open_conversation(parse_id(rest)?)?;
        }
        "/list" => {
            let active = orch.active_session();
            for conversation in orch.list_conversations()? {
                let marker = if Some(conversation.id) == active { '*' } else { ' ' };
                println!(
                    "{marker} {:>4}  {}  {}",
                    conversation.id,
                    conversation.title,
                    orch.conversation_preview(conversation.id)?
                );
            }
            return Ok(());
        }
        "/rename" => {
            let (id, title) = rest
                .split_once(' ')
                .context("usage: /rename <id> <title>")?;
            orch.rename_conversation(parse_id(id)?, title.trim())?;
            return Ok(());
        }
        "/delete" => {
            orch.delete_conversation(parse_id(rest)?)?;
            return Ok(());
        }
        "/name" => {
            if rest.is_empty() {
                anyhow::bail!("usage: /name <name>");
            }
            let user = orch.profile()?;
            orch.update_profile(rest, &user.description, user.avatar_uri.as_deref())?;
            return Ok(());
        }
        "/retry" => {
            let target = if rest.is_empty() {
                last_failed(orch).await?.context("nothing to retry")?
            } else {
                parse_id(rest)?
            };
            orch.retry_assistant_message(target).await?;
        }
        "/image" => {
            let (uri, prompt) = rest
                .split_once(' ')
                .context("usage: /image <uri> <prompt>")?;
            orch.send_vision_message(uri, prompt.trim()).await?;
        }
        _ if command.starts_with('/') => {
            println!("unknown command {command}");
            return Ok(());
        }
        _ => orch.send_user_message(line).await?,
    }

    print_active(orch).await
}

fn parse_id(text: &str) -> anyhow::Result<i64> {
    text.trim()
        .parse()
        .with_context(|| format!("not an id: {text:?}"))
}

async fn last_failed(orch: &Orchestrator) -> anyhow::Result<Option<i64>> {
    let messages = orch.active_messages().await?.current()?;
    Ok(messages
        .iter()
        .rev()
        .find(|m| !m.is_self && m.status == MessageStatus::Failed)
        .map(|m| m.id))
}

async fn print_active(orch: &Orchestrator) -> anyhow::Result<()> {
    let messages = orch.active_messages().await?.current()?;
    println!("──── conversation {} ────", orch.active_session().unwrap_or_default());
    for message in &messages {
        println!("{}", render(message));
    }
    Ok(())
}

fn render(message: &Message) -> String {
    let time = chrono::DateTime::from_timestamp(message.time, 0)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default();
    let mut line = format!("[{}] {} {}: {}", message.id, time, message.name, message.content);
    if let Some(uri) = &message.image_uri {
        line.push_str(&format!(" <{}>", chatrobot_shared::ImageRef::parse(uri)));
    }
    match message.status {
        MessageStatus::Sent => {}
        MessageStatus::Loading => line.push_str(" (…)"),
        MessageStatus::Failed => line.push_str(" (failed, /retry)"),
    }
    line
}

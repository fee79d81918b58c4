//! Interactive terminal chat

use anyhow::Result;
use chrono::Local;
use console::style;
use road_ai_agent::{ConversationDriver, TurnOutcome};
use road_ai_core::knowledge::{GREETING, SUGGESTED_QUERIES};
use road_ai_core::session::{ChatSession, Message, Role, SessionId};
use road_ai_core::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One line of user input, interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start a new session
    New,
    /// List sessions, newest first
    List,
    /// Focus the n-th session of the listing (1-based)
    Switch(usize),
    /// Reprint the active session
    History,
    /// Send the n-th suggested query (1-based)
    Suggest(usize),
    Help,
    Quit,
    /// Plain text for the model
    Send(String),
    /// Blank line
    Empty,
    /// Slash command that could not be understood
    Invalid(String),
}

/// Parse one input line. Text for the model is kept exactly as typed.
pub fn parse_command(raw: &str) -> ChatCommand {
    let line = raw.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Send(raw.to_string());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (name, arg) {
        ("new", None) => ChatCommand::New,
        ("list", None) => ChatCommand::List,
        ("history", None) => ChatCommand::History,
        ("help", None) => ChatCommand::Help,
        ("quit" | "exit", None) => ChatCommand::Quit,
        ("switch", Some(n)) => match parse_index(n) {
            Some(n) => ChatCommand::Switch(n),
            None => ChatCommand::Invalid(format!("not a session number: {}", n)),
        },
        ("suggest", Some(n)) => match parse_index(n) {
            Some(n) if n <= SUGGESTED_QUERIES.len() => ChatCommand::Suggest(n),
            _ => ChatCommand::Invalid(format!(
                "pick a suggestion between 1 and {}",
                SUGGESTED_QUERIES.len()
            )),
        },
        ("switch" | "suggest", None) => ChatCommand::Invalid(format!("/{} needs a number", name)),
        _ => ChatCommand::Invalid(format!("unknown command: {}", line)),
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|n| *n > 0)
}

/// Result of a background turn, tagged with the session it was sent to
struct Completion {
    session_id: SessionId,
    result: road_ai_core::Result<TurnOutcome>,
}

/// Run the chat loop until `/quit` or end of input
pub async fn run_chat(driver: Arc<ConversationDriver>) -> Result<()> {
    let first = driver.store().write().create_session();
    debug!("Started chat with session {}", first);

    println!(
        "{} {}",
        style("Oman Road AI").bold().cyan(),
        style(format!("({})", driver.model())).dim()
    );
    println!("{}", style("Type /help for commands.").dim());
    print_active(&driver);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    ChatCommand::Quit => break,
                    ChatCommand::Empty => {}
                    ChatCommand::Send(text) => submit(&driver, &done_tx, text),
                    ChatCommand::Suggest(n) => {
                        let text = SUGGESTED_QUERIES[n - 1].to_string();
                        println!("{} {}", style("you>").green().bold(), text);
                        submit(&driver, &done_tx, text);
                    }
                    command => handle_session_command(&driver, command),
                }
            }
            Some(done) = done_rx.recv() => report(&driver, done),
        }
    }

    if driver.is_in_flight() {
        println!(
            "{}",
            style("Leaving while a reply is still pending; it will be discarded.").yellow()
        );
    }
    Ok(())
}

/// Send `text` to the active session in a background task
fn submit(driver: &Arc<ConversationDriver>, done_tx: &mpsc::UnboundedSender<Completion>, text: String) {
    if driver.is_in_flight() {
        println!(
            "{}",
            style("Still waiting for the previous reply. Session commands keep working.").yellow()
        );
        return;
    }
    let Some(session_id) = driver.store().read().active_id().cloned() else {
        println!("{}", style("No active session. Use /new.").red());
        return;
    };

    println!("{}", style("Consulting the standards...").dim());
    let driver = Arc::clone(driver);
    let done_tx = done_tx.clone();
    tokio::spawn(async move {
        let result = driver.send_turn(&session_id, &text).await;
        let _ = done_tx.send(Completion { session_id, result });
    });
}

fn report(driver: &ConversationDriver, done: Completion) {
    let title = driver
        .store()
        .read()
        .get(&done.session_id)
        .map(|s| s.title.clone())
        .unwrap_or_default();

    match done.result {
        Ok(TurnOutcome::Fulfilled(message)) => {
            println!("{} {}", style("ai>").cyan().bold(), style(format!("[{}]", title)).dim());
            println!("{}", message.text);
        }
        Ok(TurnOutcome::Failed(message)) => {
            println!("{} {}", style("ai>").red().bold(), style(format!("[{}]", title)).dim());
            println!("{}", style(message.text).red());
        }
        Err(Error::Busy) => {
            println!(
                "{}",
                style("Still waiting for the previous reply. Try again shortly.").yellow()
            );
        }
        Err(e) => {
            warn!("Turn for session {} was rejected: {}", done.session_id, e);
            println!("{} {}", style("✗").red(), e);
        }
    }
}

fn handle_session_command(driver: &ConversationDriver, command: ChatCommand) {
    match command {
        ChatCommand::New => {
            driver.store().write().create_session();
            print_active(driver);
        }
        ChatCommand::List => print_list(driver),
        ChatCommand::Switch(n) => {
            let target = driver.store().read().list().nth(n - 1).map(|s| s.id.clone());
            match target {
                Some(id) => {
                    if let Err(e) = driver.store().write().set_active(&id) {
                        println!("{} {}", style("✗").red(), e);
                        return;
                    }
                    print_active(driver);
                }
                None => println!("{} No session number {}", style("✗").red(), n),
            }
        }
        ChatCommand::History => print_active(driver),
        ChatCommand::Help => print_help(),
        ChatCommand::Invalid(reason) => println!("{} {}", style("✗").red(), reason),
        ChatCommand::Quit
        | ChatCommand::Empty
        | ChatCommand::Send(_)
        | ChatCommand::Suggest(_) => {}
    }
}

fn print_list(driver: &ConversationDriver) {
    let store = driver.store().read();
    let active = store.active_id().cloned();
    println!("{}", style("Sessions").bold());
    for (i, session) in store.list().enumerate() {
        let marker = if Some(&session.id) == active.as_ref() {
            style("*").green().bold()
        } else {
            style(" ")
        };
        println!(
            " {} {:>2}. {} {}",
            marker,
            i + 1,
            session.title,
            style(format!(
                "({} messages, {})",
                session.messages.len(),
                session.created_at.with_timezone(&Local).format("%H:%M")
            ))
            .dim()
        );
    }
}

fn print_active(driver: &ConversationDriver) {
    let store = driver.store().read();
    let Some(session) = store.active() else {
        println!("{}", style("No active session. Use /new.").dim());
        return;
    };
    print_session(session);
}

fn print_session(session: &ChatSession) {
    println!("\n{}", style(&session.title).bold().underlined());
    if session.is_empty() {
        println!("{}", GREETING);
        println!("{}", style("Try one of these (/suggest <n>):").dim());
        for (i, query) in SUGGESTED_QUERIES.iter().enumerate() {
            println!("  {}. {}", i + 1, query);
        }
        return;
    }
    for message in &session.messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let time = message
        .time()
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default();
    let label = match message.role {
        Role::User => style("you>").green().bold(),
        Role::Model => style("ai>").cyan().bold(),
    };
    println!("{} {}", label, style(time).dim());
    println!("{}", message.text);
}

fn print_help() {
    println!("{}", style("Commands").bold());
    println!("  /new          start a new discussion");
    println!("  /list         list discussions, newest first");
    println!("  /switch <n>   focus discussion n from /list");
    println!("  /history      show the current discussion");
    println!("  /suggest <n>  ask suggested query n");
    println!("  /quit         leave");
    println!("Anything else is sent to the assistant.");
}

//! Line-oriented console front-end.
//!
//! Reads commands from stdin, forwards inbound events to the controller
//! and prints transcript changes to stdout as they happen.

use std::fmt::Write as _;
use std::ops::ControlFlow;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::chat::{
    AuthToken, ChatController, ChatHistory, ChatId, ClientConfig, EventSink, Feedback, Notice,
    NoticeLevel, SessionGroups, StreamingState, Transcript,
};
use crate::start_client;

const HELP: &str = "\
commands:
  <text>            send a message
  /new              start a new chat
  /list             list recent chats
  /select <id>      open a chat
  /stop             stop the current reply
  /stream on|off    toggle streaming
  /good, /bad       rate the last reply
  /quit             exit";

/// One line of user input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Plain text to send.
    Send(String),
    /// Leave the active chat.
    New,
    /// Show the grouped chat list.
    List,
    /// Open a chat by id.
    Select(ChatId),
    /// Stop the current reply.
    Stop,
    /// Toggle streaming mode.
    Stream(bool),
    /// Rate the last assistant reply.
    Rate(Feedback),
    /// Show usage.
    Help,
    /// Exit the client.
    Quit,
}

impl Command {
    /// Parse a line. Unknown or malformed slash commands map to
    /// [`Command::Help`].
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("new"), None) => Self::New,
            (Some("list"), None) => Self::List,
            (Some("select"), Some(id)) => Self::Select(ChatId::new(id)),
            (Some("stop"), None) => Self::Stop,
            (Some("stream"), Some("on")) => Self::Stream(true),
            (Some("stream"), Some("off")) => Self::Stream(false),
            (Some("good"), None) => Self::Rate(Feedback::Positive),
            (Some("bad"), None) => Self::Rate(Feedback::Negative),
            (Some("quit" | "exit"), None) => Self::Quit,
            _ => Self::Help,
        }
    }
}

/// Tracks what has already been printed so only changes are written.
#[derive(Debug, Default)]
pub struct ConsoleView {
    chat: Option<ChatId>,
    shown: Vec<String>,
    typing: bool,
}

impl ConsoleView {
    /// Text to print for the current state, given what was printed before.
    pub fn render(
        &mut self,
        transcript: &Transcript,
        state: &StreamingState,
        active_chat: Option<&ChatId>,
        notices: &[Notice],
    ) -> String {
        let mut out = String::new();

        if self.chat.as_ref() != active_chat || transcript.len() < self.shown.len() {
            self.chat = active_chat.cloned();
            self.shown.clear();
            match active_chat {
                Some(id) => {
                    let _ = writeln!(out, "\n--- chat {id} ---");
                }
                None => out.push_str("\n--- new chat ---\n"),
            }
        }

        for (index, message) in transcript.messages().iter().enumerate() {
            let author = if message.is_bot { "assistant" } else { "you" };
            match self.shown.get_mut(index) {
                Some(shown) if *shown == message.content => {}
                Some(shown) if message.content.starts_with(shown.as_str()) => {
                    out.push_str(&message.content[shown.len()..]);
                    shown.clone_from(&message.content);
                }
                Some(shown) => {
                    let _ = write!(out, "\n{author} (revised): {}", message.content);
                    shown.clone_from(&message.content);
                }
                None => {
                    let _ = write!(out, "\n{author}: {}", message.content);
                    self.shown.push(message.content.clone());
                }
            }
        }

        if state.is_typing && !self.typing {
            out.push_str("\n(assistant is typing...)");
        }
        self.typing = state.is_typing;

        for notice in notices {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Error => "error",
            };
            let _ = write!(out, "\n[{tag}] {}", notice.message);
        }

        out
    }
}

/// Render the grouped session list.
#[must_use]
pub fn format_sessions(groups: &SessionGroups) -> String {
    if groups.is_empty() {
        return "\nno recent chats".to_string();
    }

    let mut out = String::new();
    for (label, sessions) in groups.buckets() {
        if sessions.is_empty() {
            continue;
        }
        let _ = write!(out, "\n{label}");
        for session in sessions {
            let _ = write!(out, "\n  {}  {}", session.id, session.title);
        }
    }
    out
}

/// Execute one command. Failures are already surfaced as notices, so they
/// only get a debug log here.
pub async fn execute<H: ChatHistory, S: EventSink>(
    controller: &mut ChatController<H, S>,
    command: Command,
) -> ControlFlow<(), Option<String>> {
    let result = match command {
        Command::Send(text) => controller.send_message(&text).await.map(|_| ()),
        Command::New => {
            controller.start_new_session();
            Ok(())
        }
        Command::List => {
            return ControlFlow::Continue(
                controller
                    .refresh_sessions()
                    .await
                    .ok()
                    .map(|()| format_sessions(controller.sessions())),
            );
        }
        Command::Select(id) => controller.select_session(&id).await,
        Command::Stop => controller.stop_response(),
        Command::Stream(enabled) => {
            controller.set_streaming(enabled);
            Ok(())
        }
        Command::Rate(feedback) => {
            let last_reply = controller
                .transcript()
                .messages()
                .iter()
                .rev()
                .find(|m| m.is_bot)
                .map(|m| m.id.clone());
            match last_reply {
                Some(id) => controller.give_feedback(&id, feedback).await,
                None => return ControlFlow::Continue(Some("\nnothing to rate yet".to_string())),
            }
        }
        Command::Help => return ControlFlow::Continue(Some(format!("\n{HELP}"))),
        Command::Quit => return ControlFlow::Break(()),
    };

    if let Err(err) = result {
        debug!(error = %err, "command failed");
        return ControlFlow::Continue(Some(format!("\n[error] {err}")));
    }
    ControlFlow::Continue(None)
}

/// Run the interactive loop until stdin closes or the user quits.
///
/// # Errors
/// Returns an error if the client cannot be set up or the console cannot
/// be written to.
pub async fn run(config: ClientConfig, token: AuthToken) -> anyhow::Result<()> {
    let (mut controller, mut listener) =
        start_client::connect(&config, token).context("failed to set up the chat client")?;
    let mut view = ConsoleView::default();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Err(err) = controller.bootstrap().await {
        debug!(error = %err, "bootstrap failed");
    }
    stdout.write_all(format!("{HELP}\n").as_bytes()).await?;

    loop {
        let mut extra = None;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match execute(&mut controller, Command::parse(&line)).await {
                    ControlFlow::Break(()) => break,
                    ControlFlow::Continue(output) => extra = output,
                }
            }
            event = listener.recv() => {
                let Some(event) = event else {
                    break;
                };
                controller.apply(event);
            }
        }
        controller.apply_pending(&mut listener);

        let notices = controller.take_notices();
        let mut out = view.render(
            controller.transcript(),
            controller.state(),
            controller.active_chat(),
            &notices,
        );
        if let Some(extra) = extra {
            out.push_str(&extra);
        }
        if !out.is_empty() {
            stdout.write_all(out.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    stdout.write_all(b"\n").await?;
    let (_, socket) = controller.into_parts();
    socket.close().await;
    Ok(())
}

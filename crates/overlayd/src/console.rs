//! Operator console on stdin: `members`, `neighbors`, `quit`.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use overlay_api::OverlayView;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Members,
    Neighbors,
    Quit,
    Help,
    Unknown(String),
}

impl Command {
    /// Case-insensitive; blank lines are `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }
        Some(match word.to_ascii_lowercase().as_str() {
            "members" => Command::Members,
            "neighbors" => Command::Neighbors,
            "quit" | "exit" => Command::Quit,
            "help" | "?" => Command::Help,
            _ => Command::Unknown(word.to_string()),
        })
    }
}

/// Text printed for a listing command.
pub fn render(view: &OverlayView, command: &Command) -> String {
    match (command, view) {
        (Command::Members, OverlayView::Directory(registry)) => {
            listing("No members registered.", "Members", &registry.snapshot())
        }
        (Command::Neighbors, OverlayView::Node(node)) => {
            listing("No neighbors connected.", "Neighbors", &node.neighbors())
        }
        (Command::Members, OverlayView::Node(_)) => {
            "Members are only known to the directory.".to_string()
        }
        (Command::Neighbors, OverlayView::Directory(_)) => {
            "The directory has no neighbors.".to_string()
        }
        (Command::Help, OverlayView::Directory(_)) => "Commands: members, quit".to_string(),
        (Command::Help, OverlayView::Node(_)) => "Commands: neighbors, quit".to_string(),
        (Command::Quit, _) => String::new(),
        (Command::Unknown(word), _) => format!("Unknown command: {word}"),
    }
}

fn listing<T: std::fmt::Display>(empty: &str, title: &str, items: &[T]) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let mut out = format!("{title} ({}):", items.len());
    for item in items {
        out.push_str(&format!("\n  {item}"));
    }
    out
}

/// Read commands until `quit` or end of input.
///
/// End of input leaves the daemon running; only `quit` requests shutdown.
pub async fn run(view: OverlayView, quit: broadcast::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("console input closed");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "console read failed");
                return;
            }
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if command == Command::Quit {
            tracing::info!("quit requested from console");
            let _ = quit.send(());
            return;
        }
        println!("{}", render(&view, &command));
    }
}

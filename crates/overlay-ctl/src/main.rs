//! overlay-ctl: command-line interface for the overlayd HTTP API.

use anyhow::{Context, Result};

mod cmd;

use cmd::members::{cmd_members, cmd_neighbors};
use cmd::status::{cmd_shutdown, cmd_status};

const DEFAULT_PORT: u16 = 9101;

fn print_usage() {
    println!("overlay-ctl: query a running overlayd");
    println!();
    println!("Usage: overlay-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status      Role, identity and table sizes");
    println!("  members     Registered members (directory only)");
    println!("  neighbors   Current neighbors (node only)");
    println!("  shutdown    Leave the overlay and stop the daemon");
    println!();
    println!("Options:");
    println!("  --port <port>   API port given to overlayd --api-port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd_status(port).await,
        ["members"] => cmd_members(port).await,
        ["neighbors"] => cmd_neighbors(port).await,
        ["shutdown"] => cmd_shutdown(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

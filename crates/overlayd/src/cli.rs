//! Command-line arguments. Flags override the loaded config.

use anyhow::{bail, Context, Result};

use overlay_core::config::OverlayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Directory,
    Node,
}

pub const USAGE: &str = "\
Usage:
  overlayd directory [--port <port>] [--api-port <port>]
  overlayd node [--directory <host:port>] [--name <name>] [--port <port>] [--api-port <port>]";

/// Parse `args` (without the program name), applying flags to `config`.
pub fn parse<I, S>(args: I, config: &mut OverlayConfig) -> Result<Role>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let role = match args.first().map(String::as_str) {
        Some("directory") => Role::Directory,
        Some("node") => Role::Node,
        Some(other) => bail!("unknown role {other:?}\n{USAGE}"),
        None => bail!("missing role\n{USAGE}"),
    };

    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        let mut value = || {
            rest.next()
                .with_context(|| format!("{flag} requires a value"))
                .map(String::as_str)
        };
        match (role, flag.as_str()) {
            (_, "--api-port") => {
                config.api.port = value()?.parse().context("--api-port must be a number")?;
            }
            (Role::Directory, "--port") => {
                config.directory.port = value()?.parse().context("--port must be a number")?;
            }
            (Role::Node, "--port") => {
                config.node.port = value()?.parse().context("--port must be a number")?;
            }
            (Role::Node, "--directory") => config.node.directory = value()?.to_string(),
            (Role::Node, "--name") => config.node.name = value()?.to_string(),
            _ => bail!("unexpected argument {flag:?}\n{USAGE}"),
        }
    }
    Ok(role)
}

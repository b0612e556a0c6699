//! Command handlers exposed to a host dispatcher.
//!
//! The host routes a textual command and the caller's identity here; privileged
//! commands are checked against the configured admin list before any work is done.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{McUpdateError, PermissionError};
use crate::engine::{CycleReport, Engine};
use crate::registry::{AddOutcome, RemoveOutcome};

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// The local operator (CLI). Always privileged.
    Operator,
    /// A host-side identity, e.g. a chat session or user id.
    User(String),
}

impl Caller {
    pub fn user(id: impl Into<String>) -> Self {
        Caller::User(id.into())
    }

    fn id(&self) -> Option<&str> {
        match self {
            Caller::Operator => None,
            Caller::User(id) => Some(id.as_str()),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Operator => f.write_str("operator"),
            Caller::User(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ManualCheck,
    ShowLatest,
    Push(String),
    /// `None` targets the caller's own identifier.
    AddDestination(Option<String>),
    RemoveDestination(Option<String>),
    ListDestinations,
    Status,
}

impl Command {
    /// Parses `manual-check`, `show-latest`, `push-<feed>`, `add-destination [id]`,
    /// `remove-destination [id]`, `list-destinations` and `status`.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let name = parts.next()?;
        let arg = parts.next().map(String::from);

        match name {
            "manual-check" => Some(Command::ManualCheck),
            "show-latest" => Some(Command::ShowLatest),
            "add-destination" => Some(Command::AddDestination(arg)),
            "remove-destination" => Some(Command::RemoveDestination(arg)),
            "list-destinations" => Some(Command::ListDestinations),
            "status" => Some(Command::Status),
            other => other
                .strip_prefix("push-")
                .filter(|feed| !feed.is_empty())
                .map(|feed| Command::Push(feed.to_string())),
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::ManualCheck
                | Command::Push(_)
                | Command::AddDestination(_)
                | Command::RemoveDestination(_)
        )
    }
}

/// Admin allow-list.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    admin_ids: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(admin_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admin_ids: admin_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn authorize(&self, caller: &Caller) -> Result<(), PermissionError> {
        match caller {
            Caller::Operator => Ok(()),
            Caller::User(id) if self.admin_ids.contains(id) => Ok(()),
            Caller::User(id) => Err(PermissionError::Unauthorized(id.clone())),
        }
    }
}

/// Outcome of one command, rendered for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub ok: bool,
    pub text: String,
}

impl Reply {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
        }
    }

    fn fail(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
        }
    }
}

pub struct CommandHandler {
    engine: Arc<Engine>,
    policy: AccessPolicy,
}

impl CommandHandler {
    pub fn new(engine: Arc<Engine>, policy: AccessPolicy) -> Self {
        Self { engine, policy }
    }

    /// Parses and handles one line of text.
    pub async fn dispatch(&self, caller: &Caller, input: &str) -> Reply {
        match Command::parse(input) {
            Some(command) => self.handle(caller, command).await,
            None => Reply::fail(format!("Unknown command: {}", input.trim())),
        }
    }

    pub async fn handle(&self, caller: &Caller, command: Command) -> Reply {
        if command.requires_admin() {
            if let Err(e) = self.policy.authorize(caller) {
                warn!(caller = %caller, command = ?command, "Rejected: {}", e);
                return Reply::fail("Not authorized to run this command");
            }
        }

        match command {
            Command::ManualCheck => {
                let report = self.engine.manual_check().await;
                Reply::ok(render_cycle(&report))
            }
            Command::ShowLatest => self.show_latest().await,
            Command::Push(feed) => self.push(&feed).await,
            Command::AddDestination(id) => {
                let Some(id) = id.or_else(|| caller.id().map(String::from)) else {
                    return Reply::fail("A destination id is required");
                };
                match self.engine.add_destination(&id) {
                    Ok(AddOutcome::Added) => Reply::ok(format!("Added destination {}", id)),
                    Ok(AddOutcome::AlreadyPresent) => {
                        Reply::ok(format!("Destination {} is already registered", id))
                    }
                    Err(e) => {
                        warn!("Failed to add destination {}: {}", id, e);
                        Reply::fail("Could not save the destination list")
                    }
                }
            }
            Command::RemoveDestination(id) => {
                let Some(id) = id.or_else(|| caller.id().map(String::from)) else {
                    return Reply::fail("A destination id is required");
                };
                match self.engine.remove_destination(&id) {
                    Ok(RemoveOutcome::Removed) => Reply::ok(format!("Removed destination {}", id)),
                    Ok(RemoveOutcome::NotPresent) => {
                        Reply::ok(format!("Destination {} is not registered", id))
                    }
                    Err(e) => {
                        warn!("Failed to remove destination {}: {}", id, e);
                        Reply::fail("Could not save the destination list")
                    }
                }
            }
            Command::ListDestinations => {
                let destinations = self.engine.list_destinations();
                if destinations.is_empty() {
                    Reply::ok("No destinations registered")
                } else {
                    Reply::ok(destinations.join("\n"))
                }
            }
            Command::Status => Reply::ok(self.render_status()),
        }
    }

    async fn show_latest(&self) -> Reply {
        let mut lines = Vec::new();
        for entry in self.engine.show_latest().await {
            match entry.result {
                Ok(snapshot) => lines.push(format!(
                    "{}:\n{}\n{}",
                    entry.feed.display_label(),
                    snapshot.display_title(),
                    snapshot.url
                )),
                Err(e) => {
                    warn!(feed = %entry.feed.name, kind = e.kind(), "show-latest fetch failed: {}", e);
                    lines.push(format!(
                        "{}:\n(unavailable: {})",
                        entry.feed.display_label(),
                        e.summary()
                    ));
                }
            }
        }
        Reply::ok(lines.join("\n\n"))
    }

    async fn push(&self, feed: &str) -> Reply {
        match self.engine.push_latest(feed).await {
            Ok(report) if report.attempted() == 0 => {
                Reply::ok("Fetched, but no destinations are registered")
            }
            Ok(report) => {
                info!(feed = %feed, delivered = report.delivered.len(), "Manual push done");
                Reply::ok(format!(
                    "Pushed to {} of {} destinations",
                    report.delivered.len(),
                    report.attempted()
                ))
            }
            Err(McUpdateError::UnknownFeed(name)) => Reply::fail(format!("Unknown feed: {}", name)),
            Err(e) => {
                warn!(feed = %feed, "Push failed: {}", e);
                Reply::fail("Could not fetch the latest article, try again later")
            }
        }
    }

    fn render_status(&self) -> String {
        let status = self.engine.status();
        let versions = self.engine.versions();

        let mut lines = vec![
            format!("State: {}", status.lifecycle),
            format!("Destinations: {}", status.destinations),
        ];
        for feed in self.engine.feeds() {
            let seen = versions
                .get(&feed.name)
                .map(|s| s.display_title().to_string())
                .unwrap_or_else(|| "(nothing recorded)".to_string());
            lines.push(format!("{}: {}", feed.name, seen));
            if let Some(err) = status.last_errors.get(&feed.name) {
                lines.push(format!("  last error: {}", err));
            }
        }
        lines.join("\n")
    }
}

fn render_cycle(report: &CycleReport) -> String {
    let mut text = format!(
        "Check complete: {} checked, {} changed, {} failed",
        report.checked,
        report.changed.len(),
        report.failed.len()
    );
    if report.cancelled {
        text.push_str(" (interrupted by shutdown)");
    }
    text
}

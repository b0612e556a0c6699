use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of the poll engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Stopped,
    Initializing,
    Running,
    Stopping,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Stopped => "stopped",
            Lifecycle::Initializing => "initializing",
            Lifecycle::Running => "running",
            Lifecycle::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of the engine for status reporting.
#[derive(Debug, Clone, Default)]
pub struct PollStatus {
    pub lifecycle: Lifecycle,
    /// Most recent fetch error per feed, cleared on the next success.
    pub last_errors: BTreeMap<String, String>,
    pub destinations: usize,
    pub tracked_feeds: usize,
}

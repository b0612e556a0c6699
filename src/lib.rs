//! # mcupdate
//!
//! Watches the Minecraft feedback help-center sections and broadcasts a message
//! whenever the newest article of a section changes.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → Fetcher → Detector → Notifier → Store
//!                          ↑            ↓
//!                       Version     Destination
//!                       record       registry
//! ```
//!
//! - [`fetcher`]: HTTP client returning the latest-article snapshot of a feed
//! - [`detector`]: field-level comparison of snapshots
//! - [`notifier`]: fan-out of one message to every destination
//! - [`store`]: JSON persistence of versions and destinations
//! - [`daemon`]: the poll loop with cooperative shutdown
//!
//! ## Quick Start
//!
//! ```bash
//! # Poll forever (Ctrl-C to stop)
//! mcupdate run
//!
//! # Register a destination and check once
//! mcupdate destinations add group:123
//! mcupdate check
//!
//! # What is the newest Beta article right now?
//! mcupdate latest
//! ```

/// Application context and error types.
///
/// The [`AppContext`](app::AppContext) struct wires together the fetcher,
/// transport, store, engine, and command handler.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/mcupdate/config.toml`, supporting poll interval,
/// destinations, admin ids, feeds, and the delivery relay.
pub mod config;

/// Background poll loop with graceful shutdown.
pub mod daemon;

/// Change detection between snapshots.
pub mod detector;

/// Core domain models.
///
/// - [`FeedDescriptor`](domain::FeedDescriptor): a named polled endpoint
/// - [`Snapshot`](domain::Snapshot): latest item of a feed
/// - [`VersionRecord`](domain::VersionRecord): last notified snapshot per feed
pub mod domain;

/// The poll–diff–notify engine.
pub mod engine;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Command handlers and caller authorization.
pub mod handlers;

/// Help-center JSON to [`Snapshot`](domain::Snapshot) conversion.
pub mod normalizer;

/// Delivery transports and fan-out.
pub mod notifier;

/// Destination registry.
pub mod registry;

/// State persistence.
///
/// - [`StateStore`](store::StateStore): Trait defining load/save
/// - [`JsonStateStore`](store::JsonStateStore): atomic JSON file implementation
pub mod store;

#[cfg(test)]
mod testing;

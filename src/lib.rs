//! # Gridmenus - Data-Driven Chest Menus for Game Servers
//!
//! Gridmenus turns declarative menu files into interactive grid windows.
//! Each slot can hold several candidate items; requirements decide which one
//! a player sees, and a small action language decides what a click does.
//!
//! ## Features
//!
//! - **Menu Files**: JSON or TOML definitions, sanitized on load and reloadable at runtime.
//! - **Requirements**: permission, money, items, experience, distance, string and numeric
//!   comparisons, plus a sandboxed boolean expression language.
//! - **Action Language**: `[tag] argument` lines with `<delay=N>` and `<chance=P>` modifiers.
//! - **Live Slots**: items flagged for update re-render on a per-menu interval.
//! - **Host Agnostic**: the engine talks to the server only through the [`host`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridmenus::config::Config;
//! use gridmenus::menu::{LoadOptions, MenuEngine, MenuRegistry};
//! use gridmenus::sim::SimHost;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("gridmenus.toml").await?;
//!     let mut registry = MenuRegistry::new(LoadOptions::from(&config.engine));
//!     registry.load_dir(&config.menus.dir).await?;
//!
//!     let mut engine = MenuEngine::new(config.engine, registry);
//!     let mut host = SimHost::new();
//!     let player = host.add_player("Steve");
//!     engine.open_menu(&mut host, player, "main")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`menu`] - definitions, registry, rendering, sessions and the engine
//! - [`requirement`] - requirement blocks, predicates and the expression evaluator
//! - [`action`] - action line parsing and execution
//! - [`host`] - traits a game server implements
//! - [`placeholders`] - `%token%` resolution
//! - [`format`] - lore wrapping and colour carry-over
//! - [`scheduler`] - tick-driven delayed and repeating jobs
//! - [`config`] - configuration management and validation
//! - [`validation`] - menu id and command validation
//! - [`sim`] - in-memory host for previews and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Host server   │ ← events in, side effects out
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   MenuEngine    │ ← sessions, scheduler, actions
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  MenuRegistry   │ ← sanitized definitions
//! └─────────────────┘
//! ```

pub mod action;
pub mod config;
pub mod errors;
pub mod format;
pub mod host;
pub mod logutil;
pub mod menu;
pub mod placeholders;
pub mod requirement;
pub mod scheduler;
pub mod sim;
pub mod validation;

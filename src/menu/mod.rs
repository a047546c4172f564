//! # Menu Module
//!
//! Menu definitions, their loading, and the engine that shows them.
//!
//! - [`types`] / [`slots`] - the sanitized definition model
//! - [`loader`] - JSON/TOML decoding and sanitizing
//! - [`registry`] - id lookup, directory loading and command routing
//! - [`candidates`] - per-slot candidate lists in display order
//! - [`render`] - turning an item entry into an [`crate::host::ItemStack`]
//! - [`session`] - open windows and per-player current/last menu
//! - [`engine`] - the lifecycle driver

pub mod candidates;
pub mod engine;
pub mod loader;
pub mod registry;
pub mod render;
pub mod session;
pub mod slots;
pub mod types;

pub use candidates::{Candidate, CandidateTable};
pub use engine::{
    ClickOutcome, CommandOutcome, MenuEngine, OpenOutcome, ScheduledJob, DISABLED_MESSAGE,
    NO_PERMISSION_MESSAGE,
};
pub use loader::{LoadOptions, MenuFormat};
pub use registry::{CommandRoute, CustomCommand, LoadReport, MenuRegistry};
pub use session::{MenuSession, PlayerMenuState, SessionState};
pub use slots::SlotSpec;
pub use types::{ItemEntry, MaterialSpec, MenuDefinition};

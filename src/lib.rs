//! Outliner library crate
//!
//! An in-memory engine for hierarchical outlines: items carry a status drawn from a
//! configured label list, parents track how many of their children are done, and every
//! change is published as an event. The [`outline::Outline`] engine is UI-agnostic; the
//! [`api`] and [`cli`] modules put an HTTP and command-line surface on top of it.

pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod events;
pub mod labels;
pub mod models;
pub mod operation;
pub mod outline;
pub mod permission;
pub mod popup;
pub mod status;
pub mod tree;

// Re-export commonly used types
pub use config::{Features, OutlineConfig};
pub use events::{EventRecord, OutlineEvent};
pub use labels::{StatusLabel, StatusLabels};
pub use models::{Item, ItemId, ItemRecord, ItemSeed, StatusState, Timestamp};
pub use operation::{Dispatched, Effect, Operation};
pub use outline::{Core, NoOp, Outcome, Outline, OutlineError};
pub use permission::{Action, Rejection};

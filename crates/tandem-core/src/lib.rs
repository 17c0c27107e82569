//! tandem-core - Core library for Tandem
//!
//! This crate holds the typed entities (calendar events, couple goals,
//! relationship milestones and their photos), the remote gateway boundary,
//! the local collection store, the pure view projections and the mutation
//! coordinator that ties them together.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod projection;
pub mod session;
pub mod store;
pub mod util;

pub use config::ClientConfig;
pub use coordinator::{DeleteOutcome, MutationCoordinator, MutationState, MutationTarget};
pub use error::{Error, Result};
pub use models::{Entity, EntityKind, Event, Goal, Milestone, MilestoneType, Photo};
pub use notify::{Notice, Notifier};
pub use session::{Route, Session, SessionHandle};

//! Relation reconciliation.
//!
//! An [`Application`] owns one instance per (component type, relation)
//! pair and keeps that set in sync with each type's relation list.
//!
//! # Passes
//!
//! | Pass | Trigger | Effect |
//! |------|---------|--------|
//! | construction | [`ApplicationBuilder::build`] | instantiates the initial snapshot |
//! | initialization | [`Application::initialize`] | resolves pending instances, runs handlers, calls `initialize` |
//! | refresh | [`Application::refresh`] | closes stale instances, creates and initializes new ones |
//! | close | [`Application::close`] | closes every instance, clears exposures |
//!
//! Passes never overlap. Types are processed in [`Category`] order, then
//! in declaration order. A failing instance is logged and reported in
//! the [`PassReport`]; the pass goes on with the rest.
//!
//! # Retry policy
//!
//! A relation whose construction failed is not retried while it stays
//! listed. Once it leaves the list and comes back, it is constructed
//! again. A failed singleton stays absent until `close` and a new
//! `initialize`.
//!
//! [`Category`]: tessera_types::Category

mod application;
mod builder;
mod component_type;
mod registry;
mod report;

pub use application::{Application, InitArgs};
pub use builder::{ApplicationBuilder, PostConstruct};
pub use component_type::{ComponentType, Constructor, Describe, RelationsProvider};
pub use report::{LifecycleFailure, PassReport, PendingRefresh};

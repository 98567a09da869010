//! # steward-sync
//!
//! Reconciliation engine: drives one repository from its recorded actual
//! state toward the declared desired state through a [`HostingClient`].
//!
//! Every operation is fail-safe. A failed API call is logged and the
//! affected part of the state keeps its previous value, so the next cycle
//! retries it. Nothing here returns an error.
//!
//! [`HostingClient`]: steward_core::HostingClient

mod branches;
mod create;
mod engine;
mod members;
mod properties;

pub use engine::Reconciler;

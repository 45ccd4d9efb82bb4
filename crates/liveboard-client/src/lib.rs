//! Client-side reconciliation of live topic events.
//!
//! Deliberately thin: the reconciler trusts the server's per-topic
//! ordering guarantee and only enforces the gap-aware ordered-apply rule.
//! Everything it cannot do itself — re-render, send control messages,
//! refetch a snapshot — comes back to the embedding UI as [`Action`]s.

pub mod model;
pub mod reconciler;

pub use model::ThreadView;
pub use reconciler::{Action, Reconciler, ViewState};

//! # idv-state — Verification Workflow State Machine
//!
//! The identity-verification workflow as an explicit machine with no I/O:
//! events go in, at most one effect comes out, and the caller (the
//! effect executor in `idv-session`) performs the effect and feeds the
//! settlement back as another event.
//!
//! ```text
//! Intro ─start─▶ CaptureSelfie ─capture─▶ CaptureDocumentFront ─capture─▶ CaptureDocumentBack
//!                     ▲                          │      ▲                      │      │
//!                     └────────── back ──────────┘      └──────── back ────────┘      │
//!                                                                        capture|skip │
//!   Result ◀─settled── Processing ◀───────────────────────────────────────────────────┘
//! ```
//!
//! ## Guards, not flags
//!
//! - The already-verified short-circuit is the settlement of the single
//!   status-query ticket issued at construction.
//! - Submission is the entry action of `Processing`, which is reachable
//!   only from `CaptureDocumentBack` and left only by settling the
//!   outstanding submission ticket. A second submission cannot be issued
//!   until a reset from a non-success `Result`.
//! - Settlements carrying a ticket the machine no longer waits for are
//!   discarded without effect.

pub mod stage;
pub mod store;
pub mod workflow;

pub use stage::WorkflowStage;
pub use store::ArtifactStore;
pub use workflow::{
    StatusCheck, Ticket, VerificationWorkflow, WorkflowEffect, WorkflowError, WorkflowEvent,
};

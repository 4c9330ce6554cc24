//! Email triage core
//!
//! Turns a batch of inbound messages into a ranked list of messages that
//! still need a human reply, and keeps the small amount of state that has to
//! survive between runs.
//!
//! ## Module Organization
//!
//! - `parser`: mailbox dump / fetched records -> `Message`
//! - `correlator`: has this message already been answered?
//! - `classifier`: classifier/categorizer/drafter traits and strict model-output validation
//! - `categories`: sponsorship / business inquiry buckets and the opportunity report
//! - `pipeline`: classify every message, build actionable records, queue deletions
//! - `state`: response history and deletion queue (JSON files)
//! - `ranking`: ordering and topic grouping
//! - `report`: JSON and text reports
//! - `responder`: draft -> review -> send/edit/skip state machine
//! - `mailbox`: mail protocol capabilities the core consumes

pub mod categories;
pub mod classifier;
pub mod correlator;
pub mod error;
pub mod mailbox;
pub mod parser;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod responder;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{ClassificationError, Result, TriageError};
pub use types::{ActionableRecord, Classification, Importance, Message, RawMessage, SentRecord};

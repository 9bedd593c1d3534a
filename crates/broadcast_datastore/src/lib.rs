//! # Broadcast DataStore
//!
//! Persisted state for monitored broadcasts and the contract the
//! processing pipeline uses to claim and update summarization jobs.
//!
//! The store is only ever mutated through `update_job` (single-document
//! patch) or `claim_next_summary_job` (atomic find-and-modify), so status
//! transitions that must be race-free never go through a read-then-write
//! sequence.

mod datastore;
mod domain;

pub use datastore::postgres::PgJobStore;
pub use datastore::{ClaimOutcome, JobPatch, JobStore};
pub use domain::{BroadcastJob, CaptureStatus, JudgedWindow, SummaryStatus};

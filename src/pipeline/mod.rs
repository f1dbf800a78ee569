//! Building blocks the workflow is made of.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ upload ──▶ tools ──▶ inputs ──▶ poll
//! (local)   (upload1)  (pick)    (payload)  (wait)
//!                        │
//!                        └── nothing usable ──▶ convert (local)
//! ```
//!
//! 1. [`input`]: validate the read files before any network call
//! 2. [`upload`]: upload each file and map basenames to dataset ids
//! 3. [`tools`]: keyword tool search and read-input heuristics
//! 4. [`inputs`]: turn the chosen tool and datasets into a run payload
//! 5. [`poll`]: wait for history states or for a FASTA dataset
//! 6. [`convert`]: local FASTQ→FASTA, the last-resort fallback
//!
//! Only `upload` and `poll` touch the network, and only through
//! [`crate::api::GalaxyApi`].

pub mod convert;
pub mod input;
pub mod inputs;
pub mod poll;
pub mod tools;
pub mod upload;

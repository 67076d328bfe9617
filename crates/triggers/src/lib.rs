//! # Triage Triggers
//!
//! Problem-type trigger configuration and whole-word matching.
//!
//! A configuration maps problem type keys to a human readable name plus a list
//! of literal triggers and optional raw regular expressions:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "types": {
//!     "refund": { "name": "Refund requests", "triggers": ["refund", "money back"] }
//!   }
//! }
//! ```
//!
//! The same structure is accepted as TOML. Literal triggers only match whole
//! words, so `refund` does not fire inside `refunding`.
//!
//! ## Example
//!
//! ```
//! use triage_triggers::TriggerSet;
//!
//! let set = TriggerSet::builtin().unwrap();
//! let hits = set.find_matches("i want a refund please", "refund");
//! assert_eq!(hits, vec!["refund".to_string()]);
//! ```

mod config;
mod error;
mod matcher;

pub use error::{Result, TriggerError};
pub use matcher::{ProblemType, ProblemTypeKey, TriggerSet};

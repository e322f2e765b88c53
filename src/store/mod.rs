//! Store Module
//!
//! The authoritative in-memory collection of records.
//!
//! ## Responsibilities
//! - Key uniqueness (insert fails on an existing key)
//! - Ordered iteration by key
//! - Atomic bulk operations (remove_where, replace_all)
//!
//! ## Data Structure Choice
//! One `parking_lot::Mutex` around a `BTreeMap`:
//! - Ordered keys for `show` and snapshot encoding
//! - Every operation, reads included, is mutually exclusive with mutations,
//!   so `values()` is always a consistent snapshot
//! - Record counts are small and nothing under the lock does I/O

mod table;

pub use table::{RecordStore, Replacement};

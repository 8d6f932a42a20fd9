//! Foreign-data-wrapper dispatcher.
//!
//! The host describes a scan as quals (`field op value`) and sort keys; this
//! crate normalizes them into per-column `Bound`s and an order list, runs them
//! against the adapter named in the table options, and hands rows back.
//!
//! ```text
//! host quals / sort keys
//!   │  qual::get_all_bounds + get_bounds
//!   ▼
//! { label -> Bound }, [(label, direction)]
//!   │  Adapter::get_data
//!   ▼
//! Rows ──► host (re-checks every qual)
//! ```
//!
//! Only `= > < >= <=` are pushed down, and only as a conjunction. Other
//! operators are dropped silently, so the host must always re-filter.

pub mod error;
pub mod options;
pub mod qual;
pub mod registry;
pub mod wrapper;

pub use error::FdwError;
pub use options::FdwOptions;
pub use qual::{Qual, SortKey};
pub use registry::{AdapterFactory, Registry};
pub use wrapper::ForeignDataWrapper;

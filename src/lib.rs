//! Copy-on-write shared handles and a structural path navigator.
//!
//! `cow-tree` provides a [`Shared<T>`] smart pointer with refcount-based,
//! copy-on-write ownership, and a [`Cursor`]/[`Trail`] pair for descending
//! into a nested, mostly-shared object graph and materializing just the
//! spine that changes on a write.
//!
//! # Quick start
//!
//! ```
//! use cow_tree::Shared;
//!
//! let a = Shared::make(1);
//! let mut b = a.clone();
//! assert_eq!(a.use_count(), 2);
//!
//! *b.write() = 2;
//! assert_eq!(*a.read(), 1);
//! assert_eq!(*b.read(), 2);
//! assert_eq!(a.use_count(), 1);
//! ```
//!
//! # Navigating into a tree
//!
//! ```
//! use cow_tree::{Shared, Trail};
//!
//! #[derive(Clone)]
//! struct Node {
//!     value: i32,
//!     left: Shared<Node>,
//!     right: Shared<Node>,
//! }
//!
//! let mut root = Shared::make(Node { value: 1, left: Shared::null(), right: Shared::null() });
//! let mut trail = Trail::new(&mut root);
//! trail.push_fn(|n: &Node| Some(&n.left));
//! // `trail` now observes `root.left`, which is null until assigned.
//! assert!(!trail.is_set());
//! ```
//!
//! # Non-goals
//!
//! No allocator customization beyond the host allocator, no weak
//! references, no cycle collection (the object graph must be a DAG), no
//! serialization, no disk persistence, no concurrent mutation of the same
//! logical root, no transactional multi-root updates. See the crate's
//! design notes for the full rationale.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

mod nav;
mod shared;
mod tracing_support;

pub mod cursor;
pub mod trail;

pub use cursor::Cursor;
pub use shared::{dynamic_cast_shared, static_cast_shared, Shared, Subtype};
pub use trail::{make_trail, Trail};

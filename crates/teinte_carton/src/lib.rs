//! Carton - The toolbox shared by every Teinte crate.
//!
//! Holds the small pieces the color engine and the build integration both
//! need: content hashing for cache keys, path normalization for module ids,
//! and re-exports of the collection types used throughout the workspace.
//!
//! # Example
//!
//! ```
//! use teinte_carton::hash::content_hash;
//! use teinte_carton::path::to_posix;
//!
//! assert_eq!(content_hash("a{color:red}").len(), 16);
//! assert_eq!(to_posix("node_modules\\less\\index.js"), "node_modules/less/index.js");
//! ```

pub mod hash;
pub mod path;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

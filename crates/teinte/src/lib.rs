//! # Teinte
//!
//! Theme-scope compilation and preprocessor substitution for front-end
//! bundlers.
//!
//! This crate re-exports the Teinte sub-crates and hosts the `teinte`
//! command line front end.
//!
//! ## Crates
//!
//! - [`carton`] - Hashing, path and collection helpers
//! - [`pigment`] - Color math and theme CSS assembly
//! - [`atelier`] - The engine and the host plugin facade

/// Hashing, path and collection helpers.
pub use teinte_carton as carton;

/// Color math and theme CSS assembly.
pub use teinte_pigment as pigment;

/// Theme engine and host plugin facade.
pub use teinte_atelier as atelier;

pub mod config;

//! # Fastwire Core
//!
//! Core types and error definitions for the Fastwire FAST protocol codec.
//!
//! This crate provides the building blocks shared across all Fastwire crates:
//! - **Error types**: Unified error handling with `thiserror`
//! - **Field values**: The [`FieldValue`] runtime value union

pub mod error;
pub mod value;

pub use error::{DecodeError, EncodeError, FastError, Result, TransportError};
pub use value::FieldValue;

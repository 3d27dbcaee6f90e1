//! Error types and error handling for the front end.
//!
//! This module defines the error types used throughout the pipeline.
//! It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for tokenizing, parsing and tree building
//! - The combined error returned by a build with collected errors
//! - Helpful error messages and suggestions

pub mod errors;

//! Legacy CPU profile parsing.
//!
//! This module handles:
//! - Detecting word width and byte order from the preamble
//! - Parsing the self-describing header
//! - Reading sample records up to the stop sentinel

pub mod cpu_profile;
pub mod framer;
pub mod schema;

// Re-export main types
pub use cpu_profile::{decode, decode_file};
pub use framer::{WordLayout, WordReader, WordWidth};
pub use schema::{Profile, ProfileHeader, StackRecord};

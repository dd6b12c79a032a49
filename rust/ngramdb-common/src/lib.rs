//! Core definitions (error types and argument checks), relied upon by all ngramdb-* crates.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;

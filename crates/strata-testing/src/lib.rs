//! Testing utilities and harness for Strata lists

pub mod document;
pub mod rule;
pub mod sources;

// Re-export testing utilities
pub use document::*;
pub use rule::*;
pub use sources::*;

pub mod prelude {
    pub use crate::document::*;
    pub use crate::rule::*;
    pub use crate::sources::*;
}

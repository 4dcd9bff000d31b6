#![deny(missing_docs)]
//! Canonical types shared by every stencil crate.
//!
//! Providers translate their wire formats to and from these shapes; the
//! structured-output loop only ever sees them.

pub mod error;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::*;
pub use schema::Schema;
pub use traits::*;
pub use types::*;

//! Foundation types for Cascade.
//!
//! Every other Cascade crate depends on `cascade-types`. It holds the two
//! vocabulary types shared by the spec pipeline and the artifact store.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content address of a stored object (BLAKE3 digest)
//! - [`Value`] — Closed tagged value used for opaque frontmatter fields
//! - [`Mapping`] — Ordered string-keyed map of [`Value`]s

pub mod error;
pub mod object;
pub mod value;

pub use error::TypeError;
pub use object::ObjectId;
pub use value::{Mapping, Value};

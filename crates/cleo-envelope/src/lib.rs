//! Response envelope and closed error taxonomy (spec.md §4.14, §6.2–§6.3,
//! §7): every engine invocation produces exactly one `Envelope`, success or
//! error, which serializes to the one JSON document a caller ever sees.

pub mod envelope;
pub mod error;
pub mod meta;
pub mod taxonomy;

pub use envelope::{Envelope, EnvelopeError};
pub use error::{classify, CleoError};
pub use meta::{Alternative, EnvelopeMeta};
pub use taxonomy::{bands, ErrorCode, ErrorKind};

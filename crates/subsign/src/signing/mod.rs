//! Resolution of who signs a document: the investor-side signatories and
//! the platform-side countersigner.

pub mod countersigner;
pub mod signatory;

pub use countersigner::{resolve_countersigner, ResolvedCountersigner};
pub use signatory::{resolve_signatories, ResolvedSignatories};

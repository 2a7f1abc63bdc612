//! Evidence compilers - read-only projections of the request ledger
//!
//! Both compilers are pure functions of the records passed in. Calling them
//! while requests are still in flight yields a partial but internally
//! consistent snapshot; callers that want complete evidence wait for network
//! quiescence first (see `JourneyProbe::finish`).

pub mod har;
pub mod summary;

pub use har::{compile_har, HarArchive, HarEntry, HarLog};
pub use summary::{
    compile_network_summary, compile_network_summary_with, NetworkSummary,
    DEFAULT_SLOW_REQUEST_MS,
};

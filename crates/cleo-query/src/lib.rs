//! Lock-free reads over a task store snapshot (spec.md §4.13): filtered and
//! paginated listing, fuzzy search, single-task lookup with its dependency
//! view, and aggregate/leverage statistics. Nothing here touches disk or
//! locks — callers hand in a snapshot already read by `cleo-store`.

pub mod error;
pub mod filter;
pub mod find;
pub mod show;
pub mod stats;

pub use error::QueryError;
pub use filter::{list, ListQuery, ListResult, SortDirection, SortField};
pub use find::{find, FindMatch};
pub use show::{show, ShowResult};
pub use stats::{leverage, summarize, LeverageEntry, StatsSummary, Tier};

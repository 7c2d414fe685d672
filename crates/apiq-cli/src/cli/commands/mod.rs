//! CLI command handlers, one per file.

mod bulk;
mod call;
mod docs;

pub use bulk::run_bulk;
pub use call::{run_call, CallArgs};
pub use docs::{run_completions, run_manpage};

//! Generic utility primitives with zero domain knowledge.
//!
//! - `shell` - Shell quoting for rendered command lines
//! - `template` - `{{key}}` template rendering

pub mod shell;
pub mod template;

//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `NodeStatus`: lifecycle of a profile in the crawl (pending, in progress, done)
//! - `FlagStatus`: ban summary recorded once when a profile is first discovered

mod flag_status;
mod node_status;

// Re-export main types
pub use flag_status::FlagStatus;
pub use node_status::NodeStatus;

//! Parser framework tests
//!
//! - state: cursor movement, pushback, checkpoints and diagnostic routing

mod state;

//! Host action log schema
//!
//! This module defines the wire shapes of the board action log as the host
//! returns it, and locates the action array inside a response.

mod raw_action;

pub use raw_action::*;

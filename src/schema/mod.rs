//! Session-recording input schema
//!
//! This module defines the raw event format produced by in-page session
//! recorders and the lenient adapter that decodes recordings into it.

mod adapter;
mod raw_event;

pub use adapter::*;
pub use raw_event::*;

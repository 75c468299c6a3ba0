// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod buffer;
pub mod checkpoint;
pub mod classifier;
pub mod error;
pub mod executor;
pub mod progress;
pub mod replay;
pub mod source;

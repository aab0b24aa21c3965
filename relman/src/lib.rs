//! relman library
//!
//! Release manifests pin the commit SHAs and image digests of a set of
//! components so they can be promoted across environments as one unit.

pub mod app;
pub mod collab;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod manager;
pub mod manifest;
pub mod storage;
pub mod utils;

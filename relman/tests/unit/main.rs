//! Manifest lifecycle tests against in-memory collaborators

mod common;
mod test_lifecycle;
mod test_promote;

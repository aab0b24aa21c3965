//! Release manifest documents and their rules

pub mod environment;
pub mod model;
pub mod placeholder;
pub mod store;
pub mod validate;

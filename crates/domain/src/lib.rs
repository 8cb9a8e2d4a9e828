pub mod actor;
pub mod config;
pub mod error;
pub mod hashing;
pub mod types;

pub use actor::{Actor, ActorKind};
pub use error::{Error, Result};

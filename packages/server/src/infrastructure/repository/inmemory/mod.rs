//! InMemory 実装

mod seed;
mod store;

pub use seed::{SeedChat, SeedError, SeedFixture, SeedUser};
pub use store::{DELETED_PLACEHOLDER, InMemoryStore};

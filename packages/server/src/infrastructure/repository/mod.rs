//! Repository 実装
//!
//! - `inmemory`: HashMap をインメモリ DB として使う実装
//! - 将来的に: ドキュメントストア（MongoDB など）実装

pub mod inmemory;

pub use inmemory::{InMemoryStore, SeedError, SeedFixture};

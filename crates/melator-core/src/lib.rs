// Library root: statistics engine and constrained generator for 6/56 draws.
//
// The binary crate and integration tests reach everything through these
// re-exported modules.

pub mod analyzer;
pub mod checker;
pub mod combinations;
pub mod config;
pub mod draw;
pub mod explorer;
pub mod generator;
pub mod ingest;
pub mod pool;
pub mod pulse;
pub mod session;
pub mod stats;
pub mod temperature;

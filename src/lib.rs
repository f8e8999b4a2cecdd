// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Arbiter: insurance-backed oracle dispute engine

pub mod types;
pub mod config;
pub mod ledger;
pub mod token;
pub mod registry;
pub mod access;
pub mod escrow;
pub mod lifecycle;
pub mod condition;
pub mod settlement;
pub mod audit;
pub mod governance;
pub mod events;
pub mod engine;
pub mod shared;

// Browser facade
pub mod wasm;

pub use types::*;
pub use config::{ConfigError, EngineConfig};
pub use engine::{Acceptance, Engine, EngineError, EngineSnapshot, InMemoryEngine, Submission};
pub use shared::SharedEngine;
pub use wasm::WasmEngine;

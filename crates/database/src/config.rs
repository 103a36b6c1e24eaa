//! Database configuration.

use liveq_reactive::{EngineConfig, FlushMode};

/// Configuration for `Database`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    engine: EngineConfig,
}

impl DatabaseConfig {
    /// Creates the default configuration: deferred flushing, 16 rounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flush mode of the live query engine.
    pub fn flush_mode(mut self, mode: FlushMode) -> Self {
        self.engine = self.engine.flush_mode(mode);
        self
    }

    /// Sets the flush round limit of the live query engine.
    pub fn max_flush_rounds(mut self, rounds: usize) -> Self {
        self.engine = self.engine.max_flush_rounds(rounds);
        self
    }

    /// Replaces the whole engine configuration.
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Returns the engine configuration.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }
}

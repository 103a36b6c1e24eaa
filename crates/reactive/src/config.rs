//! Engine configuration.

/// When pending recomputations are drained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlushMode {
    /// Commits only mark queries dirty; the owner calls `flush()`.
    #[default]
    Deferred,
    /// The database facade flushes as soon as each write call returns, and
    /// right after each subscription is registered, so the initial result
    /// arrives before `live_query` returns.
    Immediate,
}

/// Configuration for `ReactiveEngine`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    flush_mode: FlushMode,
    max_flush_rounds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_mode: FlushMode::Deferred,
            max_flush_rounds: 16,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flush mode.
    pub fn flush_mode(mut self, mode: FlushMode) -> Self {
        self.flush_mode = mode;
        self
    }

    /// Sets how many rounds one flush may run before leaving the remaining
    /// work for the next flush. Clamped to at least one.
    pub fn max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds.max(1);
        self
    }

    /// Returns the flush mode.
    pub fn get_flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Returns the flush round limit.
    pub fn get_max_flush_rounds(&self) -> usize {
        self.max_flush_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.get_flush_mode(), FlushMode::Deferred);
        assert_eq!(config.get_max_flush_rounds(), 16);
    }

    #[test]
    fn test_setters() {
        let config = EngineConfig::new()
            .flush_mode(FlushMode::Immediate)
            .max_flush_rounds(0);
        assert_eq!(config.get_flush_mode(), FlushMode::Immediate);
        assert_eq!(config.get_max_flush_rounds(), 1);
    }
}

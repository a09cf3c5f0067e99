//! Runtime configuration and result types.

use crate::Value;

/// Result of executing a compiled program.
#[derive(Debug)]
pub struct ExecResult {
    pub value: Value,
    pub output: String,
}

/// Runtime configuration options.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    /// Smallest integer served from the interned cache.
    pub integer_cache_min: i64,
    /// Largest integer served from the interned cache.
    pub integer_cache_max: i64,
    /// Method activations deeper than this raise `SystemStackError`.
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            integer_cache_min: -1000,
            integer_cache_max: 1000,
            max_call_depth: 1_000,
        }
    }
}

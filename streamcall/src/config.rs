//! Configuration structures for callers and dispatchers.

/// How a [`Caller`](crate::Caller) draws request identifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdStrategy {
    /// 122 random bits formatted as a UUID-v4-shaped token.
    #[default]
    Uuid,

    /// 53 random bits formatted as 20 zero-padded hex digits.
    ///
    /// Cheaper to produce, but collisions become plausible with very many
    /// concurrently open calls.
    Compact,
}

/// Configuration for the caller side of a channel.
#[derive(Clone, Debug, Default)]
pub struct CallerConfig {
    /// Request identifier strategy.
    pub id_strategy: IdStrategy,
}

impl CallerConfig {
    /// Create a configuration with the given identifier strategy.
    pub fn new(id_strategy: IdStrategy) -> Self {
        Self { id_strategy }
    }

    /// Use the given identifier strategy.
    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }
}

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Clone, Debug, Default)]
pub struct DispatcherConfig {
    /// Maximum number of redirects a single request may follow.
    ///
    /// None means unlimited redirects.
    pub max_redirects: Option<u32>,
}

impl DispatcherConfig {
    /// Create a configuration with the given redirect limit.
    pub fn new(max_redirects: Option<u32>) -> Self {
        Self { max_redirects }
    }

    /// Cap the number of redirects per request.
    pub fn with_max_redirects(mut self, limit: u32) -> Self {
        self.max_redirects = Some(limit);
        self
    }
}

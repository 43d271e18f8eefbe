//! Retry policy for reconnection.
//!
//! A policy is attached per `connect` call. Without one, the first transport
//! failure terminates the connection. With one, failures put the manager
//! into `Reconnecting`, wait out the delay strategy, and open a fresh
//! transport, up to the configured retry budget. The per-outage attempt
//! counter resets whenever an open succeeds.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Delay applied between attempts when none is configured.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// RetryDelay
// ============================================================================

/// Strategy producing the delay before each retry attempt.
pub enum RetryDelay {
    /// The same delay before every attempt.
    Fixed(Duration),

    /// Computed from the triggering error and the 1-based attempt number,
    /// e.g. for exponential backoff or error-dependent pacing.
    Custom(Box<dyn Fn(&Error, u32) -> Duration + Send + Sync>),
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Controls reconnection behavior for one `connect` call.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use ws_conduit::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .with_max_retries(5)
///     .with_fixed_delay(Duration::from_millis(250))
///     .with_on_success(|| println!("reconnected"));
/// ```
pub struct RetryPolicy {
    max_retries: Option<u32>,
    delay: RetryDelay,
    on_success: Option<Box<dyn Fn() + Send + Sync>>,
}

// ============================================================================
// Constructors & Builder Methods
// ============================================================================

impl RetryPolicy {
    /// Creates a policy with unbounded retries and a fixed 1s delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_retries: None,
            delay: RetryDelay::Fixed(DEFAULT_RETRY_DELAY),
            on_success: None,
        }
    }

    /// Bounds the number of retries per outage.
    ///
    /// The counter resets once a reconnection attempt succeeds.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Uses the same delay before every attempt.
    #[must_use]
    pub fn with_fixed_delay(mut self, delay: Duration) -> Self {
        self.delay = RetryDelay::Fixed(delay);
        self
    }

    /// Computes the delay from the triggering error and attempt number.
    #[must_use]
    pub fn with_delay_fn(
        mut self,
        delay_fn: impl Fn(&Error, u32) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = RetryDelay::Custom(Box::new(delay_fn));
        self
    }

    /// Invoked exactly once each time a reconnection attempt succeeds after
    /// at least one failure. Never invoked for the initial connection.
    #[must_use]
    pub fn with_on_success(mut self, on_success: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(on_success));
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .field("on_success", &self.on_success.as_ref().map(|_| ".."))
            .finish()
    }
}

// ============================================================================
// Worker Hooks
// ============================================================================

impl RetryPolicy {
    /// Returns `true` when `attempt` (1-based) exceeds the retry budget.
    pub(crate) fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_retries.is_some_and(|max| attempt > max)
    }

    /// Computes the delay before the given attempt.
    pub(crate) fn delay_for(&self, error: &Error, attempt: u32) -> Duration {
        match &self.delay {
            RetryDelay::Fixed(delay) => *delay,
            RetryDelay::Custom(delay_fn) => delay_fn(error, attempt),
        }
    }

    /// Fires the reconnection-success callback, if configured.
    pub(crate) fn notify_success(&self) {
        if let Some(on_success) = &self.on_success {
            on_success();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

use super::Runtime;

/// Default number of tasks polled between two timer sweeps.
const DEFAULT_EVENT_INTERVAL: usize = 61;

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .event_interval(16)
///     .stall_detection(true)
///     .build();
/// ```
pub struct RuntimeBuilder {
    /// Tasks polled between two timer sweeps.
    event_interval: usize,

    /// Whether a guaranteed deadlock panics instead of parking forever.
    stall_detection: bool,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            event_interval: DEFAULT_EVENT_INTERVAL,
            stall_detection: false,
        }
    }

    /// Sets how many tasks are polled before timers are checked again.
    ///
    /// Lower values make timers fire closer to their deadline under load;
    /// higher values favour throughput.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_interval(mut self, n: usize) -> Self {
        assert!(n > 0, "event_interval must be > 0");

        self.event_interval = n;
        self
    }

    /// Enables or disables stall detection.
    ///
    /// With stall detection on, [`Runtime::block_on`] panics when the root
    /// future is pending, no task is runnable and no timer is armed. On a
    /// single thread this means a deadlock, for example a task waiting on a
    /// lock whose guard is never released.
    ///
    /// Leave it off when tasks are woken from other threads.
    pub fn stall_detection(mut self, enabled: bool) -> Self {
        self.stall_detection = enabled;
        self
    }

    /// Builds the runtime with the configured options.
    pub fn build(self) -> Runtime {
        Runtime::new(self.event_interval, self.stall_detection)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Timing knobs shared by the locator, the executors and the scanner.

use std::time::Duration;

/// Bounded-retry policy applied to whole actions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Every suspension point in the engine is a bounded poll configured here;
/// exceeding a window always degrades to a failed attempt, never a hang.
/// Tests substitute millisecond-scale values to compress time.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Ceiling for locating an element.
    pub wait_window: Duration,
    /// Interval between lookup polls.
    pub poll_interval: Duration,
    /// Settle delay after scrolling an element into view; some widgets only
    /// attach listeners once in-viewport.
    pub settle: Duration,
    /// Window for transient state confirmations (popup expanded, options
    /// rendered).
    pub confirm_window: Duration,
    /// Settle delay after a click that may navigate or mutate the DOM.
    pub post_click_settle: Duration,
    pub retry: RetryPolicy,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            wait_window: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            settle: Duration::from_millis(300),
            confirm_window: Duration::from_secs(3),
            post_click_settle: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

impl Pacing {
    /// Uniformly scaled-down pacing for tests.
    pub fn fast() -> Self {
        Self {
            wait_window: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
            settle: Duration::from_millis(1),
            confirm_window: Duration::from_millis(20),
            post_click_settle: Duration::from_millis(1),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(2),
            },
        }
    }
}

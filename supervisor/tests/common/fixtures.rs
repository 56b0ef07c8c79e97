//! Node scripts and timings used across the integration suites

use std::time::Duration;

use supervisor::StartupTimings;

pub struct TestFixtures;

impl TestFixtures {
    pub const ENTRYPOINT: &'static str = "main.sh";
    pub const INTERPRETER: &'static str = "sh";

    /// Announces itself in the log and then idles until terminated
    pub const WELL_BEHAVED: &'static str = "echo \"node $NODE_ID ($NODE_NAME) on port $PORT\"\nexec sleep 30\n";

    /// Ignores SIGTERM so only a forced kill ends it
    pub const IGNORES_TERM: &'static str = "trap '' TERM\necho started\nexec sleep 30\n";

    pub const GRACE_PERIOD: Duration = Duration::from_millis(500);

    /// Readiness window long enough for a few polls, short enough for CI
    pub fn fast_timings() -> StartupTimings {
        StartupTimings {
            dependency_delay: Duration::from_millis(50),
            primary_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
            max_wait: Duration::from_millis(800),
            probe_timeout: Duration::from_millis(200),
        }
    }
}

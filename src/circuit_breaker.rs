use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Consecutive failed writes before the archive is considered down.
pub const ARCHIVE_FAILURE_THRESHOLD: u32 = 5;
const ARCHIVE_BACKOFF_MIN: Duration = Duration::from_secs(10);
const ARCHIVE_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Breaker in front of the Postgres report archive.
pub type ArchiveBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Builds the archive breaker.
///
/// After [`ARCHIVE_FAILURE_THRESHOLD`] consecutive failures every write is
/// rejected without touching the pool. The breaker half-opens after an
/// exponential backoff (10s growing to 60s) and closes again on the first
/// successful write. Lookups never wait on a dead database.
pub fn archive_breaker() -> ArchiveBreaker {
    let backoff = backoff::exponential(ARCHIVE_BACKOFF_MIN, ARCHIVE_BACKOFF_MAX);
    let policy = failure_policy::consecutive_failures(ARCHIVE_FAILURE_THRESHOLD, backoff);
    Config::new().failure_policy(policy).build()
}

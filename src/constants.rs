/// Context string of every commit status the bot publishes. External
/// observers key off this value.
pub const STATUS_CONTEXT: &str = "homu";

/// Synthetic builder name used when a repository is driven by a
/// token-authenticated CI instead of Buildbot.
pub const TRAVIS_BUILDER: &str = "travis";

/// Reason attached to a Buildbot stop request issued by `force`.
pub const STOP_BUILD_REASON: &str = "Interrupted by Homu";

/// Cadence of the background mergeability refresh, in seconds.
pub const MERGEABILITY_TICK_SECS: u64 = 60;

//! Log channel naming.
//!
//! Build workers publish log lines on `logs:<project-id>`. The relay
//! subscribes once to [`LOG_CHANNEL_PATTERN`] and routes each message to
//! the room named after the full channel.

use crate::ids::ProjectId;

/// Prefix shared by every project log channel.
pub const LOG_CHANNEL_PREFIX: &str = "logs:";

/// Pattern subscription covering every project's log channel.
pub const LOG_CHANNEL_PATTERN: &str = "logs:*";

/// Channel name on which the build worker for `id` publishes its logs.
pub fn log_channel(id: &ProjectId) -> String {
    format!("{LOG_CHANNEL_PREFIX}{id}")
}

/// Extract the project part of a log channel name.
///
/// Returns `None` for channels outside the `logs:` namespace or with an
/// empty project part.
pub fn project_of_channel(channel: &str) -> Option<&str> {
    channel
        .strip_prefix(LOG_CHANNEL_PREFIX)
        .filter(|project| !project.is_empty())
}

/// Whether `channel` is a project log channel the relay should route.
pub fn is_log_channel(channel: &str) -> bool {
    project_of_channel(channel).is_some()
}

/// Format whole seconds as `MM:SS` for the recording display.
///
/// Minutes are not wrapped, so 3600 seconds renders as `60:00`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Seconds left before auto-stop, saturating at zero.
pub fn remaining_secs(elapsed_secs: u64, max_duration_secs: u64) -> u64 {
    max_duration_secs.saturating_sub(elapsed_secs)
}

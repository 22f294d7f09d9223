//! Helpers for reading failures out of multi-statement SurrealDB responses.

/// Messages SurrealDB uses when a transaction lost a race and may be replayed:
/// a commit conflict, or a unique index hit by two appends reading the same counter.
const RETRYABLE_MARKERS: [&str; 3] = [
    "can be retried",
    "read or write conflict",
    "already contains",
];

/// Text thrown by the step at index `step` of a transfer.
///
/// The step index travels with the message so the caller can tell which
/// account refused the posting.
pub fn thrown_marker(marker: &str, step: usize) -> String {
    format!("{marker}#{step}")
}

/// Finds the first of `markers` thrown in `message` and the step index attached to it.
pub fn parse_thrown_step<'m>(message: &str, markers: &[&'m str]) -> Option<(&'m str, usize)> {
    markers.iter().find_map(|marker| {
        let prefix = format!("{marker}#");
        let start = message.find(&prefix)? + prefix.len();
        let digits: String = message[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<usize>().ok().map(|step| (*marker, step))
    })
}

pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_MARKERS.iter().any(|m| message.contains(m))
}

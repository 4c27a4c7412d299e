//! Error formatting helpers.

use std::error::Error;

/// Flattens an error and its sources into one line.
///
/// HTTP and AMQP clients keep the useful cause (refused, timed out, DNS) in
/// the source chain rather than in the top-level message.
pub fn describe(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

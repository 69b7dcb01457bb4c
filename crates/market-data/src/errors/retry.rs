/// Classification for what a caller should do after a failed fetch.
///
/// The core never retries on its own beyond the crumb and quote retries it
/// already performs. This tells the UI boundary which explicit user action
/// makes sense next.
///
/// # Behavior Summary
///
/// | Class | Retry later? | Reset session first? |
/// |-------|--------------|----------------------|
/// | `Never` | No | No |
/// | `AfterBackoff` | Yes, after waiting | No |
/// | `ResetSession` | Yes | Yes |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Retrying the same request won't help (bad option, malformed response).
    Never,

    /// The upstream is throttling or slow. Wait, raise the cache TTL or
    /// shrink the chunk size before trying again.
    AfterBackoff,

    /// Cookies or crumb are likely unusable. A session reset followed by a
    /// forced refresh is the best next step.
    ResetSession,
}

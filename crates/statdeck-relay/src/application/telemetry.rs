//! Where the relay's `stats` samples come from.

/// One telemetry reading per call.
///
/// The relay loop calls [`sample`](Self::sample) on every stats tick and
/// sends the returned object as the `data` of a `stats` message.  The shape
/// of the object is up to the source; the display renders whatever keys its
/// layout references.
pub trait StatsSource: Send {
    fn sample(&mut self) -> serde_json::Value;
}

use chrono::{DateTime, Utc};

/// Identity and ordering of one telemetry entry.
///
/// Two records with the same `record_id` are the same logical event no
/// matter which delivery path produced them.
pub trait StreamRecord: Clone + PartialEq + Send + Sync + 'static {
    /// Identifier, unique within its stream.
    fn record_id(&self) -> String;

    /// Backend-assigned monotonic sequence, if the stream has one.
    fn sequence(&self) -> Option<u64> {
        None
    }

    /// Event time, used as the secondary ordering key.
    fn timestamp(&self) -> DateTime<Utc>;
}

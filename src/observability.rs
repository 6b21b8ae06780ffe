use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatstream.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatstream.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatstream.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("chatstream.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatstream.stream.errors");
pub(crate) static STREAM_ABORTS: Counter = Counter::new("chatstream.stream.aborts");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatstream.stream.bytes");
pub(crate) static STREAM_MALFORMED_RECORDS: Counter =
    Counter::new("chatstream.stream.malformed_records");
pub(crate) static STREAM_TRUNCATED_RECORDS: Counter =
    Counter::new("chatstream.stream.truncated_records");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatstream.stream.duration_seconds");

pub(crate) static SESSION_BINDS: Counter = Counter::new("chatstream.session.binds");
pub(crate) static SESSION_IDENTITY_MISMATCHES: Counter =
    Counter::new("chatstream.session.identity_mismatches");
pub(crate) static SESSION_RENAMES: Counter = Counter::new("chatstream.session.renames");
pub(crate) static SESSION_RENAME_ROLLBACKS: Counter =
    Counter::new("chatstream.session.rename_rollbacks");
pub(crate) static SESSION_DELETES: Counter = Counter::new("chatstream.session.deletes");
pub(crate) static SESSION_DELETE_ERRORS: Counter =
    Counter::new("chatstream.session.delete_errors");
pub(crate) static SESSION_EXPORTS: Counter = Counter::new("chatstream.session.exports");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_ABORTS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_MALFORMED_RECORDS);
    collector.register_counter(&STREAM_TRUNCATED_RECORDS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_BINDS);
    collector.register_counter(&SESSION_IDENTITY_MISMATCHES);
    collector.register_counter(&SESSION_RENAMES);
    collector.register_counter(&SESSION_RENAME_ROLLBACKS);
    collector.register_counter(&SESSION_DELETES);
    collector.register_counter(&SESSION_DELETE_ERRORS);
    collector.register_counter(&SESSION_EXPORTS);
}

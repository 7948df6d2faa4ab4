use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current wall-clock time truncated to millisecond precision.
///
/// Block timestamps are stored at millisecond precision so that the RFC 3339
/// form used for hashing and the serialized form always agree.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Canonical RFC 3339 rendering used in hash material (`...T10:00:00.123Z`).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

use chrono::prelude::{DateTime, SecondsFormat, Utc};
use std::time::SystemTime;

/// Formats a timestamp as ISO-8601 in UTC, to the second.
pub fn iso8601(st: SystemTime) -> String {
    let dt: DateTime<Utc> = st.into();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

//! Timestamp conversions for OTLP nanosecond fields

use chrono::{DateTime, Utc};

/// Nanoseconds since the Unix epoch as a UTC timestamp. Values beyond
/// `i64::MAX` fall back to the epoch.
pub fn nanos_to_datetime(nanos: u64) -> DateTime<Utc> {
    match i64::try_from(nanos) {
        Ok(nanos) => DateTime::from_timestamp_nanos(nanos),
        Err(_) => {
            tracing::warn!(nanos, "Timestamp out of range, using epoch");
            DateTime::UNIX_EPOCH
        }
    }
}

/// Convert nanoseconds since Unix epoch to RFC 3339 (nanosecond precision)
pub fn nanos_to_rfc3339(nanos: u64) -> String {
    nanos_to_datetime(nanos).to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_to_datetime() {
        let dt = nanos_to_datetime(1_700_000_000_123_456_789);
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_nanos_to_datetime_zero_is_epoch() {
        assert_eq!(nanos_to_datetime(0), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_nanos_out_of_range_is_epoch() {
        assert_eq!(nanos_to_datetime(u64::MAX), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_nanos_to_rfc3339() {
        assert_eq!(
            nanos_to_rfc3339(1_000_000_000_500_000_000),
            "2001-09-09T01:46:40.500000000Z"
        );
    }
}

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Discriminator value for the connection-acknowledged status message.
pub const MSG_CONNECT: &str = "Connected successfully";
/// Discriminator value for the periodic server pulse.
pub const MSG_PULSE: &str = "Pulse from server";
/// Type tag of the outbound keepalive frame.
pub const MSG_PING: &str = "PING";

/// Raw inbound status record as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFrame {
    pub message: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    pub points_today: f64,
    pub points_total: f64,
}

/// Point totals reported by the server alongside a status message.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsReport {
    pub date: DateTime<Utc>,
    pub points_today: f64,
    pub points_total: f64,
}

impl From<StatusFrame> for PointsReport {
    fn from(frame: StatusFrame) -> Self {
        Self {
            date: frame.date,
            points_today: frame.points_today,
            points_total: frame.points_total,
        }
    }
}

/// Decoded server event delivered to the connection state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Server acknowledged the connection
    Connected(PointsReport),
    /// Periodic server pulse
    Pulse(PointsReport),
}

/// The service emits `date` either as epoch milliseconds or as an RFC 3339
/// string depending on the message path; accept both.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(String),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {ms}"))),
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_frame_accepts_epoch_millis_date() {
        let frame: StatusFrame = serde_json::from_str(
            r#"{"message":"Pulse from server","date":1700000000000,"pointsToday":12,"pointsTotal":340}"#,
        )
        .unwrap();
        assert_eq!(frame.date.timestamp_millis(), 1_700_000_000_000);
        assert!((frame.points_today - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn status_frame_accepts_rfc3339_date() {
        let frame: StatusFrame = serde_json::from_str(
            r#"{"message":"Connected successfully","date":"2024-11-20T08:30:00Z","pointsToday":1,"pointsTotal":2}"#,
        )
        .unwrap();
        assert_eq!(frame.date.to_rfc3339(), "2024-11-20T08:30:00+00:00");
    }

    #[test]
    fn status_frame_rejects_garbage_date() {
        let result: Result<StatusFrame, _> = serde_json::from_str(
            r#"{"message":"Pulse from server","date":{},"pointsToday":1,"pointsTotal":2}"#,
        );
        assert!(result.is_err());
    }
}

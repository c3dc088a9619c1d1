// Inbound frame decoding - liberal JSON envelope handling
use crate::domain::channel::ChannelId;
use crate::domain::status::DisplayStatus;
use serde_json::Value;

/// A decoded inbound frame, routed to either the data pipeline or the
/// status reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// One batch of channel readings, in wire key order (the registry
    /// sorts them). `None` marks a channel reported without a valid value.
    Data(Vec<(ChannelId, Option<f64>)>),
    /// A status update pushed over the connection.
    Status(DisplayStatus),
}

/// Decode one raw text frame into a typed event.
///
/// The server has used several envelope shapes over time, so decoding is
/// deliberately liberal: the payload is the first non-null of `data`,
/// `message`, or the object itself, and `type: "status"` routes the frame
/// to the reconciler. Anything that is not a structured object with
/// channel-like keys is discarded with a debug log; a malformed frame must
/// never reach the buffer or crash the pipeline.
pub fn decode_frame(raw: &str) -> Option<InboundEvent> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!("discarding unparsable frame: {}", err);
            return None;
        }
    };

    let Value::Object(envelope) = &value else {
        tracing::debug!("discarding non-object frame");
        return None;
    };

    if envelope.get("type").and_then(Value::as_str) == Some("status") {
        return match serde_json::from_value::<DisplayStatus>(value.clone()) {
            Ok(status) => Some(InboundEvent::Status(status)),
            Err(err) => {
                tracing::debug!("discarding malformed status frame: {}", err);
                None
            }
        };
    }

    // Envelope priority: data, then message, then the bare object.
    let payload = [envelope.get("data"), envelope.get("message")]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .unwrap_or(&value);

    let Value::Object(readings) = payload else {
        tracing::debug!("discarding frame with non-object payload");
        return None;
    };

    let mut batch = Vec::with_capacity(readings.len());
    for (key, raw_value) in readings {
        let Some(channel) = ChannelId::parse(key) else {
            tracing::debug!("discarding frame with non-channel key {:?}", key);
            return None;
        };
        let value = match raw_value {
            Value::Null => None,
            Value::Number(n) => n.as_f64(),
            other => {
                tracing::debug!("discarding frame with non-numeric value {:?}", other);
                return None;
            }
        };
        batch.push((channel, value));
    }

    Some(InboundEvent::Data(batch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(event: Option<InboundEvent>) -> Vec<(ChannelId, Option<f64>)> {
        match event {
            Some(InboundEvent::Data(batch)) => batch,
            other => panic!("expected data event, got {:?}", other),
        }
    }

    #[test]
    fn test_three_envelope_shapes_decode_identically() {
        let enveloped = decode_frame(r#"{"data": {"204": 21.883, "205": 22.1}}"#);
        let messaged = decode_frame(r#"{"message": {"204": 21.883, "205": 22.1}}"#);
        let bare = decode_frame(r#"{"204": 21.883, "205": 22.1}"#);

        let expected = vec![
            (ChannelId(204), Some(21.883)),
            (ChannelId(205), Some(22.1)),
        ];
        assert_eq!(data(enveloped), expected);
        assert_eq!(data(messaged), expected);
        assert_eq!(data(bare), expected);
    }

    #[test]
    fn test_typed_data_envelope() {
        let event = decode_frame(r#"{"type": "data", "data": {"204": 21.9}}"#);
        assert_eq!(data(event), vec![(ChannelId(204), Some(21.9))]);
    }

    #[test]
    fn test_null_data_falls_through_to_message() {
        let event = decode_frame(r#"{"data": null, "message": {"204": 1.5}}"#);
        assert_eq!(data(event), vec![(ChannelId(204), Some(1.5))]);
    }

    #[test]
    fn test_null_value_marks_missing_reading() {
        let event = decode_frame(r#"{"data": {"204": null, "205": 22.0}}"#);
        assert_eq!(
            data(event),
            vec![(ChannelId(204), None), (ChannelId(205), Some(22.0))]
        );
    }

    #[test]
    fn test_status_frame_routes_to_reconciler() {
        let event = decode_frame(
            r#"{"type": "status", "measuring": true, "recording": false, "connected": true, "run_number": 3}"#,
        );
        let Some(InboundEvent::Status(status)) = event else {
            panic!("expected status event");
        };
        assert!(status.measuring);
        assert!(status.instrument_connected);
        assert_eq!(status.run_number, 3);
    }

    #[test]
    fn test_non_object_frames_are_discarded() {
        assert_eq!(decode_frame("null"), None);
        assert_eq!(decode_frame("[]"), None);
        assert_eq!(decode_frame("42"), None);
        assert_eq!(decode_frame("\"hello\""), None);
        assert_eq!(decode_frame("not json at all"), None);
    }

    #[test]
    fn test_non_channel_keys_are_discarded() {
        assert_eq!(decode_frame(r#"{"sensor_a": 1.0}"#), None);
        assert_eq!(decode_frame(r#"{"data": {"204": "warm"}}"#), None);
    }
}

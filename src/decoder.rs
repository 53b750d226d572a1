//! # Frame Decoder Module
//!
//! Turns raw transport payloads into `Sample`s and encodes outbound commands.
//!
//! Decoding is fail-open: a payload that is not a JSON object yields `None`,
//! gets a debug log line, and the stream carries on. Inside an object every
//! known key is read on its own; a key with the wrong type is treated as
//! absent and never costs the other fields of the frame.

use crate::sample::{DeviceCommand, Sample};
use serde_json::{Map, Value};

/// Parse one frame payload. Returns `None` for anything that is not a
/// JSON object.
pub fn decode_frame(payload: &str) -> Option<Sample> {
    let value: Value = match serde_json::from_str(payload.trim()) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Dropping malformed frame ({}): {:?}", e, payload);
            return None;
        }
    };

    let Value::Object(fields) = value else {
        log::debug!("Dropping non-object frame: {:?}", payload);
        return None;
    };

    let sample = Sample {
        waveform: fields.get("ir").and_then(waveform_points),
        heart_rate: number(&fields, "bpm"),
        spo2: number(&fields, "spo2"),
        hrv: number(&fields, "hrv"),
        perfusion_index: number(&fields, "pi"),
        temperature: number(&fields, "temp"),
        confidence: number(&fields, "conf"),
        status: fields.get("status").and_then(Value::as_str).map(str::to_owned),
        signal_strength: number(&fields, "rssi").map(|rssi| rssi.round() as i32),
    };

    if sample.is_empty() {
        log::trace!("Frame carried no usable known keys");
    }
    Some(sample)
}

/// Numeric field; `null`, a missing key, or a non-number all read as absent
fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = fields.get(key)?;
    let number = value.as_f64();
    if number.is_none() && !value.is_null() {
        log::debug!("Ignoring non-numeric {:?}: {}", key, value);
    }
    number
}

/// `ir` is one number or a batch; non-numeric batch entries are skipped
fn waveform_points(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| vec![v]),
        Value::Array(items) => Some(items.iter().filter_map(Value::as_f64).collect()),
        Value::Null => None,
        other => {
            log::debug!("Ignoring non-numeric \"ir\": {}", other);
            None
        }
    }
}

/// Serialize a command for the socket
pub fn encode_command(command: &DeviceCommand) -> String {
    // A derived Serialize on a plain enum of u8 fields cannot fail
    serde_json::to_string(command).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_frame() {
        let sample = decode_frame(
            r#"{"ir":[90000,90100],"bpm":72,"spo2":98.4,"hrv":41.2,"pi":1.23,"temp":31.5,"status":"Pulse Acquired","rssi":-60,"conf":88}"#,
        )
        .expect("valid frame");

        assert_eq!(sample.waveform, Some(vec![90000.0, 90100.0]));
        assert_eq!(sample.heart_rate, Some(72.0));
        assert_eq!(sample.spo2, Some(98.4));
        assert_eq!(sample.hrv, Some(41.2));
        assert_eq!(sample.perfusion_index, Some(1.23));
        assert_eq!(sample.temperature, Some(31.5));
        assert_eq!(sample.status.as_deref(), Some("Pulse Acquired"));
        assert_eq!(sample.signal_strength, Some(-60));
        assert_eq!(sample.confidence, Some(88.0));
    }

    #[test]
    fn test_waveform_single_and_batch_keep_raw_values() {
        let single = decode_frame(r#"{"ir":9999.6}"#).expect("valid frame");
        assert_eq!(single.waveform, Some(vec![9999.6]));

        let batch = decode_frame(r#"{"ir":[15000,15100.4,15200]}"#).expect("valid frame");
        assert_eq!(batch.waveform, Some(vec![15000.0, 15100.4, 15200.0]));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let sample = decode_frame(r#"{"bpm":60,"uptime":1234,"fw":"1.2"}"#).expect("valid frame");
        assert_eq!(sample.heart_rate, Some(60.0));
    }

    #[test]
    fn test_null_means_absent() {
        let sample = decode_frame(r#"{"bpm":null,"spo2":97,"ir":null}"#).expect("valid frame");
        assert_eq!(sample.heart_rate, None);
        assert_eq!(sample.waveform, None);
        assert_eq!(sample.spo2, Some(97.0));
    }

    #[test]
    fn test_wrong_typed_key_only_drops_that_field() {
        let sample = decode_frame(r#"{"bpm":72,"spo2":98.4,"rssi":"n/a","status":5}"#).expect("valid frame");
        assert_eq!(sample.heart_rate, Some(72.0));
        assert_eq!(sample.spo2, Some(98.4));
        assert_eq!(sample.signal_strength, None);
        assert_eq!(sample.status, None);

        let sample = decode_frame(r#"{"bpm":"fast","ir":"high"}"#).expect("valid frame");
        assert!(sample.is_empty());
    }

    #[test]
    fn test_non_numeric_waveform_entries_are_skipped() {
        let sample = decode_frame(r#"{"ir":[90000,null,"x",90100],"bpm":70}"#).expect("valid frame");
        assert_eq!(sample.waveform, Some(vec![90000.0, 90100.0]));
        assert_eq!(sample.heart_rate, Some(70.0));
    }

    #[test]
    fn test_rssi_rounds_to_integer() {
        let sample = decode_frame(r#"{"rssi":-67.4}"#).expect("valid frame");
        assert_eq!(sample.signal_strength, Some(-67));
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        assert!(decode_frame("").is_none());
        assert!(decode_frame("{\"bpm\":72").is_none());
        assert!(decode_frame("not json").is_none());
        assert!(decode_frame("42").is_none());
        assert!(decode_frame("[]").is_none());
    }

    #[test]
    fn test_empty_object_is_valid() {
        let sample = decode_frame("{}").expect("valid frame");
        assert!(sample.is_empty());
    }

    #[test]
    fn test_encode_frequency_command() {
        assert_eq!(encode_command(&DeviceCommand::set_frequency(50)), r#"{"freq":50}"#);
    }
}

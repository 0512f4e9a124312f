//! Motion/occupancy sensor payloads.
//!
//! Sensors publish either a bare state (`ON`, `false`, ...) or a Zigbee2MQTT
//! style JSON object such as
//! `{"occupancy": true, "battery": 100, "illuminance": 42, "linkquality": 120}`.

/// JSON keys checked for the sensor state, in order.
const STATE_KEYS: &[&str] = &["occupancy", "motion", "presence", "contact", "state"];

fn parse_bare_state(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "detected" => Some(true),
        "off" | "false" | "0" | "clear" => Some(false),
        _ => None,
    }
}

fn parse_json_state(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => parse_bare_state(s),
        serde_json::Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Extract whether a binary sensor is active from an MQTT payload.
///
/// Returns `None` if the payload carries no recognisable state.
pub fn parse_sensor_state(payload: &[u8]) -> Option<bool> {
    let text = std::str::from_utf8(payload).ok()?;

    if let Some(on) = parse_bare_state(text) {
        return Some(on);
    }

    let json: serde_json::Value = serde_json::from_str(text).ok()?;
    if let Some(object) = json.as_object() {
        return STATE_KEYS
            .iter()
            .find_map(|key| object.get(*key))
            .and_then(parse_json_state);
    }
    parse_json_state(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_payloads() {
        assert_eq!(parse_sensor_state(b"ON"), Some(true));
        assert_eq!(parse_sensor_state(b"off"), Some(false));
        assert_eq!(parse_sensor_state(b"true\n"), Some(true));
        assert_eq!(parse_sensor_state(b"0"), Some(false));
        assert_eq!(parse_sensor_state(b"unavailable"), None);
    }

    #[test]
    fn test_zigbee2mqtt_occupancy() {
        let payload =
            br#"{"occupancy": true, "battery": 95, "illuminance": 42, "linkquality": 120}"#;
        assert_eq!(parse_sensor_state(payload), Some(true));

        let payload = br#"{"occupancy": false, "battery": 100}"#;
        assert_eq!(parse_sensor_state(payload), Some(false));
    }

    #[test]
    fn test_fallback_to_state_key() {
        assert_eq!(parse_sensor_state(br#"{"state": "ON"}"#), Some(true));
        assert_eq!(parse_sensor_state(br#"{"state": "OFF"}"#), Some(false));
    }

    #[test]
    fn test_no_state() {
        assert_eq!(parse_sensor_state(br#"{"battery": 100}"#), None);
        assert_eq!(parse_sensor_state(&[0xff, 0xfe]), None);
    }
}

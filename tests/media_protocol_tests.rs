use base64::Engine;
use call_relay::media::{encode_outbound, InboundMessage, MediaEvent, OutboundMedia};

#[test]
fn test_start_frame_parsing() {
    let json = r#"{
        "event": "start",
        "sequenceNumber": "1",
        "start": {
            "accountSid": "AC123",
            "streamSid": "MZ456",
            "callSid": "CA789",
            "tracks": ["inbound"],
            "mediaFormat": { "encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1 }
        },
        "streamSid": "MZ456"
    }"#;

    let event = MediaEvent::parse(json).unwrap();
    assert_eq!(
        event,
        Some(MediaEvent::Start {
            stream_sid: "MZ456".to_string(),
            call_sid: "CA789".to_string(),
        })
    );
}

#[test]
fn test_media_frame_decodes_payload() {
    let payload = base64::engine::general_purpose::STANDARD.encode([0xFFu8, 0x7F, 0x00]);
    let json = format!(
        r#"{{"event":"media","sequenceNumber":"3","media":{{"track":"inbound","chunk":"1","timestamp":"5","payload":"{}"}},"streamSid":"MZ456"}}"#,
        payload
    );

    let event = MediaEvent::parse(&json).unwrap();
    assert_eq!(event, Some(MediaEvent::Media(vec![0xFF, 0x7F, 0x00])));
}

#[test]
fn test_connected_and_stop_frames() {
    let connected = r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#;
    assert_eq!(MediaEvent::parse(connected).unwrap(), Some(MediaEvent::Connected));

    let stop = r#"{"event":"stop","sequenceNumber":"5","stop":{"callSid":"CA789"},"streamSid":"MZ456"}"#;
    assert_eq!(MediaEvent::parse(stop).unwrap(), Some(MediaEvent::Stop));
}

#[test]
fn test_unknown_event_is_ignored() {
    let mark = r#"{"event":"mark","streamSid":"MZ456","mark":{"name":"done"}}"#;
    assert_eq!(MediaEvent::parse(mark).unwrap(), None);

    let msg: InboundMessage = serde_json::from_str(mark).unwrap();
    assert_eq!(msg, InboundMessage::Unknown);
}

#[test]
fn test_malformed_frames_are_errors() {
    assert!(MediaEvent::parse("not json").is_err());
    assert!(MediaEvent::parse(r#"{"event":"start"}"#).is_err());
    assert!(MediaEvent::parse(r#"{"event":"media","media":{"payload":"@@@"}}"#).is_err());
}

#[test]
fn test_outbound_frame_shape() {
    let json = encode_outbound(&OutboundMedia::mulaw("MZ456", &[1, 2, 3])).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["event"], "media");
    assert_eq!(value["streamSid"], "MZ456");
    assert_eq!(
        value["media"]["payload"],
        base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3])
    );

    let frame: OutboundMedia = serde_json::from_str(&json).unwrap();
    assert_eq!(frame.stream_sid, "MZ456");
}

use std::time::{Duration, Instant};
use crate::progress::{SessionEvent, StageSample, TransferSample, UploadSession};
use crate::push::packet::{decode_payload, EnginePacket, SocketPacket};
use crate::{SessionStatus, UploadItem};

/// Pulls `uploadProgress` samples out of a raw polling payload.
fn samples_from_payload(body: &str) -> Vec<StageSample> {
    decode_payload(body)
        .unwrap()
        .into_iter()
        .filter_map(|packet| match packet {
            EnginePacket::Message(data) => match SocketPacket::decode(&data).unwrap() {
                SocketPacket::Event { name, mut args } if name == "uploadProgress" => {
                    Some(serde_json::from_value(args.remove(0)).unwrap())
                }
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[test]
fn test_interleaved_feeds_drive_one_status_line() {
    let t0 = Instant::now();
    let at = |secs: u64| t0 + Duration::from_secs(secs);

    let mut session = UploadSession::new(vec![UploadItem::new("/tmp/v.mp4", "v.mp4", 1000)]);
    session.apply(SessionEvent::Started, t0).unwrap();

    let line = session.apply(SessionEvent::Transfer(TransferSample::new(500, 1000)), at(5)).unwrap();
    assert_eq!(line.message, "Sending to server... 50% • 5s left");

    let first = samples_from_payload(
        "42[\"uploadProgress\",{\"stage\":\"compressing_video\",\"percent\":0}]\u{1e}2",
    );
    let line = session.apply(SessionEvent::Stage(first[0]), at(10)).unwrap();
    assert_eq!(line.message, "Compressing video... 0%");

    // a late transfer sample uses its own clock, origin t0
    let line = session.apply(SessionEvent::Transfer(TransferSample::new(1000, 1000)), at(11)).unwrap();
    assert_eq!(line.message, "Waiting for server...");

    let later = samples_from_payload(
        "42[\"uploadProgress\",{\"stage\":\"compressing_video\",\"percent\":25}]\u{1e}42[\"uploadProgress\",{\"stage\":\"cloud_upload\",\"percent\":10}]",
    );
    // 25% in 20s: 60s to go
    let line = session.apply(SessionEvent::Stage(later[0]), at(30)).unwrap();
    assert_eq!(line.message, "Compressing video... 25% • 1m 0s left");

    // new stage, clock restarts
    let line = session.apply(SessionEvent::Stage(later[1]), at(31)).unwrap();
    assert_eq!(line.message, "Uploading to Cloud... 10%");

    session.apply(SessionEvent::Completed, at(40)).unwrap();
    assert_eq!(session.status(), SessionStatus::Success);
    assert_eq!(session.headline(), "1 items added");
}

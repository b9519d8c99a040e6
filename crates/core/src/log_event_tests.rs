// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

#[test]
fn system_event_has_warn_level_and_system_stream() {
    let e = LogEvent::system(1, Utc::now(), "dropped 3 events".into());
    assert_eq!(e.stream, LogStream::System);
    assert_eq!(e.level, LogLevel::Warn);
    assert!(!e.truncated);
}

#[test]
fn log_event_round_trips_through_json() {
    let e = LogEvent {
        seq: 42,
        ts: Utc::now(),
        stream: LogStream::Stdout,
        level: LogLevel::Info,
        line: "listening on :3000".into(),
        truncated: false,
    };
    let json = serde_json::to_string(&e).expect("serialize");
    let back: LogEvent = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.seq, 42);
    assert_eq!(back.line, "listening on :3000");
}

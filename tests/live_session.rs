use std::io::Write;
use std::time::Duration;

use h10ecg::live::mock::MockSensor;
use h10ecg::live::notification_channel;
use h10ecg::log::discard;
use h10ecg::pmd::{ControlCommand, ControlResponse, ResponseStatus};
use h10ecg::{
    replay_file, CaptureWriter, Delegate, EcgUpdate, LiveSession, Notification, ReplayConfig,
    SessionConfig, SessionError,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Keeps what a plot would draw: the latest update and one label per interval.
#[derive(Default)]
struct Display {
    updates: usize,
    last: Option<EcgUpdate>,
    labels: Vec<String>,
    responses: Vec<ControlResponse>,
}

impl Delegate for Display {
    fn ecg_updated(&mut self, update: &EcgUpdate) {
        self.updates += 1;
        self.labels = update
            .intervals
            .iter()
            .map(|i| format!("{:.0}", i.bpm))
            .collect();
        self.last = Some(update.clone());
    }

    fn control_response(&mut self, response: &ControlResponse) {
        self.responses.push(response.clone());
    }
}

fn drain(mut rx: mpsc::Receiver<ControlCommand>) -> Vec<ControlCommand> {
    let mut commands = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        commands.push(cmd);
    }
    commands
}

#[tokio::test]
async fn session_runs_until_stream_ends() {
    let (tx, notifications) = notification_channel(64);
    let (control_tx, control_rx) = mpsc::channel(4);

    tx.send(Notification::control(vec![0xf0, 0x02, 0x00, 0x00, 0x00]))
        .await
        .unwrap();
    for frame in MockSensor::default().with_noise(20, 5).take(25) {
        tx.send(Notification::data(frame)).await.unwrap();
    }
    tx.send(Notification {
        uuid: Uuid::nil(),
        value: vec![1, 2, 3],
    })
    .await
    .unwrap();
    tx.send(Notification::data(vec![0x00, 0x01])).await.unwrap();
    drop(tx);

    let mut display = Display::default();
    let session = LiveSession::new(SessionConfig::default(), &discard()).unwrap();
    let summary = session
        .run(notifications, control_tx, &mut display)
        .await
        .unwrap();

    assert_eq!(
        drain(control_rx),
        vec![
            ControlCommand::Start {
                sample_rate_hz: 130,
                resolution_bits: 14
            },
            ControlCommand::Stop
        ]
    );
    assert_eq!(summary.frames, 26);
    assert_eq!(summary.dropped_frames, 1);
    assert_eq!(summary.updates, 25);
    assert_eq!(display.updates, 25);
    assert_eq!(display.responses.len(), 1);
    assert_eq!(display.responses[0].status, ResponseStatus::Success);

    let last = display.last.unwrap();
    assert_eq!(last.snapshot.len(), 1300);
    assert!(last.peaks.len() >= 9);
    assert_eq!(display.labels.len(), last.intervals.len());
    assert!(last.intervals.iter().all(|i| (i.bpm - 60.0).abs() < 5.0));
    assert_eq!(summary.last_intervals, last.intervals);
}

#[tokio::test]
async fn session_stops_after_duration() {
    let (tx, notifications) = notification_channel(8);
    let (control_tx, control_rx) = mpsc::channel(4);
    let config = SessionConfig {
        duration: Duration::from_millis(50),
        ..SessionConfig::default()
    };

    let mut display = Display::default();
    let session = LiveSession::new(config, &discard()).unwrap();
    let summary = session
        .run(notifications, control_tx, &mut display)
        .await
        .unwrap();

    assert_eq!(summary.frames, 0);
    assert_eq!(drain(control_rx).last(), Some(&ControlCommand::Stop));
    drop(tx);
}

#[tokio::test]
async fn closed_control_channel_fails_start() {
    let (_tx, notifications) = notification_channel(1);
    let (control_tx, control_rx) = mpsc::channel(1);
    drop(control_rx);

    let session = LiveSession::new(SessionConfig::default(), &discard()).unwrap();
    let err = session
        .run(notifications, control_tx, &mut Display::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ControlClosed("start")));
}

#[tokio::test]
async fn recorded_session_replays_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.bin");
    let file: Box<dyn Write + Send> = Box::new(std::fs::File::create(&path).unwrap());

    let (tx, notifications) = notification_channel(32);
    let (control_tx, _control_rx) = mpsc::channel(4);
    for frame in MockSensor::default().take(12) {
        tx.send(Notification::data(frame)).await.unwrap();
    }
    drop(tx);

    let session = LiveSession::new(SessionConfig::default(), &discard())
        .unwrap()
        .with_recorder(CaptureWriter::new(file).unwrap());
    let mut display = Display::default();
    session
        .run(notifications, control_tx, &mut display)
        .await
        .unwrap();

    let report = replay_file(&path, &ReplayConfig::default(), &discard()).unwrap();
    assert_eq!(report.frames, 12);
    // the live window already holds everything
    assert_eq!(display.last.unwrap().snapshot, report.snapshot);
}

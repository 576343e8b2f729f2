//! Live measurement: frames arrive as notifications, every data frame is
//! decoded into the display window and the whole window is analysed again
//! before the next notification is taken.

use std::io::Write;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use slog::{debug, info, o, warn, Logger};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::analysis::{Analysis, BeatInterval, Parameters, Peak};
use crate::error::{ConfigError, SessionError};
use crate::pmd::{ControlCommand, ControlResponse, FrameDecoder, PMD_CONTROL, PMD_DATA};
use crate::storage::capture::CaptureWriter;
use crate::storage::{SampleStream, Snapshot};

pub mod mock;

/// A characteristic value change, as the transport delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub uuid: Uuid,
    pub value: Vec<u8>,
}

impl Notification {
    pub fn data(value: Vec<u8>) -> Self {
        Self {
            uuid: PMD_DATA,
            value,
        }
    }

    pub fn control(value: Vec<u8>) -> Self {
        Self {
            uuid: PMD_CONTROL,
            value,
        }
    }
}

/// Sender half for the transport and the stream half for `LiveSession::run`.
pub fn notification_channel(buffer: usize) -> (mpsc::Sender<Notification>, ReceiverStream<Notification>) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, ReceiverStream::new(rx))
}

/// Everything a display needs after one data frame.
#[derive(Debug, Clone)]
pub struct EcgUpdate {
    pub snapshot: Snapshot,
    pub peaks: Vec<Peak>,
    pub intervals: Vec<BeatInterval>,
}

impl EcgUpdate {
    pub fn latest_bpm(&self) -> Option<f64> {
        self.intervals.last().map(|i| i.bpm)
    }
}

/// Receives the results of a live session. Any drawing state (plotted
/// markers, HR labels) belongs to the implementor.
pub trait Delegate {
    fn ecg_updated(&mut self, update: &EcgUpdate);

    fn control_response(&mut self, _response: &ControlResponse) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub analysis: Parameters,
    pub display_window_s: f64,
    pub duration: Duration,
    pub resolution_bits: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analysis: Parameters::live(),
            display_window_s: 10.0,
            duration: Duration::from_secs(15),
            resolution_bits: 14,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: usize,
    pub dropped_frames: usize,
    pub updates: usize,
    pub last_intervals: Vec<BeatInterval>,
}

pub struct LiveSession {
    config: SessionConfig,
    start_rate_hz: u16,
    decoder: FrameDecoder,
    stream: SampleStream,
    analysis: Analysis,
    recorder: Option<CaptureWriter<Box<dyn Write + Send>>>,
    summary: SessionSummary,
    log: Logger,
}

impl LiveSession {
    pub fn new(config: SessionConfig, log: &Logger) -> Result<Self, SessionError> {
        let decoder = FrameDecoder::new(config.analysis.sample_rate_hz)?;
        let start_rate_hz = start_rate(config.analysis.sample_rate_hz)?;
        let stream = SampleStream::for_window(config.display_window_s, config.analysis.sample_rate_hz)?;
        let log = log.new(o!("mode" => "live"));
        let analysis = Analysis::new(config.analysis.clone(), &log)?;
        info!(log, "live session ready";
            "sample_rate_hz" => config.analysis.sample_rate_hz,
            "window_samples" => stream.capacity().unwrap_or_default());
        Ok(Self {
            config,
            start_rate_hz,
            decoder,
            stream,
            analysis,
            recorder: None,
            summary: SessionSummary::default(),
            log,
        })
    }

    /// Every data frame is also written to `recorder`, unmodified.
    pub fn with_recorder(mut self, recorder: CaptureWriter<Box<dyn Write + Send>>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn start_command(&self) -> ControlCommand {
        ControlCommand::Start {
            sample_rate_hz: self.start_rate_hz,
            resolution_bits: self.config.resolution_bits,
        }
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Decodes one data frame into the window and analyses the window.
    /// Returns `None` when the frame is dropped or carries no ECG samples.
    pub fn handle_data(&mut self, raw: &[u8]) -> Option<EcgUpdate> {
        self.summary.frames += 1;
        self.record(raw);

        let frame = match self.decoder.decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(self.log, "dropping frame"; "reason" => %e);
                self.summary.dropped_frames += 1;
                return None;
            }
        };
        if frame.samples.is_empty() {
            debug!(self.log, "frame without ECG samples";
                "channel" => ?frame.channel, "frame_type" => ?frame.frame_type);
            return None;
        }

        self.stream.append(&frame);
        let snapshot = self.stream.snapshot();
        let results = self.analysis.analyze(&snapshot);
        debug!(self.log, "frame decoded";
            "samples" => frame.samples.len(), "peaks" => results.peaks.len());
        if let Some(last) = results.intervals.last() {
            info!(self.log, "heart rate";
                "interval_ms" => format!("{:.1}", last.interval_ms()),
                "bpm" => format!("{:.1}", last.bpm));
        }

        self.summary.updates += 1;
        self.summary.last_intervals = results.intervals.clone();
        Some(EcgUpdate {
            snapshot,
            peaks: results.peaks,
            intervals: results.intervals,
        })
    }

    pub fn handle_control(&mut self, raw: &[u8]) -> Option<ControlResponse> {
        match ControlResponse::parse(raw) {
            Ok(response) if response.status.is_ok() => {
                info!(self.log, "control point acknowledged";
                    "op" => ?response.op_code, "status" => ?response.status);
                Some(response)
            }
            Ok(response) => {
                warn!(self.log, "control point error";
                    "op" => ?response.op_code, "status" => ?response.status);
                Some(response)
            }
            Err(e) => {
                warn!(self.log, "unreadable control message"; "reason" => %e);
                None
            }
        }
    }

    fn record(&mut self, raw: &[u8]) {
        if let Some(recorder) = &mut self.recorder {
            if let Err(e) = recorder.write(raw) {
                warn!(self.log, "recording stopped"; "reason" => %e);
                self.recorder = None;
            }
        }
    }

    /// Starts the measurement, handles notifications until the configured
    /// duration has passed or the stream ends, then stops the measurement.
    pub async fn run<S, D>(
        mut self,
        mut notifications: S,
        control: mpsc::Sender<ControlCommand>,
        delegate: &mut D,
    ) -> Result<SessionSummary, SessionError>
    where
        S: Stream<Item = Notification> + Unpin,
        D: Delegate,
    {
        let start = self.start_command();
        control
            .send(start)
            .await
            .map_err(|_| SessionError::ControlClosed(start.name()))?;
        info!(self.log, "measurement started"; "duration_s" => self.config.duration.as_secs_f64());

        let deadline = tokio::time::sleep(self.config.duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!(self.log, "capture duration elapsed");
                    break;
                }
                next = notifications.next() => match next {
                    Some(n) if n.uuid == PMD_DATA => {
                        if let Some(update) = self.handle_data(&n.value) {
                            delegate.ecg_updated(&update);
                        }
                    }
                    Some(n) if n.uuid == PMD_CONTROL => {
                        if let Some(response) = self.handle_control(&n.value) {
                            delegate.control_response(&response);
                        }
                    }
                    Some(n) => debug!(self.log, "ignoring notification"; "uuid" => %n.uuid),
                    None => {
                        info!(self.log, "notification stream ended");
                        break;
                    }
                }
            }
        }

        let stop = ControlCommand::Stop;
        control
            .send(stop)
            .await
            .map_err(|_| SessionError::ControlClosed(stop.name()))?;

        if let Some(recorder) = self.recorder.take() {
            let frames = recorder.frames_written();
            recorder.into_inner()?;
            info!(self.log, "recording closed"; "frames" => frames);
        }
        info!(self.log, "measurement stopped";
            "frames" => self.summary.frames, "dropped" => self.summary.dropped_frames);
        Ok(self.summary)
    }
}

// The start command carries the rate as a whole number of Hz.
fn start_rate(sample_rate_hz: f64) -> Result<u16, ConfigError> {
    u16::try_from(sample_rate_hz.round() as u64)
        .ok()
        .filter(|rate| *rate > 0)
        .ok_or(ConfigError::UnencodableSampleRate(sample_rate_hz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::discard;
    use crate::analysis::MinDistance;
    use crate::pmd::frame::encode_ecg_frame;

    fn session(window_s: f64) -> LiveSession {
        let config = SessionConfig {
            analysis: Parameters {
                min_distance: MinDistance::Fixed(2),
                ..Parameters::live()
            },
            display_window_s: window_s,
            ..SessionConfig::default()
        };
        LiveSession::new(config, &discard()).unwrap()
    }

    #[test]
    fn start_command_uses_configured_rate() {
        let session = session(10.0);
        assert_eq!(
            session.start_command(),
            ControlCommand::Start {
                sample_rate_hz: 130,
                resolution_bits: 14
            }
        );
    }

    #[test]
    fn rejects_rates_the_start_command_cannot_carry() {
        for rate in [70_000.0, 0.2] {
            let config = SessionConfig {
                analysis: Parameters {
                    sample_rate_hz: rate,
                    ..Parameters::live()
                },
                ..SessionConfig::default()
            };
            assert!(matches!(
                LiveSession::new(config, &discard()),
                Err(SessionError::Config(ConfigError::UnencodableSampleRate(_)))
            ));
        }
    }

    #[test]
    fn rejects_oversized_display_window() {
        let config = SessionConfig {
            display_window_s: 1.0e20,
            ..SessionConfig::default()
        };
        assert!(matches!(
            LiveSession::new(config, &discard()),
            Err(SessionError::Config(ConfigError::CapacityTooLarge { .. }))
        ));
    }

    #[test]
    fn malformed_frame_does_not_stop_the_stream() {
        let mut session = session(10.0);
        assert!(session.handle_data(&[0x00, 0x01, 0x02]).is_none());

        let update = session
            .handle_data(&encode_ecg_frame(0, &[0, 50, 0, 0, 60, 0]))
            .unwrap();
        assert_eq!(update.snapshot.len(), 6);
        assert_eq!(update.peaks.len(), 2);
        assert_eq!(update.intervals.len(), 1);
        assert_eq!(session.summary().frames, 2);
        assert_eq!(session.summary().dropped_frames, 1);
    }

    #[test]
    fn window_is_bounded() {
        let mut session = session(0.1);
        let mut update = None;
        for k in 0..5u64 {
            update = session.handle_data(&encode_ecg_frame(k * 100_000_000, &[1; 10]));
        }
        // ceil(0.1 * 130) = 13
        assert_eq!(update.unwrap().snapshot.len(), 13);
    }

    #[test]
    fn flat_window_clears_peaks() {
        let mut session = session(10.0);
        let update = session.handle_data(&encode_ecg_frame(0, &[0; 8])).unwrap();
        assert!(update.peaks.is_empty());
        assert_eq!(update.latest_bpm(), None);
    }

    #[test]
    fn control_errors_are_reported() {
        let mut session = session(10.0);
        let response = session.handle_control(&[0xf0, 0x01, 0x00, 0x0a]).unwrap();
        assert!(!response.status.is_ok());
        assert!(session.handle_control(&[0xf0]).is_none());
    }
}

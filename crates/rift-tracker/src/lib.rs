pub mod fusion;
pub mod protocol;
pub mod types;

use anyhow::Result;
use fusion::{FusionSettings, SensorFusion};
use glam::Quat;
use protocol::ProtocolParser;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use types::Orientation;

/// Source of head orientation for the render loop.
pub trait HeadTracker {
    /// Latest orientation, extrapolated to when the frame will be displayed.
    fn predicted_orientation(&self) -> Quat;

    /// Reset the tracker's drift-correction state so the current pose reads as identity.
    fn reset(&mut self);
}

/// Commands sent to the IMU processing task.
enum ImuCommand {
    Reset,
}

/// Client for the headset IMU.
///
/// Connects to the sensor bridge over TCP, parses the sample stream,
/// runs Madgwick sensor fusion, and publishes the latest orientation.
pub struct ImuClient {
    orientation_rx: watch::Receiver<Orientation>,
    command_tx: mpsc::UnboundedSender<ImuCommand>,
    _task: Option<tokio::task::JoinHandle<()>>,
}

impl ImuClient {
    /// Connect to the sensor bridge at `addr` and start processing.
    pub async fn connect(addr: &str, settings: FusionSettings) -> Result<Self> {
        tracing::info!(%addr, "Connecting to head tracker");

        let stream = TcpStream::connect(addr).await?;
        tracing::info!(%addr, "Connected to head tracker");

        let (orientation_tx, orientation_rx) = watch::channel(Orientation::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(imu_read_loop(stream, orientation_tx, command_rx, settings));

        Ok(Self {
            orientation_rx,
            command_tx,
            _task: Some(task),
        })
    }

    /// Create a client that always reports the identity pose, for running
    /// without a headset attached.
    pub fn mock() -> Self {
        let (_, orientation_rx) = watch::channel(Orientation::default());
        let (command_tx, _) = mpsc::unbounded_channel();
        Self {
            orientation_rx,
            command_tx,
            _task: None,
        }
    }

    /// Get the latest fused orientation (non-blocking).
    pub fn orientation(&self) -> Orientation {
        *self.orientation_rx.borrow()
    }
}

impl HeadTracker for ImuClient {
    fn predicted_orientation(&self) -> Quat {
        self.orientation().quaternion
    }

    fn reset(&mut self) {
        let _ = self.command_tx.send(ImuCommand::Reset);
    }
}

/// Background task: read TCP stream, parse frames, run fusion, publish orientation.
async fn imu_read_loop(
    mut stream: TcpStream,
    orientation_tx: watch::Sender<Orientation>,
    mut command_rx: mpsc::UnboundedReceiver<ImuCommand>,
    settings: FusionSettings,
) {
    let mut parser = ProtocolParser::new();
    let mut fusion = SensorFusion::new(settings);
    let mut buf = [0u8; 4096];
    let mut sample_count: u64 = 0;

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        tracing::warn!("Head tracker connection closed");
                        break;
                    }
                    Ok(n) => {
                        parser.push_data(&buf[..n]);

                        // Drain all available samples.
                        while let Some(result) = parser.next_sample() {
                            match result {
                                Ok(sample) => {
                                    if let Some(orientation) = fusion.update(&sample) {
                                        let _ = orientation_tx.send(orientation);
                                    }
                                    sample_count += 1;
                                    if sample_count % 1000 == 0 {
                                        tracing::debug!(
                                            sample_count,
                                            dropped = parser.dropped(),
                                            "IMU samples processed"
                                        );
                                    }
                                }
                                Err(e) => {
                                    tracing::trace!(?e, "Skipping unusable sensor data");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(?e, "Head tracker read error");
                        break;
                    }
                }
            }
            Some(cmd) = command_rx.recv() => {
                match cmd {
                    ImuCommand::Reset => {
                        fusion.reset();
                        let _ = orientation_tx.send(Orientation {
                            quaternion: fusion.predicted(),
                        });
                    }
                }
            }
        }
    }
}

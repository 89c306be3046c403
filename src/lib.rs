//! Application shell shared by the demo binaries: logging setup, headset
//! window placement and the wgpu device/surface pair.

pub mod gpu;
pub mod window;

pub use gpu::GpuContext;
pub use window::{hmd_window_attributes, select_hmd_monitor, MonitorRect};

use std::path::PathBuf;

/// Fatal start-up failures.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("no monitor contains the headset desktop position ({x}, {y})")]
    NoHmdMonitor { x: i32, y: i32 },
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("failed to load image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

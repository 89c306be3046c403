use crate::ShellError;
use rift_math::HmdInfo;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;
use winit::window::{Fullscreen, Window, WindowAttributes};

/// Desktop rectangle of one monitor, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl MonitorRect {
    pub fn position(&self) -> PhysicalPosition<i32> {
        PhysicalPosition::new(self.x, self.y)
    }

    /// The monitor's current video mode size.
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.width, self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && i64::from(x) < i64::from(self.x) + i64::from(self.width)
            && i64::from(y) < i64::from(self.y) + i64::from(self.height)
    }
}

impl From<&MonitorHandle> for MonitorRect {
    fn from(monitor: &MonitorHandle) -> Self {
        let position = monitor.position();
        let size = monitor.size();
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }
}

/// Index of the monitor containing the headset's desktop position.
pub fn select_hmd_monitor(hmd: &HmdInfo, monitors: &[MonitorRect]) -> Result<usize, ShellError> {
    monitors
        .iter()
        .position(|m| m.contains(hmd.desktop_x, hmd.desktop_y))
        .ok_or(ShellError::NoHmdMonitor {
            x: hmd.desktop_x,
            y: hmd.desktop_y,
        })
}

/// Undecorated window covering the headset display.
pub fn hmd_window_attributes(
    event_loop: &ActiveEventLoop,
    hmd: &HmdInfo,
    fullscreen: bool,
    title: &str,
) -> Result<WindowAttributes, ShellError> {
    let monitors: Vec<MonitorHandle> = event_loop.available_monitors().collect();
    let rects: Vec<MonitorRect> = monitors.iter().map(MonitorRect::from).collect();
    let index = select_hmd_monitor(hmd, &rects)?;
    let monitor = monitors[index].clone();
    let rect = rects[index];

    tracing::info!(
        monitor = ?monitor.name(),
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "Headset display found"
    );

    let mut attrs = Window::default_attributes()
        .with_title(title)
        .with_decorations(false)
        .with_position(rect.position())
        .with_inner_size(rect.size());
    if fullscreen {
        attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, width: u32, height: u32) -> MonitorRect {
        MonitorRect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn picks_monitor_containing_desktop_position() {
        let hmd = HmdInfo::dk1();
        let monitors = [rect(-1920, 0, 1920, 1080), rect(0, 0, 1920, 1080)];
        assert_eq!(select_hmd_monitor(&hmd, &monitors).ok(), Some(1));
    }

    #[test]
    fn window_covers_the_selected_monitor() {
        let monitors = [rect(0, 0, 1920, 1080), rect(1920, 0, 1920, 1200)];
        let hmd = HmdInfo {
            desktop_x: 2000,
            ..HmdInfo::dk1()
        };
        let chosen = monitors[select_hmd_monitor(&hmd, &monitors).unwrap()];
        assert_eq!(chosen.position(), PhysicalPosition::new(1920, 0));
        assert_eq!(chosen.size(), PhysicalSize::new(1920, 1200));
        assert_ne!(chosen.size().width, hmd.h_resolution);
    }

    #[test]
    fn right_and_bottom_edges_are_exclusive() {
        let r = rect(0, 0, 100, 50);
        assert!(r.contains(0, 0));
        assert!(r.contains(99, 49));
        assert!(!r.contains(100, 10));
        assert!(!r.contains(10, 50));
    }

    #[test]
    fn missing_monitor_is_an_error() {
        let hmd = HmdInfo {
            desktop_x: 5000,
            ..HmdInfo::dk1()
        };
        let err = select_hmd_monitor(&hmd, &[rect(0, 0, 1920, 1080)]);
        assert!(matches!(err, Err(ShellError::NoHmdMonitor { x: 5000, y: 100 })));
    }
}

use anyhow::Result;
use rift_config::AppConfig;
use rift_demos::{hmd_window_attributes, init_tracing, GpuContext, ShellError};
use rift_input::KeyAction;
use rift_math::HmdInfo;
use rift_renderer::lens::test_card;
use rift_renderer::{LensCorrectedDisplay, StereoRig};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

const TEST_CARD_SIZE: (u32, u32) = (1024, 768);

/// RGBA8 pixels plus dimensions.
struct Picture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Picture {
    fn load(path: &Path) -> Result<Self, ShellError> {
        let image = image::open(path)
            .map_err(|source| ShellError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        info!(?path, width, height, "Image loaded");
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    fn test_card() -> Self {
        let (width, height) = TEST_CARD_SIZE;
        Self {
            width,
            height,
            pixels: test_card(width, height),
        }
    }
}

struct App {
    hmd: HmdInfo,
    fullscreen: bool,
    picture: Picture,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    fatal: Option<anyhow::Error>,
}

struct GpuState {
    ctx: GpuContext,
    rig: StereoRig,
    display: LensCorrectedDisplay,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = hmd_window_attributes(
            event_loop,
            &self.hmd,
            self.fullscreen,
            "Lens-corrected 2D display",
        )?;
        let window = Arc::new(event_loop.create_window(attrs)?);
        self.window = Some(window.clone());

        let ctx = GpuContext::new(window)?;
        let rig = StereoRig::new(&self.hmd, ctx.size());
        let display = LensCorrectedDisplay::new(
            &ctx.device,
            &ctx.queue,
            ctx.format(),
            &rig,
            self.picture.width,
            self.picture.height,
            &self.picture.pixels,
        );

        self.gpu = Some(GpuState { ctx, rig, display });
        Ok(())
    }

    fn redraw(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let output = match gpu.ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                warn!(?e, "Failed to get surface texture");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let cmd = gpu.display.render(&gpu.ctx.device, &gpu.rig, &view);
        gpu.ctx.queue.submit(std::iter::once(cmd));
        output.present();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            error!(%err, "Fatal error");
            self.fatal = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    if gpu.ctx.resize(size.width, size.height) {
                        gpu.rig.resize(gpu.ctx.size());
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && KeyAction::from_physical(event.physical_key) == Some(KeyAction::Quit)
                {
                    event_loop.exit();
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_tracing("display_lens_corrected=info,rift_demos=info,rift_renderer=info");

    info!("Lens-corrected display starting");

    let config = rift_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    let picture = match &config.display.image_path {
        Some(path) => Picture::load(path).inspect_err(|err| error!(%err, "Fatal error"))?,
        None => {
            info!("No image configured, showing test card");
            Picture::test_card()
        }
    };

    let event_loop = EventLoop::new()?;
    let mut app = App {
        hmd: config.hmd.resolve(),
        fullscreen: config.hmd.fullscreen,
        picture,
        window: None,
        gpu: None,
        fatal: None,
    };
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

use anyhow::Result;
use glam::{Mat3, Mat4, Vec3};
use rift_calibration::{CalibrationSession, SessionEvent, Step};
use rift_config::AppConfig;
use rift_demos::{hmd_window_attributes, init_tracing, GpuContext};
use rift_input::{player_pose, FreeLook, KeyAction};
use rift_math::HmdInfo;
use rift_renderer::{mesh, DrawCall, GpuMesh, PerEyeArgs, StereoRenderer, StereoRig};
use rift_tracker::fusion::FusionSettings;
use rift_tracker::ImuClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

struct App {
    config: AppConfig,
    hmd: HmdInfo,
    session: CalibrationSession<ImuClient>,
    free_look: FreeLook,
    /// Free-look camera-to-world transform, used once calibration is done.
    player: Mat4,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    last_frame: Instant,
    fatal: Option<anyhow::Error>,
}

struct GpuState {
    ctx: GpuContext,
    rig: StereoRig,
    stereo: StereoRenderer,
    meshes: SceneMeshes,
    frame_count: u64,
}

struct SceneMeshes {
    crosshair: GpuMesh,
    grid: GpuMesh,
    cube: GpuMesh,
    skybox: GpuMesh,
}

impl SceneMeshes {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            crosshair: GpuMesh::upload(device, "crosshair", &mesh::crosshair()),
            grid: GpuMesh::upload(device, "grid", &mesh::grid(10, 1.0)),
            cube: GpuMesh::upload(device, "cube", &mesh::color_cube()),
            skybox: GpuMesh::upload(device, "skybox", &mesh::skybox(100.0)),
        }
    }
}

impl App {
    fn new(config: AppConfig, tracker: ImuClient) -> Self {
        let hmd = config.hmd.resolve();
        let free_look = FreeLook::new(config.calibration.move_speed);
        let player = player_pose(config.calibration.camera_start, config.calibration.camera_target);
        Self {
            config,
            hmd,
            session: CalibrationSession::new(tracker),
            free_look,
            player,
            window: None,
            gpu: None,
            last_frame: Instant::now(),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!(%err, "Fatal error");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = hmd_window_attributes(
            event_loop,
            &self.hmd,
            self.config.hmd.fullscreen,
            &title(self.session.step()),
        )?;
        let window = Arc::new(event_loop.create_window(attrs)?);
        self.window = Some(window.clone());

        let ctx = GpuContext::new(window)?;
        let rig = StereoRig::new(&self.hmd, ctx.size());
        let stereo = StereoRenderer::new(&ctx.device, ctx.format(), &rig);
        let meshes = SceneMeshes::new(&ctx.device);

        self.gpu = Some(GpuState {
            ctx,
            rig,
            stereo,
            meshes,
            frame_count: 0,
        });

        info!("{}", self.session.step().instructions());
        Ok(())
    }

    fn reset_player(&mut self) {
        let calibration = &self.config.calibration;
        self.player = player_pose(calibration.camera_start, calibration.camera_target);
    }

    fn on_step_changed(&self) {
        let step = self.session.step();
        info!(?step, "{}", step.instructions());
        if let Some(window) = &self.window {
            window.set_title(&title(step));
        }
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, action: KeyAction, pressed: bool, repeat: bool) {
        match action {
            KeyAction::PassThrough(code) => {
                self.free_look.on_key(code, pressed);
            }
            _ if !pressed || repeat => {}
            KeyAction::Confirm => match self.session.confirm() {
                SessionEvent::Completed(_) => {
                    self.reset_player();
                    self.on_step_changed();
                }
                SessionEvent::StepStarted(_) => self.on_step_changed(),
                SessionEvent::Reported(_) | SessionEvent::Recentered => {}
            },
            KeyAction::Reset => {
                self.session.reset();
                self.reset_player();
            }
            KeyAction::Quit => event_loop.exit(),
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        let head = self.session.frame();
        let step = self.session.step();
        if step == Step::Done {
            self.free_look.apply(&mut self.player, dt);
        }

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

        let session = &self.session;
        let meshes = &gpu.meshes;
        let rig = &gpu.rig;
        let head_view = Mat4::from_quat(head.inverse()) * self.player.inverse();

        let cmd = gpu.stereo.render_frame(&gpu.ctx.device, rig, &view, |eye: &PerEyeArgs| {
            let correction = session.correction_for(eye.eye);
            let projection = rig.eye_projection(eye.eye);
            match step {
                Step::Intro => Vec::new(),
                Step::Pitch | Step::Yaw => {
                    let look = match step {
                        Step::Pitch => Mat4::look_at_rh(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Z),
                        _ => Mat4::look_at_rh(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y),
                    };
                    vec![DrawCall {
                        mesh: &meshes.crosshair,
                        model: Mat4::IDENTITY,
                        view: correction * look,
                        projection,
                    }]
                }
                Step::Done => {
                    let view = eye.view(correction, head_view);
                    let sky_view = Mat4::from_mat3(Mat3::from_mat4(view));
                    vec![
                        DrawCall {
                            mesh: &meshes.skybox,
                            model: Mat4::IDENTITY,
                            view: sky_view,
                            projection,
                        },
                        DrawCall {
                            mesh: &meshes.grid,
                            model: Mat4::IDENTITY,
                            view,
                            projection,
                        },
                        DrawCall {
                            mesh: &meshes.cube,
                            model: Mat4::from_scale(Vec3::splat(0.4))
                                * Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)),
                            view,
                            projection,
                        },
                    ]
                }
            }
        });

        gpu.ctx.queue.submit(std::iter::once(cmd));
        output.present();

        gpu.frame_count += 1;
        if gpu.frame_count % 300 == 0 {
            tracing::debug!(frames = gpu.frame_count, ?step, "Render heartbeat");
        }
    }
}

fn title(step: Step) -> String {
    let first_line = step.instructions().lines().next().unwrap_or_default();
    format!("Strabismus calibration: {first_line}")
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
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
                        gpu.stereo.resize(&gpu.ctx.device, gpu.ctx.format(), &gpu.rig);
                    }
                }
            }

            WindowEvent::Focused(false) => self.free_look.release_all(),

            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(action) = KeyAction::from_physical(event.physical_key) {
                    let pressed = event.state == ElementState::Pressed;
                    self.on_key(event_loop, action, pressed, event.repeat);
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

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("calibrate_strabismus=info,rift_demos=info,rift_calibration=info,rift_tracker=info,rift_renderer=info");

    info!("Strabismus calibration starting");

    let config = rift_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    let tracker = connect_tracker(&config).await;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, tracker);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Connect to the sensor bridge, falling back to a fixed identity pose.
async fn connect_tracker(config: &AppConfig) -> ImuClient {
    let Some(endpoint) = &config.tracker.endpoint else {
        info!("No tracker endpoint configured, head tracking disabled");
        return ImuClient::mock();
    };

    let settings = FusionSettings {
        beta: config.tracker.madgwick_beta,
        calibration_samples: config.tracker.calibration_samples,
        sample_rate_hz: config.tracker.sample_rate_hz,
        prediction_ms: config.tracker.prediction_ms,
    };

    match ImuClient::connect(endpoint, settings).await {
        Ok(client) => client,
        Err(e) => {
            warn!(?e, %endpoint, "Head tracker not available, using mock (no head tracking)");
            ImuClient::mock()
        }
    }
}

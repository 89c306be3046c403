use crate::eye::{PerEyeArgs, StereoRig};
use crate::mesh::{Mesh, Topology};
use crate::pipeline::{
    create_depth_texture, DistortionPipeline, DistortionUniforms, ScenePipeline, Uniforms,
};
use glam::Mat4;
use rift_math::{Eye, FRAMEBUFFER_OBJECT_SCALE};
use wgpu::util::DeviceExt;

/// A mesh uploaded to the GPU.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub topology: Topology,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            topology: mesh.topology,
        }
    }
}

/// One mesh drawn into one eye.
pub struct DrawCall<'a> {
    pub mesh: &'a GpuMesh,
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Manages side-by-side stereoscopic rendering.
///
/// Each eye is rendered into its own offscreen target, then warped through
/// the lens distortion model into its half of the output surface.
pub struct StereoRenderer {
    /// Left eye offscreen render target.
    left_eye: EyeTarget,
    /// Right eye offscreen render target.
    right_eye: EyeTarget,
    pub scene_pipeline: ScenePipeline,
    distortion_pipeline: DistortionPipeline,
    clear_color: wgpu::Color,
}

struct EyeTarget {
    view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    distortion_bind_group: wgpu::BindGroup,
}

impl EyeTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        color_format: wgpu::TextureFormat,
        size: (u32, u32),
        distortion: &DistortionPipeline,
        uniforms: DistortionUniforms,
    ) -> Self {
        let (width, height) = size;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        let depth_view = create_depth_texture(device, &format!("{}_depth", label), width, height);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_distortion_uniforms", label)),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let distortion_bind_group = distortion.create_bind_group(device, &view, &uniform_buffer);

        Self {
            view,
            depth_view,
            distortion_bind_group,
        }
    }
}

impl StereoRenderer {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, rig: &StereoRig) -> Self {
        let scene_pipeline = ScenePipeline::new(device, color_format);
        let distortion_pipeline = DistortionPipeline::new(device, color_format);
        let (left_eye, right_eye) = create_eye_targets(device, color_format, rig, &distortion_pipeline);

        Self {
            left_eye,
            right_eye,
            scene_pipeline,
            distortion_pipeline,
            clear_color: wgpu::Color {
                r: 0.05,
                g: 0.05,
                b: 0.05,
                a: 1.0,
            },
        }
    }

    /// Recreate the eye targets after the rig changed size.
    pub fn resize(&mut self, device: &wgpu::Device, color_format: wgpu::TextureFormat, rig: &StereoRig) {
        let (left_eye, right_eye) =
            create_eye_targets(device, color_format, rig, &self.distortion_pipeline);
        self.left_eye = left_eye;
        self.right_eye = right_eye;
    }

    /// Render both eyes and distort them into `output`.
    ///
    /// `scene` is called once per eye and returns the draws for that eye.
    pub fn render_frame<'a, F>(
        &self,
        device: &wgpu::Device,
        rig: &StereoRig,
        output: &wgpu::TextureView,
        mut scene: F,
    ) -> wgpu::CommandBuffer
    where
        F: FnMut(&PerEyeArgs) -> Vec<DrawCall<'a>>,
    {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("stereo_render"),
        });

        for eye_args in rig.eyes() {
            let draws = scene(eye_args);
            self.render_eye(&mut encoder, device, self.target(eye_args.eye), &draws);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("distortion_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.distortion_pipeline.pipeline);

            for eye in Eye::BOTH {
                let viewport = rig.viewport(eye);
                pass.set_viewport(
                    viewport.x as f32,
                    viewport.y as f32,
                    viewport.width as f32,
                    viewport.height as f32,
                    0.0,
                    1.0,
                );
                pass.set_bind_group(0, &self.target(eye).distortion_bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        encoder.finish()
    }

    fn target(&self, eye: Eye) -> &EyeTarget {
        match eye {
            Eye::Left => &self.left_eye,
            Eye::Right => &self.right_eye,
        }
    }

    fn render_eye(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        eye: &EyeTarget,
        draws: &[DrawCall<'_>],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("eye_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &eye.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &eye.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in draws {
            let uniforms = Uniforms::new(draw.model, draw.view, draw.projection);

            let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform_buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let uniform_bind_group = self
                .scene_pipeline
                .create_uniform_bind_group(device, &uniform_buffer);

            pass.set_pipeline(self.scene_pipeline.for_topology(draw.mesh.topology));
            pass.set_bind_group(0, &uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
    }
}

/// Distortion parameters for one eye of the rig.
pub fn distortion_uniforms(rig: &StereoRig, eye: Eye) -> DistortionUniforms {
    DistortionUniforms {
        k: rig.distortion_k().to_array(),
        lens_offset: rig.eye(eye).lens_offset,
        aspect: rig.eye_aspect(),
        post_distortion_scale: rig.post_distortion_scale(),
        _pad: 0.0,
    }
}

/// Offscreen eye target size: the eye viewport scaled up so the distortion
/// pass samples at roughly native density near the lens center.
pub fn eye_target_size(rig: &StereoRig) -> (u32, u32) {
    let size = rig.eye_size().as_vec2() * FRAMEBUFFER_OBJECT_SCALE;
    (size.x.ceil() as u32, size.y.ceil() as u32)
}

fn create_eye_targets(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    rig: &StereoRig,
    distortion: &DistortionPipeline,
) -> (EyeTarget, EyeTarget) {
    let size = eye_target_size(rig);
    tracing::debug!(width = size.0, height = size.1, "Creating eye targets");
    (
        EyeTarget::new(
            device,
            "left_eye",
            color_format,
            size,
            distortion,
            distortion_uniforms(rig, Eye::Left),
        ),
        EyeTarget::new(
            device,
            "right_eye",
            color_format,
            size,
            distortion,
            distortion_uniforms(rig, Eye::Right),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rift_math::HmdInfo;

    #[test]
    fn distortion_uniforms_mirror_lens_offset() {
        let rig = StereoRig::new(&HmdInfo::dk1(), (1280, 800));
        let left = distortion_uniforms(&rig, Eye::Left);
        let right = distortion_uniforms(&rig, Eye::Right);
        assert_eq!(left.lens_offset, -right.lens_offset);
        assert_eq!(left.k, [1.0, 0.22, 0.24, 0.0]);
        assert_eq!(left.aspect, right.aspect);
    }

    #[test]
    fn eye_targets_are_oversized() {
        let rig = StereoRig::new(&HmdInfo::dk1(), (1280, 800));
        let (w, h) = eye_target_size(&rig);
        assert_eq!((w, h), (1280, 1600));
    }
}

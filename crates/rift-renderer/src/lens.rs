use crate::eye::StereoRig;
use crate::mesh::textured_quad;
use crate::pipeline::{LensQuadPipeline, LensQuadUniforms};
use glam::Vec2;
use rift_math::Eye;
use wgpu::util::DeviceExt;

/// Quad bounds in eye clip space for an image of `image_aspect` shown in a
/// viewport of `viewport_aspect`.
///
/// Wide images span the full width; narrower ones are shrunk on both axes so
/// the whole image stays visible.
pub fn quad_bounds(image_aspect: f32, viewport_aspect: f32) -> (Vec2, Vec2) {
    let mut max = Vec2::new(1.0, 1.0 / image_aspect);
    if image_aspect < viewport_aspect {
        max *= image_aspect / viewport_aspect;
    }
    (-max, max)
}

/// RGBA8 checkerboard used when no image is configured.
pub fn test_card(width: u32, height: u32) -> Vec<u8> {
    let (r, g, b) = (40u8, 80u8, 160u8);
    let checker_size = 32u32;

    let mut data = Vec::with_capacity((width * height) as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let is_light = ((x / checker_size) + (y / checker_size)) % 2 == 0;
            let factor = if is_light { 1.0_f32 } else { 0.7 };
            data.push((r as f32 * factor) as u8);
            data.push((g as f32 * factor) as u8);
            data.push((b as f32 * factor) as u8);
            data.push(255);
        }
    }
    data
}

/// Upload tightly packed RGBA8 pixels as a sampled texture.
pub fn create_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

/// A 2D image shown through both lenses.
///
/// Geometry and per-eye uniforms are computed once at construction and
/// replayed unchanged every frame.
pub struct LensCorrectedDisplay {
    pipeline: LensQuadPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    texture_bind_group: wgpu::BindGroup,
    eye_bind_groups: [wgpu::BindGroup; 2],
    clear_color: wgpu::Color,
}

impl LensCorrectedDisplay {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        rig: &StereoRig,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Self {
        let pipeline = LensQuadPipeline::new(device, color_format);

        let image_aspect = width as f32 / height.max(1) as f32;
        let (min, max) = quad_bounds(image_aspect, rig.eye_aspect());
        tracing::info!(
            image_aspect,
            viewport_aspect = rig.eye_aspect(),
            max_x = max.x,
            max_y = max.y,
            "Lens-corrected quad laid out"
        );

        let (vertices, indices) = textured_quad(min, max);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("image_quad_vertex_buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("image_quad_index_buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let texture = create_rgba_texture(device, queue, "display_image", width, height, pixels);
        let view = texture.create_view(&Default::default());
        let texture_bind_group = pipeline.create_texture_bind_group(device, &view);

        let eye_bind_groups = Eye::BOTH.map(|eye| {
            let uniforms = eye_uniforms(rig, eye);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lens_quad_uniforms"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            pipeline.create_uniform_bind_group(device, &buffer)
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            texture_bind_group,
            eye_bind_groups,
            clear_color: wgpu::Color {
                r: 0.5,
                g: 0.5,
                b: 0.5,
                a: 1.0,
            },
        }
    }

    /// Draw the image into both eye viewports of `output`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        rig: &StereoRig,
        output: &wgpu::TextureView,
    ) -> wgpu::CommandBuffer {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lens_corrected_display"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lens_quad_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(1, &self.texture_bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

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
                pass.set_bind_group(0, &self.eye_bind_groups[eye.index()], &[]);
                pass.draw_indexed(0..self.index_count, 0, 0..1);
            }
        }

        encoder.finish()
    }
}

/// Per-eye vertex uniforms: left eye shifts by `+lens_offset`, right by `-lens_offset`.
pub fn eye_uniforms(rig: &StereoRig, eye: Eye) -> LensQuadUniforms {
    LensQuadUniforms {
        lens_offset: rig.eye(eye).lens_offset,
        viewport_aspect_ratio: rig.eye_aspect(),
        _pad: [0.0; 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rift_math::HmdInfo;

    #[test]
    fn wide_image_fills_width() {
        let (min, max) = quad_bounds(2.0, 0.8);
        assert!((max.x - 1.0).abs() < 1e-6);
        assert!((max.y - 0.5).abs() < 1e-6);
        assert_eq!(min, -max);
    }

    #[test]
    fn narrow_image_is_scaled_down() {
        let (min, max) = quad_bounds(0.5, 0.8);
        let scale = 0.5 / 0.8;
        assert!((max.x - scale).abs() < 1e-6);
        assert!((max.y - 2.0 * scale).abs() < 1e-6);
        assert_eq!(min, -max);
    }

    #[test]
    fn equal_aspects_are_not_scaled() {
        let (_, max) = quad_bounds(0.8, 0.8);
        assert!((max.x - 1.0).abs() < 1e-6);
        assert!((max.y - 1.25).abs() < 1e-6);
    }

    #[test]
    fn eye_uniforms_mirror() {
        let rig = StereoRig::new(&HmdInfo::dk1(), (1280, 800));
        let left = eye_uniforms(&rig, Eye::Left);
        let right = eye_uniforms(&rig, Eye::Right);
        assert!(left.lens_offset > 0.0);
        assert_eq!(left.lens_offset, -right.lens_offset);
        assert!((left.viewport_aspect_ratio - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_card_alternates_cells() {
        let data = test_card(64, 32);
        assert_eq!(data.len(), 64 * 32 * 4);
        assert_eq!(&data[0..4], &[40, 80, 160, 255]);
        let second_cell = 32 * 4;
        assert_eq!(&data[second_cell..second_cell + 4], &[28, 56, 112, 255]);
    }
}

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex format for flat-colored scene geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl ColorVertex {
    pub fn new(position: Vec3, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // color
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Vertex format for the textured image quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Lines,
    Triangles,
}

/// A generated mesh (vertices + indices).
pub struct Mesh {
    pub vertices: Vec<ColorVertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Mesh {
    fn lines(vertices: Vec<ColorVertex>) -> Self {
        let indices = (0..vertices.len() as u32).collect();
        Self {
            vertices,
            indices,
            topology: Topology::Lines,
        }
    }
}

pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Two crossing line pairs on the XY plane with a gap around the origin.
///
/// Seen with a strabismus offset applied to one eye only, the pairs split
/// apart; the user moves their head until the lines coincide.
pub fn crosshair() -> Mesh {
    let mut vertices = Vec::with_capacity(8);
    for axis in [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y] {
        vertices.push(ColorVertex::new(axis * 0.2, WHITE));
        vertices.push(ColorVertex::new(axis * 2.0, WHITE));
    }
    Mesh::lines(vertices)
}

/// Reference grid on the XZ plane, one line per `spacing` out to `half_extent`.
/// The X and Z axes are highlighted.
pub fn grid(half_extent: u32, spacing: f32) -> Mesh {
    let extent = half_extent as f32 * spacing;
    let line_color = [0.35, 0.35, 0.35, 1.0];
    let mut vertices = Vec::with_capacity(((half_extent * 2 + 1) * 4) as usize);

    for i in -(half_extent as i32)..=(half_extent as i32) {
        let offset = i as f32 * spacing;
        let (x_color, z_color) = if i == 0 {
            ([0.9, 0.2, 0.2, 1.0], [0.2, 0.2, 0.9, 1.0])
        } else {
            (line_color, line_color)
        };
        // Parallel to X.
        vertices.push(ColorVertex::new(Vec3::new(-extent, 0.0, offset), x_color));
        vertices.push(ColorVertex::new(Vec3::new(extent, 0.0, offset), x_color));
        // Parallel to Z.
        vertices.push(ColorVertex::new(Vec3::new(offset, 0.0, -extent), z_color));
        vertices.push(ColorVertex::new(Vec3::new(offset, 0.0, extent), z_color));
    }
    Mesh::lines(vertices)
}

/// Unit cube centered at the origin, one color per face.
pub fn color_cube() -> Mesh {
    let faces: [(Vec3, [f32; 4]); 6] = [
        (Vec3::X, [1.0, 0.0, 0.0, 1.0]),
        (-Vec3::X, [0.0, 1.0, 1.0, 1.0]),
        (Vec3::Y, [0.0, 1.0, 0.0, 1.0]),
        (-Vec3::Y, [1.0, 0.0, 1.0, 1.0]),
        (Vec3::Z, [0.0, 0.0, 1.0, 1.0]),
        (-Vec3::Z, [1.0, 1.0, 0.0, 1.0]),
    ];
    box_faces(0.5, &faces, false)
}

/// Large cube surrounding the viewer with a vertical gradient, viewed from inside.
pub fn skybox(half_size: f32) -> Mesh {
    let zenith = [0.02, 0.05, 0.20, 1.0];
    let horizon = [0.10, 0.35, 0.55, 1.0];
    let nadir = [0.01, 0.01, 0.02, 1.0];
    let mut mesh = box_faces(
        half_size,
        &[
            (Vec3::X, horizon),
            (-Vec3::X, horizon),
            (Vec3::Y, zenith),
            (-Vec3::Y, nadir),
            (Vec3::Z, horizon),
            (-Vec3::Z, horizon),
        ],
        true,
    );
    // Side faces fade from nadir at the bottom to zenith at the top.
    for v in &mut mesh.vertices {
        if v.color == horizon {
            v.color = if v.position[1] > 0.0 { zenith } else { nadir };
            v.color[2] = v.color[2].max(horizon[2] * 0.5);
        }
    }
    mesh
}

fn box_faces(half: f32, faces: &[(Vec3, [f32; 4]); 6], inward: bool) -> Mesh {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for &(normal, color) in faces {
        // Two axes spanning the face, chosen so u x v == normal.
        let u = if normal.x.abs() > 0.5 {
            Vec3::Y * normal.x.signum()
        } else if normal.y.abs() > 0.5 {
            Vec3::Z * normal.y.signum()
        } else {
            Vec3::X * normal.z.signum()
        };
        let v = normal.cross(u);
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + u * su + v * sv) * half;
            vertices.push(ColorVertex::new(position, color));
        }
        let quad = if inward {
            [0, 2, 1, 0, 3, 2]
        } else {
            [0, 1, 2, 0, 2, 3]
        };
        indices.extend(quad.iter().map(|i| base + i));
    }

    Mesh {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

/// Axis-aligned textured quad spanning `min..max`, with the image's top-left at `min.x, max.y`.
pub fn textured_quad(min: Vec2, max: Vec2) -> (Vec<TexturedVertex>, Vec<u32>) {
    let vertices = vec![
        TexturedVertex {
            position: [min.x, max.y],
            uv: [0.0, 0.0],
        },
        TexturedVertex {
            position: [max.x, max.y],
            uv: [1.0, 0.0],
        },
        TexturedVertex {
            position: [min.x, min.y],
            uv: [0.0, 1.0],
        },
        TexturedVertex {
            position: [max.x, min.y],
            uv: [1.0, 1.0],
        },
    ];
    (vertices, vec![0, 2, 1, 1, 2, 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosshair_leaves_a_gap_at_the_center() {
        let mesh = crosshair();
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 8);
        for v in &mesh.vertices {
            let len = Vec3::from_array(v.position).length();
            assert!(len >= 0.2 - 1e-6 && len <= 2.0 + 1e-6);
        }
    }

    #[test]
    fn grid_line_count() {
        let mesh = grid(10, 1.0);
        // 21 lines in each direction, two vertices per line.
        assert_eq!(mesh.vertices.len(), 21 * 2 * 2);
        assert!(mesh.vertices.iter().all(|v| v.position[1] == 0.0));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let mesh = color_cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) > 0.0);
        }
    }

    #[test]
    fn skybox_faces_wind_inward() {
        let mesh = skybox(50.0);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            assert!((b - a).cross(c - a).dot(a) < 0.0);
        }
    }

    #[test]
    fn quad_spans_bounds() {
        let (vertices, indices) = textured_quad(Vec2::new(-1.0, -0.5), Vec2::new(1.0, 0.5));
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        assert_eq!(vertices[0].position, [-1.0, 0.5]);
        assert_eq!(vertices[3].position, [1.0, -0.5]);
    }
}

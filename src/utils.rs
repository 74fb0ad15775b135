use std::f32::consts::FRAC_PI_2;

use bytemuck::NoUninit;
use glam::Vec3;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Append another mesh, rebasing its indices
    pub fn extend(&mut self, other: Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, color: [f32; 4]) {
        let base = self.vertices.len() as u32;
        for c in corners {
            self.vertices.push(Vertex { pos: c.to_array(), normal: normal.to_array(), color });
        }
        self.indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        // COPY_DST so the skinned character can be rewritten in place every frame
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Axis-aligned cube centered at `center`, one quad per face (CCW from outside)
pub fn create_cube_mesh(center: Vec3, size: f32, color: [f32; 4]) -> Mesh {
    let h = size / 2.0;
    let mut mesh = Mesh::empty();
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::NEG_Z),
        (Vec3::NEG_X, Vec3::Y, Vec3::Z),
        (Vec3::Y, Vec3::Z, Vec3::NEG_X),
        (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::NEG_X),
        (Vec3::Z, Vec3::Y, Vec3::X),
        (Vec3::NEG_Z, Vec3::Y, Vec3::NEG_X),
    ];
    // side x up == normal keeps each quad counter-clockwise seen from outside
    for (n, up, side) in faces {
        let c = center + n * h;
        let (u, v) = (side * h, up * h);
        mesh.push_quad([c - u - v, c + u - v, c + u + v, c - u + v], n, color);
    }
    mesh
}

/// Grid lines as thin quads slightly above the ground.
///
/// Every `section`-th line is drawn wider and in `section_color`.
pub fn create_grid_mesh(
    extent: i32,
    cell_size: f32,
    section: i32,
    cell_color: [f32; 4],
    section_color: [f32; 4],
) -> Mesh {
    let mut mesh = Mesh::empty();
    let y = 0.002;
    let len = extent as f32 * cell_size;
    for i in -extent..=extent {
        let is_section = section > 0 && i % section == 0;
        let (w, color) = if is_section { (0.03, section_color) } else { (0.012, cell_color) };
        let o = i as f32 * cell_size;
        // line along z at x = o
        mesh.push_quad(
            [
                Vec3::new(o - w, y, len),
                Vec3::new(o + w, y, len),
                Vec3::new(o + w, y, -len),
                Vec3::new(o - w, y, -len),
            ],
            Vec3::Y,
            color,
        );
        // line along x at z = o
        mesh.push_quad(
            [
                Vec3::new(-len, y, o + w),
                Vec3::new(len, y, o + w),
                Vec3::new(len, y, o - w),
                Vec3::new(-len, y, o - w),
            ],
            Vec3::Y,
            color,
        );
    }
    mesh
}

/// Photo-studio sweep: floor strip that curves up into a back wall.
///
/// Floor runs from `+depth` to the curve start at z = 0; the quarter circle
/// of radius `height` ends in a vertical wall at z = -height.
pub fn create_backdrop_mesh(origin: Vec3, width: f32, height: f32, depth: f32, segments: u32, color: [f32; 4]) -> Mesh {
    let mut mesh = Mesh::empty();
    let hw = width / 2.0;
    let segments = segments.max(1);

    let mut profile = vec![(Vec3::new(0.0, 0.0, depth), Vec3::Y)];
    for s in 0..=segments {
        let a = s as f32 / segments as f32 * FRAC_PI_2;
        let p = Vec3::new(0.0, height - height * a.cos(), -height * a.sin());
        let n = Vec3::new(0.0, a.cos(), a.sin());
        profile.push((p, n));
    }

    for pair in profile.windows(2) {
        let (p0, n0) = pair[0];
        let (p1, _) = pair[1];
        let base = mesh.vertices.len() as u32;
        for p in [p0, p1] {
            for x in [-hw, hw] {
                mesh.vertices.push(Vertex {
                    pos: (origin + Vec3::new(x, p.y, p.z)).to_array(),
                    normal: n0.to_array(),
                    color,
                });
            }
        }
        // base: p0 left, p0 right, p1 left, p1 right
        mesh.indices.extend([base, base + 1, base + 3, base, base + 3, base + 2]);
    }
    mesh
}

const CELL_COLOR: [f32; 4] = [0.352, 0.352, 0.352, 1.0];
const SECTION_COLOR: [f32; 4] = [0.216, 0.216, 0.216, 1.0];

/// Static stage: a 1-unit grid with a heavier line every 3 cells, and a white
/// sweep behind and below the character.
pub fn create_stage_mesh() -> Mesh {
    let mut stage = create_grid_mesh(30, 1.0, 3, CELL_COLOR, SECTION_COLOR);
    stage.extend(create_backdrop_mesh(Vec3::new(0.0, -0.5, -3.0), 20.0, 5.0, 5.0, 20, [1.0; 4]));
    stage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_faces() {
        let cube = create_cube_mesh(Vec3::ZERO, 1.0, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.vertices.iter().flat_map(|v| v.pos).all(|c| c.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = create_cube_mesh(Vec3::ZERO, 2.0, [1.0; 4]);
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(cube.vertices[i as usize].pos));
            let n = Vec3::from_array(cube.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn extend_rebases_indices() {
        let mut a = create_cube_mesh(Vec3::ZERO, 1.0, [1.0; 4]);
        a.extend(create_cube_mesh(Vec3::X, 1.0, [1.0; 4]));
        assert_eq!(a.vertices.len(), 48);
        assert_eq!(&a.indices[36..42], &[24, 25, 26, 24, 26, 27]);
    }

    #[test]
    fn backdrop_ends_in_vertical_wall() {
        let m = create_backdrop_mesh(Vec3::ZERO, 20.0, 5.0, 5.0, 20, [1.0; 4]);
        let last = m.vertices.last().unwrap();
        assert!((last.pos[1] - 5.0).abs() < 1e-4);
        assert!((last.pos[2] + 5.0).abs() < 1e-4);
    }

    #[test]
    fn stage_grid_sits_above_backdrop_floor() {
        let stage = create_stage_mesh();
        let lowest_line = stage
            .vertices
            .iter()
            .filter(|v| v.color == CELL_COLOR || v.color == SECTION_COLOR)
            .map(|v| v.pos[1])
            .fold(f32::INFINITY, f32::min);
        assert!(lowest_line > 0.0);
        assert!(stage.vertices.iter().any(|v| v.pos[1] < -0.4));
    }
}

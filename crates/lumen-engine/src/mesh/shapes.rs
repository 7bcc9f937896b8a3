//! Built-in geometry generators.

use crate::color::Color;
use crate::primitive::Topology;

use super::{Indices, MeshData, Vertex};

impl MeshData {
    /// Single triangle in the XY plane facing +Z, one primary color per corner.
    pub fn triangle() -> Self {
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], n, Color::RED),
            Vertex::new([0.5, -0.5, 0.0], n, Color::GREEN),
            Vertex::new([0.0, 0.5, 0.0], n, Color::BLUE),
        ];
        Self::new(Topology::Triangles, vertices, None)
    }

    /// Square of side `size` in the XZ plane facing +Y.
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        let n = [0.0, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([-h, 0.0, h], n, Color::WHITE),
            Vertex::new([h, 0.0, h], n, Color::WHITE),
            Vertex::new([h, 0.0, -h], n, Color::WHITE),
            Vertex::new([-h, 0.0, -h], n, Color::WHITE),
        ];
        Self::new(
            Topology::Triangles,
            vertices,
            Some(Indices::compact(vec![0, 1, 2, 0, 2, 3], Topology::Triangles)),
        )
    }

    /// Axis-aligned cube centred on the origin with flat per-face normals.
    pub fn cube(half: f32) -> Self {
        let h = half;
        // (normal, 4 corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
            ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
            ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
            ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
            ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
            ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, (normal, corners)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            let tint = face_tint(*normal);
            vertices.extend(corners.iter().map(|&p| Vertex::new(p, *normal, tint)));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        let indices = Indices::compact(indices, Topology::Triangles);
        Self::new(Topology::Triangles, vertices, Some(indices))
    }

    /// Line grid on the XZ plane spanning `[-half_extent, half_extent]`.
    ///
    /// `divisions` cells per side; clamped to at least 1.
    pub fn grid(half_extent: f32, divisions: u32, color: Color) -> Self {
        let divisions = divisions.max(1);
        let step = 2.0 * half_extent / divisions as f32;
        let up = [0.0, 1.0, 0.0];

        let mut vertices = Vec::with_capacity((divisions as usize + 1) * 4);
        for i in 0..=divisions {
            let t = -half_extent + i as f32 * step;
            vertices.push(Vertex::new([t, 0.0, -half_extent], up, color));
            vertices.push(Vertex::new([t, 0.0, half_extent], up, color));
            vertices.push(Vertex::new([-half_extent, 0.0, t], up, color));
            vertices.push(Vertex::new([half_extent, 0.0, t], up, color));
        }

        Self::new(Topology::Lines, vertices, None)
    }

    /// Three colored lines from the origin along +X (red), +Y (green), +Z (blue).
    pub fn axes(length: f32) -> Self {
        let o = [0.0, 0.0, 0.0];
        let axes = [
            ([length, 0.0, 0.0], Color::RED),
            ([0.0, length, 0.0], Color::GREEN),
            ([0.0, 0.0, length], Color::BLUE),
        ];

        let mut vertices = Vec::with_capacity(6);
        for (end, color) in axes {
            vertices.push(Vertex::new(o, end, color));
            vertices.push(Vertex::new(end, end, color));
        }
        Self::new(Topology::Lines, vertices, None)
    }
}

/// Soft per-face color so faces stay distinguishable under unlit shaders.
fn face_tint(n: [f32; 3]) -> Color {
    Color::rgb(
        0.6 + 0.4 * n[0].abs(),
        0.6 + 0.4 * n[1].abs(),
        0.6 + 0.4 * n[2].abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::IndexFormat;

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    #[test]
    fn cube_counts() {
        let m = MeshData::cube(1.0);
        assert_eq!(m.vertices.len(), 24);
        assert_eq!(m.element_count(), 36);
        assert_eq!(m.indices.as_ref().map(Indices::format), Some(IndexFormat::U16));
        assert!(m.indices_in_bounds());
    }

    #[test]
    fn cube_triangles_wind_counter_clockwise_outward() {
        let m = MeshData::cube(0.5);
        let Some(Indices::U16(ix)) = &m.indices else {
            panic!("cube should use u16 indices");
        };
        for tri in ix.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| m.vertices[i as usize]);
            let face_normal = cross(sub(b.position, a.position), sub(c.position, a.position));
            assert!(dot(face_normal, a.normal) > 0.0);
        }
    }

    #[test]
    fn grid_line_count() {
        let m = MeshData::grid(5.0, 10, Color::WHITE);
        assert_eq!(m.topology, Topology::Lines);
        // 11 lines per direction, 2 vertices each.
        assert_eq!(m.vertices.len(), 44);
    }

    #[test]
    fn grid_clamps_zero_divisions() {
        assert_eq!(MeshData::grid(1.0, 0, Color::WHITE).vertices.len(), 8);
    }

    #[test]
    fn axes_are_three_lines() {
        let m = MeshData::axes(2.0);
        assert_eq!(m.vertices.len(), 6);
        assert_eq!(m.vertices[3].position, [0.0, 2.0, 0.0]);
    }

    #[test]
    fn quad_is_indexed() {
        let m = MeshData::quad(2.0);
        assert_eq!(m.element_count(), 6);
        assert_eq!(m.vertices[1].position, [1.0, 0.0, 1.0]);
    }
}

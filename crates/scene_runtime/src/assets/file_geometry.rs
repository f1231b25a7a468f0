//! CPU-side geometry as produced by loaders
//!
//! Attributes are stored as separate arrays (position, color, normal, uvw), one
//! entry per vertex, which is the layout the device geometry is uploaded in.

use super::AssetError;

/// Number of per-vertex attribute arrays
pub const ATTRIBUTE_COUNT: usize = 4;

/// Geometry loaded into host memory, ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileGeometry {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex colors
    pub colors: Vec<[f32; 3]>,
    /// Vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates (u, v, w)
    pub uvws: Vec<[f32; 3]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl FileGeometry {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Attribute arrays in upload order
    pub fn attributes(&self) -> [&[[f32; 3]]; ATTRIBUTE_COUNT] {
        [&self.positions, &self.colors, &self.normals, &self.uvws]
    }

    /// Check that every attribute array matches the vertex count and indices are in range
    pub fn validate(&self) -> Result<(), AssetError> {
        let count = self.vertex_count();
        if count == 0 {
            return Err(AssetError::InvalidData("geometry has no vertices".to_string()));
        }
        if self.attributes().iter().any(|attr| attr.len() != count) {
            return Err(AssetError::InvalidData(format!(
                "attribute arrays disagree on vertex count ({count})"
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(AssetError::InvalidData(format!("index {bad} out of range for {count} vertices")));
        }
        Ok(())
    }

    /// Unit cube centred on the origin, one quad per face
    ///
    /// `clockwise` selects the front-face winding of the triangles.
    pub fn cube(clockwise: bool) -> Self {
        // (normal, tangent u, tangent v) per face
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut geometry = Self::default();
        for (normal, u, v) in FACES {
            let base = geometry.positions.len() as u32;
            for (su, sv) in CORNERS {
                let position = [
                    0.5 * (normal[0] + su * u[0] + sv * v[0]),
                    0.5 * (normal[1] + su * u[1] + sv * v[1]),
                    0.5 * (normal[2] + su * u[2] + sv * v[2]),
                ];
                geometry.positions.push(position);
                geometry.colors.push([1.0, 1.0, 1.0]);
                geometry.normals.push(normal);
                geometry.uvws.push([(su + 1.0) * 0.5, (sv + 1.0) * 0.5, 0.0]);
            }

            // Quads are built counter-clockwise when viewed from outside.
            let quad = if clockwise {
                [0, 2, 1, 0, 3, 2]
            } else {
                [0, 1, 2, 0, 2, 3]
            };
            geometry.indices.extend(quad.iter().map(|i| base + i));
        }
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(geometry: &FileGeometry, tri: usize) -> [f32; 3] {
        let p = |k: usize| geometry.positions[geometry.indices[tri * 3 + k] as usize];
        let (a, b, c) = (p(0), p(1), p(2));
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ]
    }

    #[test]
    fn test_cube_counts_and_validity() {
        let cube = FileGeometry::cube(false);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.validate().is_ok());
        assert!(cube.positions.iter().flatten().all(|c| c.abs() == 0.5));
    }

    #[test]
    fn test_cube_winding_follows_flag() {
        for clockwise in [false, true] {
            let cube = FileGeometry::cube(clockwise);
            for tri in 0..12 {
                let n = triangle_normal(&cube, tri);
                let expected = cube.normals[cube.indices[tri * 3] as usize];
                let dot = n[0] * expected[0] + n[1] * expected[1] + n[2] * expected[2];
                assert_eq!(dot > 0.0, !clockwise, "triangle {tri} clockwise={clockwise}");
            }
        }
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut geometry = FileGeometry::cube(false);
        geometry.indices.push(24);
        assert!(matches!(geometry.validate(), Err(AssetError::InvalidData(_))));
    }
}

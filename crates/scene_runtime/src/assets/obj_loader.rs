//! OBJ file loader for primitive geometry

use super::file_geometry::FileGeometry;
use super::AssetError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads Wavefront OBJ files into [`FileGeometry`]
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file from disk
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<FileGeometry, AssetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.display().to_string()),
            _ => AssetError::IoError(e),
        })?;
        Self::parse(BufReader::new(file))
    }

    /// Parse OBJ text from any buffered reader
    ///
    /// Faces are de-indexed so every face corner becomes its own vertex, and
    /// polygons are fan-triangulated. Missing normals default to +Y, missing
    /// texture coordinates to zero, and colors to white.
    pub fn parse<R: BufRead>(reader: R) -> Result<FileGeometry, AssetError> {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();
        let mut geometry = FileGeometry::default();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let parse_err = |what: &str| AssetError::InvalidData(format!("line {}: invalid {}", line_number + 1, what));

            match parts[0] {
                "v" => {
                    if parts.len() >= 4 {
                        let x: f32 = parts[1].parse().map_err(|_| parse_err("vertex x"))?;
                        let y: f32 = parts[2].parse().map_err(|_| parse_err("vertex y"))?;
                        let z: f32 = parts[3].parse().map_err(|_| parse_err("vertex z"))?;
                        positions.push([x, y, z]);
                    }
                }
                "vn" => {
                    if parts.len() >= 4 {
                        let x: f32 = parts[1].parse().map_err(|_| parse_err("normal x"))?;
                        let y: f32 = parts[2].parse().map_err(|_| parse_err("normal y"))?;
                        let z: f32 = parts[3].parse().map_err(|_| parse_err("normal z"))?;
                        normals.push([x, y, z]);
                    }
                }
                "vt" => {
                    if parts.len() >= 3 {
                        let u: f32 = parts[1].parse().map_err(|_| parse_err("tex coord u"))?;
                        let v: f32 = parts[2].parse().map_err(|_| parse_err("tex coord v"))?;
                        tex_coords.push([u, v, 0.0]);
                    }
                }
                "f" => {
                    if parts.len() < 4 {
                        return Err(parse_err("face (fewer than 3 corners)"));
                    }

                    let mut corners = Vec::with_capacity(parts.len() - 1);
                    for corner in &parts[1..] {
                        let mut fields = corner.split('/');

                        // OBJ indices are 1-based.
                        let pos_idx: usize = fields
                            .next()
                            .and_then(|s| s.parse().ok())
                            .filter(|&i| i > 0)
                            .ok_or_else(|| parse_err("position index"))?;
                        let tex_idx = fields.next().and_then(|s| s.parse::<usize>().ok()).and_then(|i| i.checked_sub(1));
                        let normal_idx = fields.next().and_then(|s| s.parse::<usize>().ok()).and_then(|i| i.checked_sub(1));

                        let position = positions
                            .get(pos_idx - 1)
                            .ok_or_else(|| parse_err("face (position index out of bounds)"))?;
                        let uvw = tex_idx.and_then(|i| tex_coords.get(i)).unwrap_or(&[0.0, 0.0, 0.0]);
                        let normal = normal_idx.and_then(|i| normals.get(i)).unwrap_or(&[0.0, 1.0, 0.0]);

                        geometry.positions.push(*position);
                        geometry.colors.push([1.0, 1.0, 1.0]);
                        geometry.normals.push(*normal);
                        geometry.uvws.push(*uvw);
                        corners.push(geometry.positions.len() as u32 - 1);
                    }

                    for i in 1..(corners.len() - 1) {
                        geometry.indices.extend([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {
                    // Groups, materials and smoothing are not used by the scene.
                }
            }
        }

        geometry.validate()?;
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# a unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 1
vn 0 0 1
f 1/1/1 2//1 3/2/1 4
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let geometry = ObjLoader::parse(QUAD.as_bytes()).unwrap();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(geometry.normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(geometry.uvws[2], [1.0, 1.0, 0.0]);
        // Corner without attributes falls back to defaults.
        assert_eq!(geometry.normals[3], [0.0, 1.0, 0.0]);
        assert_eq!(geometry.uvws[3], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_face_rejected() {
        let err = ObjLoader::parse("v 0 0 0\nf 1 2 3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AssetError::InvalidData(_)));
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(ObjLoader::parse("# nothing\n".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        assert!(matches!(
            ObjLoader::load_obj("/nonexistent/model.obj"),
            Err(AssetError::NotFound(_))
        ));
    }
}

//! OBJ file loader for ray-cast models
//!
//! Only geometry is read: vertex positions and faces. Polygons are fan
//! triangulated. Normals, texture coordinates, groups and materials are
//! skipped since the preview shading derives everything from triangle
//! geometry.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::foundation::math::Vec3;

/// Errors raised while reading OBJ files
#[derive(Error, Debug)]
pub enum ObjError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed statement on `line`
    #[error("Parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
    /// Structurally invalid mesh
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Indexed triangle soup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex indices, three per triangle
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of triangle `index`
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Axis-aligned bounds `(min, max)` of all referenced vertices
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut corners = self.triangles.iter().flatten().map(|&i| self.positions[i as usize]);
        let first = corners.next()?;
        Some(corners.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p))))
    }
}

/// Geometry-only Wavefront OBJ reader
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file and return its triangles
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<TriangleMesh, ObjError> {
        let path = path.as_ref();
        let mesh = Self::parse(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded {} triangles ({} vertices) from {:?}",
            mesh.triangle_count(),
            mesh.positions.len(),
            path
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<TriangleMesh, ObjError> {
        let mut mesh = TriangleMesh::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = number + 1;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => {
                    let coords: Vec<f32> = parts
                        .take(3)
                        .map(|p| p.parse::<f32>().map_err(|_| parse_error(line_no, format!("invalid vertex coordinate '{p}'"))))
                        .collect::<Result<_, _>>()?;
                    if coords.len() != 3 {
                        return Err(parse_error(line_no, "vertex needs three coordinates".to_string()));
                    }
                    mesh.positions.push(Vec3::new(coords[0], coords[1], coords[2]));
                }
                Some("f") => {
                    let corners: Vec<u32> = parts
                        .map(|p| resolve_index(p, mesh.positions.len(), line_no))
                        .collect::<Result<_, _>>()?;
                    if corners.len() < 3 {
                        return Err(parse_error(line_no, "face needs at least three vertices".to_string()));
                    }
                    // Fan triangulation
                    for i in 1..corners.len() - 1 {
                        mesh.triangles.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if mesh.triangles.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ file".to_string()));
        }
        Ok(mesh)
    }
}

/// Position index of one `v/vt/vn` face corner, 1-based or negative-relative
fn resolve_index(corner: &str, vertex_count: usize, line: usize) -> Result<u32, ObjError> {
    let text = corner.split('/').next().unwrap_or_default();
    let index: i64 = text
        .parse()
        .map_err(|_| parse_error(line, format!("invalid face index '{corner}'")))?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => vertex_count as i64 + i,
        _ => -1,
    };
    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(parse_error(line, format!("face index {index} out of bounds")));
    }
    Ok(resolved as u32)
}

fn parse_error(line: usize, message: String) -> ObjError {
    ObjError::ParseError { line, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = ObjLoader::parse(Cursor::new(QUAD)).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.bounds(), Some((Vec3::zeros(), Vec3::new(1.0, 1.0, 0.0))));
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = ObjLoader::parse(Cursor::new(text)).unwrap();
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.triangle(0)[2], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_bad_input_reports_line() {
        let err = ObjLoader::parse(Cursor::new("v 0 0 0\nv 1 x 0\n")).unwrap_err();
        assert!(matches!(err, ObjError::ParseError { line: 2, .. }));

        let err = ObjLoader::parse(Cursor::new("v 0 0 0\nf 1 2 3\n")).unwrap_err();
        assert!(matches!(err, ObjError::ParseError { line: 2, .. }));

        let err = ObjLoader::parse(Cursor::new("v 0 0 0\n")).unwrap_err();
        assert!(matches!(err, ObjError::InvalidFormat(_)));
    }
}

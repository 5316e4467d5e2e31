//! Wavefront OBJ loader

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use super::mesh::{MeshBuilder, MeshData, Vertex};

/// OBJ parsing errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A number or index could not be parsed
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// The file parsed but does not describe a usable mesh
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Loader for the position/uv/normal subset of OBJ
///
/// Polygons are triangulated as fans around their first corner. Optional
/// per-vertex colors (`v x y z r g b`) are honored; otherwise vertices are
/// white.
pub struct ObjLoader;

#[derive(Default)]
struct Attributes {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
}

impl ObjLoader {
    /// Load and triangulate an OBJ file
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
        let path = path.as_ref();
        let mesh = Self::parse(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any reader
    pub fn parse<R: BufRead>(reader: R) -> Result<MeshData, ObjError> {
        let mut attributes = Attributes::default();
        let mut builder = MeshBuilder::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = number + 1;
            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else { continue };
            let args: Vec<&str> = parts.collect();

            match keyword {
                "v" => {
                    let values = parse_floats(&args, line_no)?;
                    if values.len() < 3 {
                        return Err(parse_error(line_no, "vertex needs three coordinates"));
                    }
                    attributes.positions.push([values[0], values[1], values[2]]);
                    attributes.colors.push(if values.len() >= 6 {
                        [values[3], values[4], values[5]]
                    } else {
                        [1.0, 1.0, 1.0]
                    });
                }
                "vn" => {
                    let values = parse_floats(&args, line_no)?;
                    if values.len() < 3 {
                        return Err(parse_error(line_no, "normal needs three components"));
                    }
                    attributes.normals.push([values[0], values[1], values[2]]);
                }
                "vt" => {
                    let values = parse_floats(&args, line_no)?;
                    if values.len() < 2 {
                        return Err(parse_error(line_no, "texture coordinate needs two components"));
                    }
                    // OBJ puts v = 0 at the bottom; Vulkan samples top-down.
                    attributes.uvs.push([values[0], 1.0 - values[1]]);
                }
                "f" => {
                    if args.len() < 3 {
                        return Err(parse_error(line_no, "face needs at least three corners"));
                    }
                    let corners = args
                        .iter()
                        .map(|corner| attributes.resolve_corner(corner, line_no))
                        .collect::<Result<Vec<_>, _>>()?;
                    for i in 1..corners.len() - 1 {
                        builder.push(corners[0]);
                        builder.push(corners[i]);
                        builder.push(corners[i + 1]);
                    }
                }
                _ => {}
            }
        }

        let mesh = builder.finish();
        if mesh.indices.is_empty() {
            return Err(ObjError::InvalidFormat("no faces found".to_string()));
        }
        Ok(mesh)
    }
}

impl Attributes {
    /// Turn a `p`, `p/t`, `p//n` or `p/t/n` reference into a vertex
    fn resolve_corner(&self, corner: &str, line: usize) -> Result<Vertex, ObjError> {
        let mut fields = corner.split('/');
        let position = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error(line, "face corner without a position"))?;
        let position = resolve_index(position, self.positions.len(), line)?;

        let mut vertex = Vertex {
            position: self.positions[position],
            color: self.colors[position],
            ..Vertex::default()
        };
        if let Some(uv) = fields.next().filter(|s| !s.is_empty()) {
            vertex.uv = self.uvs[resolve_index(uv, self.uvs.len(), line)?];
        }
        if let Some(normal) = fields.next().filter(|s| !s.is_empty()) {
            vertex.normal = self.normals[resolve_index(normal, self.normals.len(), line)?];
        }
        Ok(vertex)
    }
}

/// Convert a 1-based or negative (relative) OBJ index into a 0-based one
fn resolve_index(raw: &str, count: usize, line: usize) -> Result<usize, ObjError> {
    let index: i64 = raw
        .parse()
        .map_err(|_| parse_error(line, &format!("invalid index '{raw}'")))?;
    let count_i = i64::try_from(count).unwrap_or(i64::MAX);
    let resolved = match index {
        0 => None,
        i if i > 0 => Some(i - 1),
        i => Some(count_i + i),
    };
    resolved
        .filter(|&i| (0..count_i).contains(&i))
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| parse_error(line, &format!("index {index} out of range (have {count})")))
}

fn parse_floats(args: &[&str], line: usize) -> Result<Vec<f32>, ObjError> {
    args.iter()
        .map(|arg| {
            arg.parse::<f32>()
                .map_err(|_| parse_error(line, &format!("invalid number '{arg}'")))
        })
        .collect()
}

fn parse_error(line: usize, message: &str) -> ObjError {
    ObjError::ParseError {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const EPSILON: f32 = 1e-6;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = ObjLoader::parse(Cursor::new(QUAD)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_relative_eq!(mesh.vertices[2].normal[2], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_uv_v_axis_is_flipped() {
        let mesh = ObjLoader::parse(Cursor::new(QUAD)).unwrap();
        assert_relative_eq!(mesh.vertices[0].uv[1], 1.0, epsilon = EPSILON);
        assert_relative_eq!(mesh.vertices[2].uv[1], 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_negative_indices_and_vertex_colors() {
        let source = "v 0 0 0 1 0 0\nv 1 0 0 0 1 0\nv 0 1 0 0 0 1\nf -3 -2 -1\n";
        let mesh = ObjLoader::parse(Cursor::new(source)).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_relative_eq!(mesh.vertices[1].color[1], 1.0, epsilon = EPSILON);
        assert_relative_eq!(mesh.vertices[2].position[1], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let source = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        let err = ObjLoader::parse(Cursor::new(source)).unwrap_err();
        assert!(matches!(err, ObjError::ParseError { line: 3, .. }));
    }

    #[test]
    fn test_file_without_faces_is_invalid() {
        let err = ObjLoader::parse(Cursor::new("v 0 0 0\n")).unwrap_err();
        assert!(matches!(err, ObjError::InvalidFormat(_)));
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let err = ObjLoader::load_obj("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, ObjError::Io(_)));
    }
}

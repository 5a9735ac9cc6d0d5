//! Wavefront OBJ loader
//!
//! Supports `v` (with optional per-vertex colour), `vn`, `vt` and polygonal
//! `f` records; polygons are fan-triangulated and identical vertices merged.

use super::mesh_data::{MeshData, Vertex};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// OBJ loading errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed number or record
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
    /// Well-formed but unusable file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// OBJ mesh loader
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mesh = Self::parse(BufReader::new(file))?;
        log::info!(
            "Loaded {:?}: {} vertices, {} indices",
            path,
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any reader
    pub fn parse<R: Read>(reader: BufReader<R>) -> Result<MeshData, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut colors: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut triangles: Vec<Vertex> = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = number + 1;
            let mut parts = line.split_whitespace();
            let Some(tag) = parts.next() else { continue };
            let fields: Vec<&str> = parts.collect();

            match tag {
                "v" => {
                    let values = parse_floats(&fields, line_no)?;
                    if values.len() < 3 {
                        return Err(parse_error(line_no, "vertex needs at least 3 coordinates"));
                    }
                    positions.push([values[0], values[1], values[2]]);
                    colors.push(if values.len() >= 6 {
                        [values[3], values[4], values[5]]
                    } else {
                        [1.0, 1.0, 1.0]
                    });
                }
                "vn" => {
                    let values = parse_floats(&fields, line_no)?;
                    if values.len() < 3 {
                        return Err(parse_error(line_no, "normal needs 3 components"));
                    }
                    normals.push([values[0], values[1], values[2]]);
                }
                "vt" => {
                    let values = parse_floats(&fields, line_no)?;
                    if values.len() < 2 {
                        return Err(parse_error(line_no, "texture coordinate needs 2 components"));
                    }
                    tex_coords.push([values[0], values[1]]);
                }
                "f" => {
                    if fields.len() < 3 {
                        return Err(parse_error(line_no, "face needs at least 3 vertices"));
                    }
                    let mut face = Vec::with_capacity(fields.len());
                    for corner in &fields {
                        let mut refs = corner.split('/');
                        let position = resolve(refs.next(), positions.len(), line_no)?
                            .ok_or_else(|| parse_error(line_no, "face vertex without position"))?;
                        let uv = resolve(refs.next(), tex_coords.len(), line_no)?;
                        let normal = resolve(refs.next(), normals.len(), line_no)?;
                        face.push(Vertex {
                            position: positions[position],
                            color: colors[position],
                            normal: normal.map_or([0.0, 0.0, 0.0], |i| normals[i]),
                            uv: uv.map_or([0.0, 0.0], |i| tex_coords[i]),
                        });
                    }
                    for i in 1..face.len() - 1 {
                        triangles.extend([face[0], face[i], face[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if triangles.is_empty() {
            return Err(ObjError::InvalidFormat("no faces found".to_string()));
        }
        Ok(MeshData::from_triangles(triangles))
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> ObjError {
    ObjError::ParseError {
        line,
        message: message.into(),
    }
}

fn parse_floats(fields: &[&str], line: usize) -> Result<Vec<f32>, ObjError> {
    fields
        .iter()
        .map(|f| f.parse::<f32>().map_err(|_| parse_error(line, format!("invalid number '{f}'"))))
        .collect()
}

/// Resolve a 1-based (or negative, relative) OBJ index; empty means absent
fn resolve(field: Option<&str>, len: usize, line: usize) -> Result<Option<usize>, ObjError> {
    let Some(field) = field.filter(|f| !f.is_empty()) else {
        return Ok(None);
    };
    let index: i64 = field
        .parse()
        .map_err(|_| parse_error(line, format!("invalid index '{field}'")))?;
    let resolved = if index < 0 { len as i64 + index } else { index - 1 };
    if resolved < 0 || resolved >= len as i64 {
        return Err(parse_error(line, format!("index {index} out of range")));
    }
    Ok(Some(resolved as usize))
}

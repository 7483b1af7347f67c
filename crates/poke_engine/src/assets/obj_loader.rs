//! Wavefront OBJ reader
//!
//! Supports `v`, `vt`, `vn`, `f` and `usemtl`. Every `usemtl` starts a new
//! sub-mesh whose default texture name is the material name. Polygons are
//! fan-triangulated. Anything else in the file is ignored.

use crate::assets::{AssetError, MeshData, SubMeshData};
use crate::render::primitives::Vertex;

/// OBJ reader
pub struct ObjLoader;

#[derive(Default)]
struct Attributes {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
}

impl ObjLoader {
    /// Parse OBJ source text; `name` is only used in error messages
    pub fn parse(name: &str, source: &str) -> Result<MeshData, AssetError> {
        let err = |line: usize, reason: &str| AssetError::Parse {
            name: name.to_string(),
            reason: format!("line {}: {}", line + 1, reason),
        };

        let mut attrs = Attributes::default();
        let mut sub_meshes: Vec<SubMeshData> = Vec::new();
        let mut current = SubMeshData {
            vertices: Vec::new(),
            indices: Vec::new(),
            texture_name: None,
        };

        for (line_no, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else { continue };
            let rest: Vec<&str> = parts.collect();

            match keyword {
                "v" => attrs.positions.push(parse_floats::<3>(&rest).ok_or_else(|| err(line_no, "invalid vertex"))?),
                "vn" => attrs.normals.push(parse_floats::<3>(&rest).ok_or_else(|| err(line_no, "invalid normal"))?),
                "vt" => attrs.tex_coords.push(parse_floats::<2>(&rest).ok_or_else(|| err(line_no, "invalid tex coord"))?),
                "usemtl" => {
                    let next = SubMeshData {
                        vertices: Vec::new(),
                        indices: Vec::new(),
                        texture_name: rest.first().map(|s| (*s).to_string()),
                    };
                    let finished = std::mem::replace(&mut current, next);
                    if !finished.indices.is_empty() {
                        sub_meshes.push(finished);
                    }
                }
                "f" => {
                    if rest.len() < 3 {
                        return Err(err(line_no, "face needs at least three vertices"));
                    }

                    let first = current.vertices.len() as u32;
                    for corner in &rest {
                        let vertex = resolve_corner(corner, &attrs).ok_or_else(|| err(line_no, "bad face index"))?;
                        current.vertices.push(vertex);
                    }

                    for i in 1..(rest.len() as u32 - 1) {
                        current.indices.extend_from_slice(&[first, first + i, first + i + 1]);
                    }
                }
                _ => {}
            }
        }

        if !current.indices.is_empty() {
            sub_meshes.push(current);
        }

        let mesh = MeshData { sub_meshes };
        mesh.validate(name)?;
        Ok(mesh)
    }
}

fn parse_floats<const N: usize>(parts: &[&str]) -> Option<[f32; N]> {
    if parts.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().ok()?;
    }
    Some(out)
}

/// Resolve a `p/t/n` face corner (1-based, negative = relative) to a vertex
fn resolve_corner(corner: &str, attrs: &Attributes) -> Option<Vertex> {
    let mut fields = corner.split('/');
    let position = lookup(fields.next()?, &attrs.positions)?;
    let uv = match fields.next() {
        Some(s) if !s.is_empty() => lookup(s, &attrs.tex_coords)?,
        _ => [0.0, 0.0],
    };
    let normal = match fields.next() {
        Some(s) if !s.is_empty() => lookup(s, &attrs.normals)?,
        _ => [0.0, 1.0, 0.0],
    };

    Some(Vertex {
        position,
        normal,
        uv,
        color: [1.0; 4],
    })
}

fn lookup<T: Copy>(index: &str, items: &[T]) -> Option<T> {
    let index: i64 = index.parse().ok()?;
    let resolved = if index < 0 {
        items.len() as i64 + index
    } else {
        index - 1
    };
    usize::try_from(resolved).ok().and_then(|i| items.get(i).copied())
}

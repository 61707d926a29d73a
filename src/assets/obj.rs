use crate::scene::{Material, Mesh, ModelNode};
use glam::Vec3;

#[derive(Debug, thiserror::Error)]
pub enum MeshParseError {
    #[error("mesh data is not valid UTF-8")]
    Encoding,
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("mesh contains no faces")]
    NoGeometry,
}

/// Parses raw mesh bytes into a model node. Behind a trait so the loader's
/// failure handling can be exercised with a parser that always fails.
pub trait MeshParser {
    fn parse(&self, bytes: &[u8]) -> Result<ModelNode, MeshParseError>;
}

/// Wavefront OBJ parser covering what the product models actually use:
/// positions, normals, polygonal faces (fan-triangulated) and `usemtl`
/// groups mapped onto a small fabrication-material palette.
pub struct ObjParser;

impl MeshParser for ObjParser {
    fn parse(&self, bytes: &[u8]) -> Result<ModelNode, MeshParseError> {
        let text = std::str::from_utf8(bytes).map_err(|_| MeshParseError::Encoding)?;

        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut meshes: Vec<Mesh> = Vec::new();
        let mut current = GroupBuilder::new("default");

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let keyword = fields.next().unwrap_or("");
            match keyword {
                "v" => positions.push(parse_vec3(&mut fields, line_no)?),
                "vn" => normals.push(parse_vec3(&mut fields, line_no)?),
                "f" => {
                    let mut corners: Vec<(Vec3, Option<Vec3>)> = Vec::new();
                    for field in fields {
                        corners.push(parse_face_corner(
                            field, &positions, &normals, line_no,
                        )?);
                    }
                    if corners.len() < 3 {
                        return Err(MeshParseError::Malformed {
                            line: line_no,
                            message: format!("face has {} vertices", corners.len()),
                        });
                    }
                    for i in 1..corners.len() - 1 {
                        current.push_triangle(corners[0], corners[i], corners[i + 1]);
                    }
                }
                "usemtl" => {
                    let name = line[6..].trim();
                    if !current.is_empty() {
                        meshes.push(current.finish());
                    }
                    current = GroupBuilder::new(name);
                }
                // Texture coordinates, objects, groups and material library
                // references carry nothing the viewer renders.
                "vt" | "o" | "g" | "s" | "mtllib" => {}
                _ => {}
            }
        }

        if !current.is_empty() {
            meshes.push(current.finish());
        }
        if meshes.is_empty() {
            return Err(MeshParseError::NoGeometry);
        }
        Ok(ModelNode::new(meshes))
    }
}

/// Base colors for the material names the fabrication catalog uses.
fn palette_material(name: &str) -> Material {
    let lowered = name.to_ascii_lowercase();
    if lowered.contains("glass") {
        Material {
            base_color: [0.62, 0.78, 0.82],
            opacity: 0.35,
            translucent: true,
        }
    } else if lowered.contains("alum") || lowered.contains("metal") || lowered.contains("frame") {
        Material::opaque([0.74, 0.76, 0.78])
    } else if lowered.contains("wood") {
        Material::opaque([0.55, 0.38, 0.22])
    } else {
        Material::default()
    }
}

struct GroupBuilder {
    name: String,
    material: Material,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl GroupBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            material: palette_material(name),
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_triangle(
        &mut self,
        a: (Vec3, Option<Vec3>),
        b: (Vec3, Option<Vec3>),
        c: (Vec3, Option<Vec3>),
    ) {
        let face_normal = (b.0 - a.0).cross(c.0 - a.0).normalize_or_zero();
        let base = self.positions.len() as u32;
        for (position, normal) in [a, b, c] {
            self.positions.push(position);
            self.normals.push(normal.unwrap_or(face_normal));
        }
        self.indices.push([base, base + 1, base + 2]);
    }

    fn finish(self) -> Mesh {
        Mesh {
            name: self.name,
            positions: self.positions,
            normals: self.normals,
            indices: self.indices,
            material: self.material,
        }
    }
}

fn parse_vec3<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<Vec3, MeshParseError> {
    let mut values = [0.0f32; 3];
    for value in &mut values {
        let field = fields.next().ok_or(MeshParseError::Malformed {
            line,
            message: "expected three components".to_string(),
        })?;
        *value = field.parse().map_err(|_| MeshParseError::Malformed {
            line,
            message: format!("invalid number '{field}'"),
        })?;
    }
    Ok(Vec3::from_array(values))
}

fn parse_face_corner(
    field: &str,
    positions: &[Vec3],
    normals: &[Vec3],
    line: usize,
) -> Result<(Vec3, Option<Vec3>), MeshParseError> {
    let mut parts = field.split('/');
    let position_index = parts.next().unwrap_or("");
    let _texcoord_index = parts.next();
    let normal_index = parts.next();

    let position = resolve_index(position_index, positions.len(), line)?
        .and_then(|i| positions.get(i).copied())
        .ok_or(MeshParseError::Malformed {
            line,
            message: format!("position index '{position_index}' out of range"),
        })?;
    let normal = match normal_index {
        Some(raw) if !raw.is_empty() => resolve_index(raw, normals.len(), line)?
            .and_then(|i| normals.get(i).copied()),
        _ => None,
    };
    Ok((position, normal))
}

/// OBJ indices are 1-based; negative indices count back from the end.
fn resolve_index(
    raw: &str,
    count: usize,
    line: usize,
) -> Result<Option<usize>, MeshParseError> {
    let value: i64 = raw.parse().map_err(|_| MeshParseError::Malformed {
        line,
        message: format!("invalid index '{raw}'"),
    })?;
    if value > 0 {
        Ok(Some(value as usize - 1))
    } else if value < 0 {
        let back = (-value) as usize;
        Ok(count.checked_sub(back))
    } else {
        Err(MeshParseError::Malformed {
            line,
            message: "index 0 is not valid".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn quad_fan_triangulates_into_two_triangles() {
        let node = ObjParser.parse(QUAD.as_bytes()).unwrap();
        assert_eq!(node.meshes.len(), 1);
        assert_eq!(node.triangle_count(), 2);
        assert_eq!(node.meshes[0].normals[0], Vec3::Z);
    }

    #[test]
    fn missing_normals_use_the_face_normal() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let node = ObjParser.parse(source.as_bytes()).unwrap();
        assert_eq!(node.meshes[0].normals[0], Vec3::Z);
    }

    #[test]
    fn usemtl_splits_groups_and_assigns_palette_colors() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
usemtl GlassPane
f 1 2 3
usemtl AluminumFrame
f 1 2 3
";
        let node = ObjParser.parse(source.as_bytes()).unwrap();
        assert_eq!(node.meshes.len(), 2);
        assert!(node.meshes[0].material.translucent);
        assert_eq!(node.meshes[0].name, "GlassPane");
        assert_eq!(node.meshes[1].material.base_color, [0.74, 0.76, 0.78]);
    }

    #[test]
    fn negative_indices_resolve_from_the_end() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let node = ObjParser.parse(source.as_bytes()).unwrap();
        assert_eq!(node.triangle_count(), 1);
        assert_eq!(node.meshes[0].positions[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn out_of_range_index_is_rejected_with_line_number() {
        let source = "v 0 0 0\nf 1 2 3\n";
        match ObjParser.parse(source.as_bytes()) {
            Err(MeshParseError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_reports_no_geometry() {
        assert!(matches!(
            ObjParser.parse(b"# just a comment\n"),
            Err(MeshParseError::NoGeometry)
        ));
    }

    #[test]
    fn binary_garbage_reports_encoding_error() {
        assert!(matches!(
            ObjParser.parse(&[0xff, 0xfe, 0x00, 0x80]),
            Err(MeshParseError::Encoding)
        ));
    }
}

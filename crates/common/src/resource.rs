//! Shared read-only resources: meshes, materials and textures.
//!
//! Resources are published behind `Arc` and aliased by any number of
//! drawables. Nothing mutates a resource after construction; a resource that
//! needs to change is replaced by a new handle.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;

/// Errors from resource construction and loading.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource not found: {0:?}")]
    NotFound(PathBuf),
    #[error("malformed resource: {0}")]
    Malformed(String),
    #[error("unsupported resource variant: {0}")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Indexed triangle list with precomputed local bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    bounds: Aabb,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> Result<Self, ResourceError> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            return Err(ResourceError::Malformed(format!(
                "mesh {name:?}: index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ResourceError::Malformed(format!(
                "mesh {name:?}: index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        let bounds = Aabb::from_points(vertices.iter().map(|v| Vec3::from(v.position)))
            .ok_or_else(|| ResourceError::Malformed(format!("mesh {name:?} has no vertices")))?;
        Ok(Self {
            name,
            vertices,
            indices,
            bounds,
        })
    }

    /// Unit cube centred on the origin, one quad per face.
    pub fn cube() -> Self {
        let p = 0.5_f32;
        let face = |normal: [f32; 3], corners: [[f32; 3]; 4]| {
            corners.map(|position| Vertex { position, normal })
        };
        #[rustfmt::skip]
        let faces = [
            face([0.0, 0.0, 1.0], [[-p, -p, p], [p, -p, p], [p, p, p], [-p, p, p]]),
            face([0.0, 0.0, -1.0], [[p, -p, -p], [-p, -p, -p], [-p, p, -p], [p, p, -p]]),
            face([1.0, 0.0, 0.0], [[p, -p, p], [p, -p, -p], [p, p, -p], [p, p, p]]),
            face([-1.0, 0.0, 0.0], [[-p, -p, -p], [-p, -p, p], [-p, p, p], [-p, p, -p]]),
            face([0.0, 1.0, 0.0], [[-p, p, p], [p, p, p], [p, p, -p], [-p, p, -p]]),
            face([0.0, -1.0, 0.0], [[-p, -p, -p], [p, -p, -p], [p, -p, p], [-p, -p, p]]),
        ];
        let vertices: Vec<Vertex> = faces.iter().flatten().copied().collect();
        let indices = (0..6u32)
            .flat_map(|f| {
                let b = f * 4;
                [b, b + 1, b + 2, b + 2, b + 3, b]
            })
            .collect();
        Self {
            name: "cube".to_string(),
            vertices,
            indices,
            bounds: Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(p)),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Metallic-roughness surface description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            metallic: 0.0,
            roughness: 0.5,
            emissive: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureKind {
    Flat,
    Cubemap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    Rgba8,
    Rgba16F,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16F => 8,
        }
    }
}

/// Decoded pixel data. Cubemaps store six square layers back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    width: u32,
    height: u32,
    kind: TextureKind,
    format: TextureFormat,
    data: Vec<u8>,
}

impl Texture {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        kind: TextureKind,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Result<Self, ResourceError> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(ResourceError::Malformed(format!(
                "texture {name:?}: zero extent {width}x{height}"
            )));
        }
        if kind == TextureKind::Cubemap && width != height {
            return Err(ResourceError::Unsupported(format!(
                "texture {name:?}: cubemap faces must be square, got {width}x{height}"
            )));
        }
        let layers = match kind {
            TextureKind::Flat => 1,
            TextureKind::Cubemap => 6,
        };
        let expected = width as usize * height as usize * layers * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(ResourceError::Malformed(format!(
                "texture {name:?}: expected {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            name,
            width,
            height,
            kind,
            format,
            data,
        })
    }

    /// Single-colour texture, handy as a placeholder.
    pub fn solid(name: impl Into<String>, kind: TextureKind, rgba: [u8; 4]) -> Self {
        let layers = match kind {
            TextureKind::Flat => 1,
            TextureKind::Cubemap => 6,
        };
        Self {
            name: name.into(),
            width: 1,
            height: 1,
            kind,
            format: TextureFormat::Rgba8,
            data: rgba.repeat(layers),
        }
    }

    /// Loads uncompressed pixel data with known dimensions from disk.
    pub fn load_raw(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        kind: TextureKind,
        format: TextureFormat,
    ) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResourceError::NotFound(path.to_path_buf()),
            _ => ResourceError::Io(e),
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(name, width, height, kind, format, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_cubemap(&self) -> bool {
        self.kind == TextureKind::Cubemap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex {
            position: [x, y, z],
            normal: [0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn cube_mesh_shape() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices().len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.bounds().point_min, Vec3::splat(-0.5));
        assert_eq!(cube.bounds().point_max, Vec3::splat(0.5));
        assert!(cube.indices().iter().all(|&i| (i as usize) < 24));
    }

    #[test]
    fn mesh_bounds_from_vertices() {
        let mesh = Mesh::new(
            "tri",
            vec![vertex(0.0, 0.0, 0.0), vertex(2.0, 0.0, 0.0), vertex(0.0, 3.0, -1.0)],
            vec![0, 1, 2],
        )
        .unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.bounds().point_min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(mesh.bounds().point_max, Vec3::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn mesh_rejects_bad_indices() {
        let vertices = vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0)];
        let err = Mesh::new("bad", vertices.clone(), vec![0, 1]).unwrap_err();
        assert!(matches!(err, ResourceError::Malformed(_)));
        let err = Mesh::new("bad", vertices, vec![0, 1, 5]).unwrap_err();
        assert!(matches!(err, ResourceError::Malformed(_)));
        let err = Mesh::new("empty", vec![], vec![]).unwrap_err();
        assert!(matches!(err, ResourceError::Malformed(_)));
    }

    #[test]
    fn texture_size_validation() {
        let ok = Texture::new(
            "t",
            2,
            2,
            TextureKind::Flat,
            TextureFormat::Rgba8,
            vec![0; 16],
        );
        assert!(ok.is_ok());

        let short = Texture::new("t", 2, 2, TextureKind::Flat, TextureFormat::Rgba16F, vec![0; 16]);
        assert!(matches!(short, Err(ResourceError::Malformed(_))));

        let cube = Texture::new("c", 2, 4, TextureKind::Cubemap, TextureFormat::Rgba8, vec![0; 192]);
        assert!(matches!(cube, Err(ResourceError::Unsupported(_))));
    }

    #[test]
    fn solid_cubemap_has_six_layers() {
        let sky = Texture::solid("sky", TextureKind::Cubemap, [10, 20, 30, 255]);
        assert!(sky.is_cubemap());
        assert_eq!(sky.data().len(), 24);
        assert!(!Texture::solid("white", TextureKind::Flat, [255; 4]).is_cubemap());
    }

    #[test]
    fn load_raw_missing_file_is_not_found() {
        let err = Texture::load_raw(
            "/definitely/not/here.raw",
            1,
            1,
            TextureKind::Flat,
            TextureFormat::Rgba8,
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[test]
    fn load_raw_reads_pixels_and_names_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.raw");
        std::fs::write(&path, [255u8, 0, 0, 255, 0, 255, 0, 255]).unwrap();

        let texture =
            Texture::load_raw(&path, 2, 1, TextureKind::Flat, TextureFormat::Rgba8).unwrap();
        assert_eq!(texture.name, "checker");
        assert_eq!(texture.data().len(), 8);

        let err = Texture::load_raw(&path, 2, 2, TextureKind::Flat, TextureFormat::Rgba8)
            .unwrap_err();
        assert!(matches!(err, ResourceError::Malformed(_)));
    }

    #[test]
    fn vertex_is_plain_old_data() {
        let v = vertex(1.0, 2.0, 3.0);
        assert_eq!(bytemuck::bytes_of(&v).len(), 24);
    }
}

//! Where tile imagery comes from.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glam::DVec3;
use image::{Rgba, RgbaImage};
use noise::{NoiseFn, Simplex};
use terra_cubesphere::{TileAddress, cube_to_sphere, sphere_to_geo};

use crate::TileError;

/// Produces the RGBA imagery of a tile. Called from worker threads.
pub trait TileSource: Send + Sync + 'static {
    fn fetch(&self, address: TileAddress) -> Result<RgbaImage, TileError>;
}

impl<T: TileSource + ?Sized> TileSource for Box<T> {
    fn fetch(&self, address: TileAddress) -> Result<RgbaImage, TileError> {
        (**self).fetch(address)
    }
}

/// Deterministic imagery: fBm elevation coloured by a simple biome ramp,
/// overlaid with a latitude/longitude graticule.
pub struct ProceduralSource {
    size: u32,
    noise: Simplex,
    octaves: u32,
    graticule_degrees: f64,
}

impl ProceduralSource {
    /// Tiles of `size`×`size` pixels from noise seeded with `seed`.
    pub fn new(size: u32, seed: u32) -> Self {
        Self {
            size: size.max(1),
            noise: Simplex::new(seed),
            octaves: 6,
            graticule_degrees: 15.0,
        }
    }

    /// Spacing of graticule lines. Zero disables them.
    pub fn with_graticule(mut self, degrees: f64) -> Self {
        self.graticule_degrees = degrees.max(0.0);
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.size
    }

    /// fBm over the unit sphere, roughly in `[-1, 1]`.
    pub fn elevation(&self, direction: DVec3) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.5;
        let mut amplitude = 0.5;
        for _ in 0..self.octaves {
            let p = direction * frequency;
            total += self.noise.get([p.x, p.y, p.z]) * amplitude;
            frequency *= 2.0;
            amplitude *= 0.5;
        }
        total
    }

    fn colour(&self, direction: DVec3, pixel_degrees: f64) -> Rgba<u8> {
        let geo = sphere_to_geo(direction);
        if self.graticule_degrees > 0.0 {
            let on_line = |degrees: f64| {
                let r = degrees.rem_euclid(self.graticule_degrees);
                r < pixel_degrees || self.graticule_degrees - r < pixel_degrees
            };
            if on_line(geo.latitude) || on_line(geo.longitude) {
                return Rgba([40, 40, 40, 255]);
            }
        }

        let elevation = self.elevation(direction);
        if geo.latitude.abs() > 75.0 + 5.0 * elevation {
            return Rgba([240, 244, 250, 255]);
        }
        let shade = |base: [f64; 3], k: f64| {
            Rgba([
                (base[0] * k).clamp(0.0, 255.0) as u8,
                (base[1] * k).clamp(0.0, 255.0) as u8,
                (base[2] * k).clamp(0.0, 255.0) as u8,
                255,
            ])
        };
        match elevation {
            e if e < 0.0 => shade([30.0, 70.0, 160.0], 1.0 + e),
            e if e < 0.04 => shade([210.0, 200.0, 150.0], 1.0),
            e if e < 0.35 => shade([60.0, 130.0, 50.0], 1.1 - e),
            e if e < 0.55 => shade([120.0, 100.0, 70.0], 1.0),
            _ => Rgba([235, 235, 235, 255]),
        }
    }
}

impl TileSource for ProceduralSource {
    fn fetch(&self, address: TileAddress) -> Result<RgbaImage, TileError> {
        let scale = address.face_scale();
        let (origin_s, origin_t) = address.face_origin();
        let size = f64::from(self.size);
        let pixel_scale = scale / size;
        // A face spans about 90 degrees of arc.
        let pixel_degrees = 0.5 * 45.0 * pixel_scale;

        Ok(RgbaImage::from_fn(self.size, self.size, |i, j| {
            let s = origin_s + pixel_scale * (f64::from(i) + 0.5);
            let t = origin_t + pixel_scale * (f64::from(j) + 0.5);
            self.colour(cube_to_sphere(address.face, s, t), pixel_degrees)
        }))
    }
}

/// File naming of a tile directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TileLayout {
    /// `<root>/<face>/<lod>/<x>_<y>.<ext>`
    #[default]
    LodXy,
    /// `<root>/<face>/<quadkey>.<ext>`; face roots are named `root`.
    Quadkey,
}

/// Pre-rendered tiles read from disk. Faces are directories named by face
/// index.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
    layout: TileLayout,
    extension: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, layout: TileLayout) -> Self {
        Self {
            root: root.into(),
            layout,
            extension: "png".to_owned(),
        }
    }

    /// Read `.jpg` or other files instead of `.png`.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_owned();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds `address`.
    pub fn path_for(&self, address: TileAddress) -> PathBuf {
        let face_dir = self.root.join(address.face.index().to_string());
        match self.layout {
            TileLayout::LodXy => face_dir
                .join(address.lod.to_string())
                .join(format!("{}_{}.{}", address.x, address.y, self.extension)),
            TileLayout::Quadkey => {
                let key = address.quadkey();
                let stem = if key.is_empty() { "root" } else { key.as_str() };
                face_dir.join(format!("{stem}.{}", self.extension))
            }
        }
    }
}

impl TileSource for DirectorySource {
    fn fetch(&self, address: TileAddress) -> Result<RgbaImage, TileError> {
        let path = self.path_for(address);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(TileError::Missing(address)),
            Err(e) => return Err(TileError::Io(e)),
        };
        Ok(image::load_from_memory(&bytes)?.into_rgba8())
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::InitError;
use crate::lighting::MAX_SPOTLIGHTS;

/// Complete description of the walk-through session.
///
/// Every field has a default that reproduces the reference gallery, so a
/// JSON file only needs to list the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkthroughConfig {
    pub room: RoomConfig,
    pub pedestals: PedestalConfig,
    pub camera: CameraConfig,
    pub navigation: NavigationConfig,
    pub sun: ShadowLightConfig,
    pub window_light: ShadowLightConfig,
    pub spotlights: Vec<SpotlightConfig>,
    pub fog: FogConfig,
    pub dust: DustConfig,
    pub assets: AssetConfig,
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        Self {
            room: RoomConfig::default(),
            pedestals: PedestalConfig::default(),
            camera: CameraConfig::default(),
            navigation: NavigationConfig::default(),
            sun: ShadowLightConfig::sun(),
            window_light: ShadowLightConfig::window(),
            spotlights: default_spotlights(),
            fog: FogConfig::default(),
            dust: DustConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl WalkthroughConfig {
    /// Reads a JSON configuration file, filling omitted fields with defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config = serde_json::from_str(text).context("config is not valid JSON")?;
        Ok(config)
    }

    /// Rejects configurations the renderer cannot start with.
    pub fn validate(&self) -> Result<(), InitError> {
        let room = &self.room;
        if room.width <= 0.0 || room.depth <= 0.0 || room.height <= 0.0 {
            return Err(InitError::Config(format!(
                "room dimensions must be positive, got {} x {} x {}",
                room.width, room.depth, room.height
            )));
        }
        let aperture = &room.window;
        if aperture.width >= room.width || aperture.sill + aperture.height >= room.height {
            return Err(InitError::Config(
                "window aperture does not fit inside the back wall".into(),
            ));
        }
        for (name, light) in [("sun", &self.sun), ("window_light", &self.window_light)] {
            if light.map_size == 0 {
                return Err(InitError::ZeroSizedShadowTarget(name.to_string()));
            }
            if light.direction.length_squared() <= f32::EPSILON {
                return Err(InitError::Config(format!("{name} direction is zero")));
            }
            if light.near <= 0.0 || light.far <= light.near {
                return Err(InitError::Config(format!(
                    "{name} depth range {}..{} is empty",
                    light.near, light.far
                )));
            }
        }
        if self.spotlights.len() > MAX_SPOTLIGHTS {
            return Err(InitError::Config(format!(
                "at most {MAX_SPOTLIGHTS} spotlights are supported, got {}",
                self.spotlights.len()
            )));
        }
        if self.navigation.camera_margin * 2.0 >= room.width.min(room.depth)
            || self.navigation.actor_margin * 2.0 >= room.width.min(room.depth)
        {
            return Err(InitError::Config("navigation margin exceeds the room".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    pub window: WindowAperture,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            width: 12.0,
            depth: 16.0,
            height: 4.0,
            window: WindowAperture::default(),
        }
    }
}

impl RoomConfig {
    /// Half extents of the floor rectangle along x and z.
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.depth * 0.5)
    }
}

/// Hole cut into the back wall, centred on x = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowAperture {
    pub width: f32,
    pub height: f32,
    pub sill: f32,
}

impl Default for WindowAperture {
    fn default() -> Self {
        Self {
            width: 4.5,
            height: 2.2,
            sill: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedestalConfig {
    /// Ground anchors of the pedestals; each one is also a keep-out zone.
    pub anchors: Vec<Vec3>,
    pub size: Vec3,
    /// Half size of the keep-out square before the navigation margin.
    pub footprint_half_size: f32,
}

impl Default for PedestalConfig {
    fn default() -> Self {
        Self {
            anchors: vec![
                Vec3::new(-3.0, 0.0, -2.0),
                Vec3::new(2.0, 0.0, -2.0),
                Vec3::new(4.0, 0.0, -2.0),
            ],
            size: Vec3::new(0.9, 1.2, 0.9),
            footprint_half_size: 0.45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub initial_yaw: f32,
    pub initial_pitch: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.6, 6.0),
            target: Vec3::new(0.0, 1.6, 0.0),
            up: Vec3::Y,
            fov_degrees: 45.0,
            near: 0.1,
            far: 20.0,
            initial_yaw: -90.0,
            initial_pitch: 0.0,
        }
    }
}

/// Per-frame step sizes and clamp margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub eye_height: f32,
    pub camera_margin: f32,
    pub actor_start: Vec3,
    pub actor_yaw: f32,
    pub actor_speed: f32,
    pub actor_turn_degrees: f32,
    pub actor_margin: f32,
    pub actor_anim_step: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            camera_speed: 0.1,
            mouse_sensitivity: 0.08,
            eye_height: 1.6,
            camera_margin: 0.35,
            actor_start: Vec3::new(0.0, 0.0, 2.0),
            actor_yaw: 180.0,
            actor_speed: 0.1,
            actor_turn_degrees: 3.0,
            actor_margin: 0.5,
            actor_anim_step: 0.02,
        }
    }
}

/// A directional light that renders its own shadow map.
///
/// Fields missing from a partial JSON object are taken from the sun preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowLightConfig {
    /// Direction the light travels, from the light into the room.
    pub direction: Vec3,
    pub color: Vec3,
    pub center: Vec3,
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    pub map_size: u32,
}

impl ShadowLightConfig {
    pub fn sun() -> Self {
        Self {
            direction: Vec3::new(1.0, -1.0, -0.3).normalize(),
            color: Vec3::ONE,
            center: Vec3::new(0.0, 1.5, 0.0),
            half_extent: 12.0,
            near: 1.0,
            far: 25.0,
            map_size: 2048,
        }
    }

    pub fn window() -> Self {
        Self {
            direction: Vec3::new(0.0, -0.2, 1.0).normalize(),
            color: Vec3::new(0.6, 0.7, 0.9),
            center: Vec3::new(0.0, 1.5, -2.0),
            half_extent: 10.0,
            near: 1.0,
            far: 25.0,
            map_size: 2048,
        }
    }
}

impl Default for ShadowLightConfig {
    fn default() -> Self {
        Self::sun()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightConfig {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub inner_degrees: f32,
    pub outer_degrees: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub intensity: f32,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.5, 0.0),
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            inner_degrees: 12.5,
            outer_degrees: 17.5,
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            intensity: 2.0,
        }
    }
}

fn default_spotlights() -> Vec<SpotlightConfig> {
    [
        (Vec3::new(-3.0, 2.5, -2.0), Vec3::new(1.0, 0.9, 0.8)),
        (Vec3::new(2.0, 2.5, -2.0), Vec3::new(0.8, 0.9, 1.0)),
        (Vec3::new(4.0, 2.5, -2.0), Vec3::new(0.9, 1.0, 0.9)),
    ]
    .into_iter()
    .map(|(position, color)| SpotlightConfig {
        position,
        color,
        ..SpotlightConfig::default()
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub density: f32,
    pub color: Vec3,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            density: 0.05,
            color: Vec3::splat(0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DustConfig {
    pub count: usize,
    pub seed: u64,
    pub size: f32,
    pub alpha: f32,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            count: 250,
            seed: 0x6d6f7465,
            size: 0.008,
            alpha: 0.6,
        }
    }
}

/// Paths are resolved against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: PathBuf,
    pub floor: MaterialPaths,
    pub wall: MaterialPaths,
    pub glass: MaterialPaths,
    pub sky: MaterialPaths,
    pub models: ModelPaths,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            floor: MaterialPaths {
                diffuse: Some("textures/marble_01_diff_4k.jpg".into()),
                specular: Some("textures/marble_01_disp_4k.png".into()),
                roughness: Some("textures/marble_01_rough_4k.jpg".into()),
                normal: Some("textures/marble_01_nor_gl_4k.png".into()),
                opacity: None,
            },
            wall: MaterialPaths {
                diffuse: Some("textures/white_plaster_02_diff_4k.jpg".into()),
                specular: Some("textures/white_plaster_02_diff_4k.jpg".into()),
                roughness: Some("textures/white_plaster_02_rough_4k.jpg".into()),
                normal: Some("textures/white_plaster_02_nor_gl_4k.png".into()),
                opacity: None,
            },
            glass: MaterialPaths {
                diffuse: Some("textures/Window_001_basecolor.jpg".into()),
                specular: Some("textures/Window_001_metallic.jpg".into()),
                roughness: Some("textures/Window_001_roughness.jpg".into()),
                normal: Some("textures/Window_001_normal.jpg".into()),
                opacity: Some("textures/Window_001_opacity.jpg".into()),
            },
            sky: MaterialPaths {
                diffuse: Some("textures/blue-sky-with-windy-clouds-vertical-shot.jpg".into()),
                ..MaterialPaths::default()
            },
            models: ModelPaths::default(),
        }
    }
}

impl AssetConfig {
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

/// Texture maps of one surface material; missing maps use neutral defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MaterialPaths {
    pub diffuse: Option<PathBuf>,
    pub specular: Option<PathBuf>,
    pub roughness: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub opacity: Option<PathBuf>,
}

/// One OBJ file per decorative slot; a slot without a mesh is not drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub antonius: Option<ModelSource>,
    pub judas: Option<ModelSource>,
    pub krieger: Option<ModelSource>,
    pub egypt_door: Option<ModelSource>,
    pub museum_entrance: Option<ModelSource>,
    pub painting: Option<ModelSource>,
    pub person: Option<ModelSource>,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            antonius: Some(ModelSource::new("models/antonius/Antonius_C.obj")),
            judas: Some(ModelSource::new("models/judas-thaddaus/Judas_C.obj")),
            krieger: Some(ModelSource::new("models/kriegerdenkmal/Kriegerdenkmal_C.obj")),
            egypt_door: Some(ModelSource::new("models/egyptian-door/textured_output.obj")),
            museum_entrance: Some(ModelSource::new(
                "models/museum-entrance/MuseumOfLondonStaffEntrance03.obj",
            )),
            painting: Some(ModelSource::new("models/horror-paintings/Paintings.obj")),
            person: Some(ModelSource::new("models/person/Duda.obj")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    pub mesh: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<PathBuf>,
}

impl ModelSource {
    pub fn new(mesh: impl Into<PathBuf>) -> Self {
        Self {
            mesh: mesh.into(),
            texture: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_reference_gallery() {
        let config = WalkthroughConfig::default();
        assert_eq!(config.room.half_extents(), Vec2::new(6.0, 8.0));
        assert_eq!(config.pedestals.anchors.len(), 3);
        assert_eq!(config.spotlights.len(), 3);
        assert!((config.spotlights[0].intensity - 2.0).abs() < f32::EPSILON);
        assert!(config.window_light.half_extent < config.sun.half_extent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let config = WalkthroughConfig::from_json(
            r#"{ "fog": { "density": 0.1 }, "dust": { "count": 12 } }"#,
        )
        .unwrap();
        assert!((config.fog.density - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.fog.color, Vec3::splat(0.5));
        assert_eq!(config.dust.count, 12);
        assert_eq!(config.room, RoomConfig::default());
        assert_eq!(config.window_light, ShadowLightConfig::window());
    }

    #[test]
    fn zero_sized_shadow_target_is_rejected() {
        let mut config = WalkthroughConfig::default();
        config.window_light.map_size = 0;
        assert!(matches!(
            config.validate(),
            Err(InitError::ZeroSizedShadowTarget(name)) if name == "window_light"
        ));
    }

    #[test]
    fn too_many_spotlights_are_rejected() {
        let mut config = WalkthroughConfig::default();
        config.spotlights = vec![SpotlightConfig::default(); MAX_SPOTLIGHTS + 1];
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(WalkthroughConfig::from_json("{ room: ").is_err());
    }
}

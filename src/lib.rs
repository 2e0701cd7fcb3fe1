//! Walk-through of a single gallery room lit by a sun and a window light,
//! each with its own shadow map, rendered with wgpu.
//!
//! Everything up to the per-frame [`FrameContext`] is plain data and runs
//! without a GPU: camera and actor motion, collision clamping, light-space
//! solving, scene placement and pass ordering. The [`render`] module turns
//! a frame context into the shadow and main passes.

pub mod actor;
pub mod app;
pub mod camera;
pub mod clamp;
pub mod config;
pub mod dust;
pub mod error;
pub mod frame;
pub mod input;
pub mod lighting;
pub mod obj;
pub mod pass_plan;
pub mod placement;
pub mod render;
pub mod session;

pub use actor::{ActorPose, NavigableActor};
pub use camera::{Camera, LookAngles, MoveDirection};
pub use clamp::{KeepOutZone, SpatialClamp};
pub use config::WalkthroughConfig;
pub use error::InitError;
pub use frame::FrameContext;
pub use input::{InputSnapshot, InputState, KeyCode, NamedKey};
pub use lighting::{compute_light_space, LightSpaceTransform, ShadowCaster, ShadowLight};
pub use obj::{load_obj_from_str, MeshData};
pub use pass_plan::{FramePass, PassOrderError, PassSequencer};
pub use placement::{place_scene, PlacedInstance, SceneLayout};
pub use render::{RenderError, Renderer};
pub use session::Walkthrough;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::actor::ActorPose;
use crate::clamp::KeepOutZone;
use crate::config::{WalkthroughConfig, WindowAperture};

const FLOOR_TILING: Vec2 = Vec2::new(6.0, 6.0);
const WALL_TILING: Vec2 = Vec2::new(4.0, 2.0);
const SKY_DEPTH: f32 = 0.5;
const SKY_OVERSCAN: f32 = 1.2;
const GLASS_INSET: f32 = 0.01;
const GLASS_OPACITY: f32 = 0.4;
const GLASS_RECT: Vec4 = Vec4::new(0.14648, 0.24707, 0.85254, 0.75195);
const STATUE_LIFT: f32 = 0.02;
const STATUE_BOB: f32 = 0.05;
const ACTOR_SCALE: f32 = 0.01;
const LAMP_DROP: f32 = 0.1;
const LAMP_SIZE: Vec3 = Vec3::new(0.4, 0.05, 0.4);

/// Decorative models the gallery knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    Antonius,
    Judas,
    Krieger,
    EgyptDoor,
    MuseumEntrance,
    Painting,
    Person,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 7] = [
        ModelSlot::Antonius,
        ModelSlot::Judas,
        ModelSlot::Krieger,
        ModelSlot::EgyptDoor,
        ModelSlot::MuseumEntrance,
        ModelSlot::Painting,
        ModelSlot::Person,
    ];

    /// Statues standing on the pedestals, in pedestal order.
    pub const STATUES: [ModelSlot; 3] = [ModelSlot::Antonius, ModelSlot::Judas, ModelSlot::Krieger];

    pub fn label(self) -> &'static str {
        match self {
            ModelSlot::Antonius => "antonius",
            ModelSlot::Judas => "judas",
            ModelSlot::Krieger => "krieger",
            ModelSlot::EgyptDoor => "egypt_door",
            ModelSlot::MuseumEntrance => "museum_entrance",
            ModelSlot::Painting => "painting",
            ModelSlot::Person => "person",
        }
    }

    fn statue_scale(self) -> f32 {
        match self {
            ModelSlot::Judas => 0.22,
            ModelSlot::Krieger => 0.09,
            _ => 0.20,
        }
    }
}

/// Geometry an instance is drawn with. Quads lie in the local XY plane
/// facing +Z and cubes span -0.5..0.5 on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drawable {
    Quad,
    Cube,
    Model(ModelSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialId {
    Floor,
    Wall,
    Glass,
    Sky,
    Dust,
    Model(ModelSlot),
}

/// Texture coordinate transform: `uv * tiling + offset`, then remapped into
/// the `rect` sub-region (min.xy, max.xy) of the texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvParams {
    pub tiling: Vec2,
    pub offset: Vec2,
    pub rect: Vec4,
}

impl UvParams {
    pub const IDENTITY: UvParams = UvParams {
        tiling: Vec2::ONE,
        offset: Vec2::ZERO,
        rect: Vec4::new(0.0, 0.0, 1.0, 1.0),
    };

    pub fn tiled(tiling: Vec2) -> Self {
        Self {
            tiling,
            ..Self::IDENTITY
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    Lit,
    /// Unlit colour, multiplied by `alpha` when blending.
    Fullbright { alpha: f32 },
    /// Lit, with the opacity mask deciding where `opacity` applies.
    Glass { opacity: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialBinding {
    pub id: MaterialId,
    pub uv: UvParams,
    pub surface: SurfaceKind,
}

impl MaterialBinding {
    pub fn lit(id: MaterialId, uv: UvParams) -> Self {
        Self {
            id,
            uv,
            surface: SurfaceKind::Lit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    Opaque,
    Transparent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedInstance {
    pub label: &'static str,
    pub drawable: Drawable,
    pub transform: Mat4,
    pub material: MaterialBinding,
    pub phase: RenderPhase,
    pub casts_shadow: bool,
}

impl PlacedInstance {
    fn opaque(
        label: &'static str,
        drawable: Drawable,
        transform: Mat4,
        material: MaterialBinding,
        casts_shadow: bool,
    ) -> Self {
        Self {
            label,
            drawable,
            transform,
            material,
            phase: RenderPhase::Opaque,
            casts_shadow,
        }
    }
}

/// A model placed once with a fixed transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorPlacement {
    pub slot: ModelSlot,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

/// Static room description that placement depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    pub window: WindowAperture,
    pub pedestal_anchors: Vec<Vec3>,
    pub pedestal_size: Vec3,
    pub footprint_half_size: f32,
    pub lamp_anchors: Vec<Vec3>,
    pub decor: Vec<DecorPlacement>,
}

impl SceneLayout {
    pub fn from_config(config: &WalkthroughConfig) -> Self {
        let room = &config.room;
        let decor = vec![
            DecorPlacement {
                slot: ModelSlot::EgyptDoor,
                translation: Vec3::new(room.width * 0.5 - 0.3, 1.5, 2.0),
                rotation: Quat::from_rotation_y((-90.0f32).to_radians()),
                scale: 4.0,
            },
            DecorPlacement {
                slot: ModelSlot::MuseumEntrance,
                translation: Vec3::new(-2.0, 0.8, room.depth * 0.5 - 1.5),
                rotation: Quat::from_rotation_x((-90.0f32).to_radians())
                    * Quat::from_rotation_z(180.0f32.to_radians()),
                scale: 0.1,
            },
            DecorPlacement {
                slot: ModelSlot::Painting,
                translation: Vec3::new(-room.width * 0.5 + 0.3, 1.3, 0.0),
                rotation: Quat::from_rotation_y(90.0f32.to_radians()),
                scale: 0.2,
            },
        ];
        Self {
            width: room.width,
            depth: room.depth,
            height: room.height,
            window: room.window.clone(),
            pedestal_anchors: config.pedestals.anchors.clone(),
            pedestal_size: config.pedestals.size,
            footprint_half_size: config.pedestals.footprint_half_size,
            lamp_anchors: config.spotlights.iter().map(|spot| spot.position).collect(),
            decor,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.depth * 0.5)
    }

    /// One keep-out square per pedestal.
    pub fn keep_out_zones(&self) -> Vec<KeepOutZone> {
        self.pedestal_anchors
            .iter()
            .map(|anchor| KeepOutZone::square(Vec2::new(anchor.x, anchor.z), self.footprint_half_size))
            .collect()
    }

    /// World-space rectangle of the window hole: (x_min, y_min, x_max, y_max).
    pub fn window_hole(&self) -> Vec4 {
        let half = self.window.width * 0.5;
        Vec4::new(-half, self.window.sill, half, self.window.sill + self.window.height)
    }

    fn back_z(&self) -> f32 {
        -self.depth * 0.5
    }
}

fn trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Places every instance for time `time` (seconds) and the actor pose.
///
/// Opaque instances come first in draw order; transparent ones follow.
pub fn place_scene(layout: &SceneLayout, time: f32, actor: &ActorPose) -> Vec<PlacedInstance> {
    let mut instances = Vec::with_capacity(24);

    instances.push(place_actor(actor));
    place_shell(layout, &mut instances);
    instances.push(place_sky(layout));
    place_pedestals(layout, time, &mut instances);
    for decor in &layout.decor {
        instances.push(PlacedInstance::opaque(
            decor.slot.label(),
            Drawable::Model(decor.slot),
            trs(decor.translation, decor.rotation, Vec3::splat(decor.scale)),
            MaterialBinding::lit(MaterialId::Model(decor.slot), UvParams::IDENTITY),
            true,
        ));
    }
    for anchor in &layout.lamp_anchors {
        instances.push(PlacedInstance::opaque(
            "lamp",
            Drawable::Cube,
            trs(
                Vec3::new(anchor.x, layout.height - LAMP_DROP, anchor.z),
                Quat::IDENTITY,
                LAMP_SIZE,
            ),
            MaterialBinding::lit(MaterialId::Wall, UvParams::IDENTITY),
            true,
        ));
    }
    instances.push(place_glass(layout));

    instances
}

fn place_actor(actor: &ActorPose) -> PlacedInstance {
    let position = actor.position + Vec3::new(0.0, 0.0, actor.walk_offset());
    PlacedInstance::opaque(
        "actor",
        Drawable::Model(ModelSlot::Person),
        trs(
            position,
            Quat::from_rotation_y(actor.yaw_degrees.to_radians()),
            Vec3::splat(ACTOR_SCALE),
        ),
        MaterialBinding::lit(MaterialId::Model(ModelSlot::Person), UvParams::IDENTITY),
        true,
    )
}

fn place_shell(layout: &SceneLayout, out: &mut Vec<PlacedInstance>) {
    let (w, d, h) = (layout.width, layout.depth, layout.height);
    let wall = |uv| MaterialBinding::lit(MaterialId::Wall, uv);

    out.push(PlacedInstance::opaque(
        "floor",
        Drawable::Quad,
        trs(
            Vec3::ZERO,
            Quat::from_rotation_x((-90.0f32).to_radians()),
            Vec3::new(w, d, 1.0),
        ),
        MaterialBinding::lit(MaterialId::Floor, UvParams::tiled(FLOOR_TILING)),
        true,
    ));
    out.push(PlacedInstance::opaque(
        "ceiling",
        Drawable::Quad,
        trs(
            Vec3::new(0.0, h, 0.0),
            Quat::from_rotation_x(90.0f32.to_radians()),
            Vec3::new(w, d, 1.0),
        ),
        wall(UvParams::tiled(WALL_TILING)),
        false,
    ));
    out.push(PlacedInstance::opaque(
        "front_wall",
        Drawable::Quad,
        trs(
            Vec3::new(0.0, h * 0.5, d * 0.5),
            Quat::from_rotation_y(180.0f32.to_radians()),
            Vec3::new(w, h, 1.0),
        ),
        wall(UvParams::tiled(WALL_TILING)),
        false,
    ));
    out.push(PlacedInstance::opaque(
        "left_wall",
        Drawable::Quad,
        trs(
            Vec3::new(-w * 0.5, h * 0.5, 0.0),
            Quat::from_rotation_y(90.0f32.to_radians()),
            Vec3::new(d, h, 1.0),
        ),
        wall(UvParams::tiled(WALL_TILING)),
        false,
    ));
    out.push(PlacedInstance::opaque(
        "right_wall",
        Drawable::Quad,
        trs(
            Vec3::new(w * 0.5, h * 0.5, 0.0),
            Quat::from_rotation_y((-90.0f32).to_radians()),
            Vec3::new(d, h, 1.0),
        ),
        wall(UvParams::tiled(WALL_TILING)),
        false,
    ));

    // Back wall pieces framing the hole: left, right, below, above.
    let hole = layout.window_hole();
    let pieces = [
        ("back_wall_left", -w * 0.5, hole.x, 0.0, h),
        ("back_wall_right", hole.z, w * 0.5, 0.0, h),
        ("back_wall_below", hole.x, hole.z, 0.0, hole.y),
        ("back_wall_above", hole.x, hole.z, hole.w, h),
    ];
    for (label, x0, x1, y0, y1) in pieces {
        if x1 - x0 <= f32::EPSILON || y1 - y0 <= f32::EPSILON {
            continue;
        }
        // Tiling and offset keep the plaster continuous across the pieces.
        let uv = UvParams {
            tiling: WALL_TILING * Vec2::new((x1 - x0) / w, (y1 - y0) / h),
            offset: WALL_TILING * Vec2::new((x0 + w * 0.5) / w, (h - y1) / h),
            rect: UvParams::IDENTITY.rect,
        };
        out.push(PlacedInstance::opaque(
            label,
            Drawable::Quad,
            trs(
                Vec3::new((x0 + x1) * 0.5, (y0 + y1) * 0.5, layout.back_z()),
                Quat::IDENTITY,
                Vec3::new(x1 - x0, y1 - y0, 1.0),
            ),
            wall(uv),
            true,
        ));
    }
}

fn window_center(layout: &SceneLayout) -> Vec2 {
    Vec2::new(0.0, layout.window.sill + layout.window.height * 0.5)
}

fn place_sky(layout: &SceneLayout) -> PlacedInstance {
    let center = window_center(layout);
    PlacedInstance::opaque(
        "sky",
        Drawable::Quad,
        trs(
            Vec3::new(center.x, center.y, layout.back_z() - SKY_DEPTH),
            Quat::IDENTITY,
            Vec3::new(
                layout.window.width * SKY_OVERSCAN,
                layout.window.height * SKY_OVERSCAN,
                1.0,
            ),
        ),
        MaterialBinding {
            id: MaterialId::Sky,
            uv: UvParams::IDENTITY,
            surface: SurfaceKind::Fullbright { alpha: 1.0 },
        },
        false,
    )
}

fn place_pedestals(layout: &SceneLayout, time: f32, out: &mut Vec<PlacedInstance>) {
    let size = layout.pedestal_size;
    for anchor in &layout.pedestal_anchors {
        out.push(PlacedInstance::opaque(
            "pedestal",
            Drawable::Cube,
            trs(
                Vec3::new(anchor.x, anchor.y + size.y * 0.5, anchor.z),
                Quat::IDENTITY,
                size,
            ),
            MaterialBinding::lit(MaterialId::Wall, UvParams::IDENTITY),
            true,
        ));
    }
    for (index, (anchor, slot)) in layout
        .pedestal_anchors
        .iter()
        .zip(ModelSlot::STATUES)
        .enumerate()
    {
        let i = index as f32;
        let spin = (time * (40.0 + 15.0 * i)).to_radians();
        let bob = STATUE_BOB * (2.0 * time + i).sin();
        let lift = anchor.y + size.y + STATUE_LIFT + bob;
        out.push(PlacedInstance::opaque(
            slot.label(),
            Drawable::Model(slot),
            trs(
                Vec3::new(anchor.x, lift, anchor.z),
                Quat::from_rotation_y(spin),
                Vec3::splat(slot.statue_scale()),
            ),
            MaterialBinding::lit(MaterialId::Model(slot), UvParams::IDENTITY),
            true,
        ));
    }
}

fn place_glass(layout: &SceneLayout) -> PlacedInstance {
    let center = window_center(layout);
    PlacedInstance {
        label: "glass",
        drawable: Drawable::Quad,
        transform: trs(
            Vec3::new(center.x, center.y, layout.back_z() + GLASS_INSET),
            Quat::IDENTITY,
            Vec3::new(layout.window.width, layout.window.height, 1.0),
        ),
        material: MaterialBinding {
            id: MaterialId::Glass,
            uv: UvParams {
                rect: GLASS_RECT,
                ..UvParams::IDENTITY
            },
            surface: SurfaceKind::Glass {
                opacity: GLASS_OPACITY,
            },
        },
        phase: RenderPhase::Transparent,
        casts_shadow: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::NavigableActor;

    fn layout() -> SceneLayout {
        SceneLayout::from_config(&WalkthroughConfig::default())
    }

    fn actor() -> ActorPose {
        NavigableActor::new(Vec3::new(0.0, 0.0, 2.0), 180.0).pose()
    }

    fn find<'a>(instances: &'a [PlacedInstance], label: &str) -> &'a PlacedInstance {
        instances
            .iter()
            .find(|instance| instance.label == label)
            .unwrap_or_else(|| panic!("missing {label}"))
    }

    #[test]
    fn placement_is_deterministic() {
        let layout = layout();
        let a = place_scene(&layout, 3.25, &actor());
        let b = place_scene(&layout, 3.25, &actor());
        assert_eq!(a, b);
        assert_ne!(a, place_scene(&layout, 3.5, &actor()));
    }

    #[test]
    fn opaque_instances_precede_transparent() {
        let instances = place_scene(&layout(), 0.0, &actor());
        let first_transparent = instances
            .iter()
            .position(|i| i.phase == RenderPhase::Transparent)
            .unwrap();
        assert!(instances[first_transparent..]
            .iter()
            .all(|i| i.phase == RenderPhase::Transparent));
        assert_eq!(instances[0].label, "actor");
        assert_eq!(instances.last().unwrap().label, "glass");
    }

    #[test]
    fn back_wall_leaves_the_window_open() {
        let layout = layout();
        let instances = place_scene(&layout, 0.0, &actor());
        let hole = layout.window_hole();
        let center = Vec3::new((hole.x + hole.z) * 0.5, (hole.y + hole.w) * 0.5, -8.0);
        let pieces: Vec<_> = instances
            .iter()
            .filter(|i| i.label.starts_with("back_wall"))
            .collect();
        assert_eq!(pieces.len(), 4);
        let mut area = 0.0;
        for piece in pieces {
            let local = piece.transform.inverse().transform_point3(center);
            assert!(local.x.abs() > 0.5 || local.y.abs() > 0.5, "{} covers the hole", piece.label);
            let (scale, _, _) = piece.transform.to_scale_rotation_translation();
            area += scale.x * scale.y;
        }
        let expected = layout.width * layout.height - layout.window.width * layout.window.height;
        assert!((area - expected).abs() < 1e-3);
    }

    #[test]
    fn sky_and_glass_surfaces() {
        let instances = place_scene(&layout(), 1.0, &actor());
        let sky = find(&instances, "sky");
        assert_eq!(sky.phase, RenderPhase::Opaque);
        assert!(matches!(sky.material.surface, SurfaceKind::Fullbright { .. }));
        assert!(!sky.casts_shadow);
        assert!(sky.transform.w_axis.z < -8.0);

        let glass = find(&instances, "glass");
        assert_eq!(glass.phase, RenderPhase::Transparent);
        assert!(!glass.casts_shadow);
        assert!(glass.transform.w_axis.z > -8.0);
        assert_eq!(glass.material.uv.rect, GLASS_RECT);
    }

    #[test]
    fn statues_spin_and_bob_above_pedestals() {
        let layout = layout();
        let instances = place_scene(&layout, 2.0, &actor());
        let judas = find(&instances, "judas");
        let top = layout.pedestal_size.y + STATUE_LIFT;
        let expected_bob = STATUE_BOB * (2.0f32 * 2.0 + 1.0).sin();
        assert!((judas.transform.w_axis.y - (top + expected_bob)).abs() < 1e-5);
        let (_, rotation, _) = judas.transform.to_scale_rotation_translation();
        let angle = rotation.angle_between(Quat::IDENTITY).to_degrees();
        assert!((angle - 110.0).abs() < 1e-2, "{angle}");
    }

    #[test]
    fn actor_sways_while_animating() {
        let layout = layout();
        let mut walker = NavigableActor::new(Vec3::new(0.0, 0.0, 2.0), 180.0);
        walker.toggle_animation();
        for _ in 0..40 {
            walker.advance(0.02);
        }
        let pose = walker.pose();
        let instances = place_scene(&layout, 0.0, &pose);
        let placed = find(&instances, "actor");
        assert!((placed.transform.w_axis.z - (2.0 + pose.walk_offset())).abs() < 1e-5);
    }

    #[test]
    fn keep_out_zones_follow_pedestals() {
        let zones = layout().keep_out_zones();
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[1], KeepOutZone::square(Vec2::new(2.0, -2.0), 0.45));
    }
}

pub const SHADOW_SHADER: &str = r#"
struct LightSpace {
    view_proj: mat4x4<f32>,
}

struct Instance {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    uv_transform: vec4<f32>,
    uv_rect: vec4<f32>,
    surface: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> light: LightSpace;

@group(1) @binding(0)
var<uniform> instance: Instance;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return light.view_proj * instance.model * vec4<f32>(position, 1.0);
}
"#;

pub const LIT_SHADER: &str = r#"
struct Spot {
    position: vec4<f32>,
    direction: vec4<f32>,
    color: vec4<f32>,
    attenuation: vec4<f32>,
}

struct Globals {
    view_proj: mat4x4<f32>,
    sun_view_proj: mat4x4<f32>,
    window_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_color: vec4<f32>,
    window_direction: vec4<f32>,
    window_color: vec4<f32>,
    fog: vec4<f32>,
    settings: vec4<f32>,
    spots: array<Spot, 4>,
}

struct Instance {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    uv_transform: vec4<f32>,
    uv_rect: vec4<f32>,
    surface: vec4<f32>,
}

struct Material {
    flags: vec4<f32>,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var<uniform> instance: Instance;

@group(2) @binding(0) var sun_shadow: texture_depth_2d;
@group(2) @binding(1) var window_shadow: texture_depth_2d;
@group(2) @binding(2) var shadow_sampler: sampler_comparison;

@group(3) @binding(0) var diffuse_map: texture_2d<f32>;
@group(3) @binding(1) var specular_map: texture_2d<f32>;
@group(3) @binding(2) var roughness_map: texture_2d<f32>;
@group(3) @binding(3) var normal_map: texture_2d<f32>;
@group(3) @binding(4) var opacity_map: texture_2d<f32>;
@group(3) @binding(5) var material_sampler: sampler;
@group(3) @binding(6) var mask_sampler: sampler;
@group(3) @binding(7) var<uniform> material: Material;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = instance.model * vec4<f32>(input.position, 1.0);
    out.clip_position = globals.view_proj * world;
    out.world_pos = world.xyz;
    let normal_matrix = mat3x3<f32>(
        instance.normal[0].xyz,
        instance.normal[1].xyz,
        instance.normal[2].xyz
    );
    out.normal = normalize(normal_matrix * input.normal);
    let tiled = input.uv * instance.uv_transform.xy + instance.uv_transform.zw;
    out.uv = instance.uv_rect.xy + tiled * (instance.uv_rect.zw - instance.uv_rect.xy);
    return out;
}

// 3x3 percentage-closer filter; fragments outside the map count as lit.
fn shadow_factor(map: texture_depth_2d, view_proj: mat4x4<f32>, world_pos: vec3<f32>, bias: f32) -> f32 {
    let clip = view_proj * vec4<f32>(world_pos, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0) {
        return 1.0;
    }
    let texel = 1.0 / vec2<f32>(textureDimensions(map));
    var lit = 0.0;
    for (var x = -1; x <= 1; x++) {
        for (var y = -1; y <= 1; y++) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(map, shadow_sampler, uv + offset, ndc.z - bias);
        }
    }
    return lit / 9.0;
}

fn perturb_normal(n: vec3<f32>, dp1: vec3<f32>, dp2: vec3<f32>, duv1: vec2<f32>, duv2: vec2<f32>, tangent_normal: vec3<f32>) -> vec3<f32> {
    let dp2perp = cross(dp2, n);
    let dp1perp = cross(n, dp1);
    let t = dp2perp * duv1.x + dp1perp * duv2.x;
    let b = dp2perp * duv1.y + dp1perp * duv2.y;
    let inv_max = inverseSqrt(max(max(dot(t, t), dot(b, b)), 1e-12));
    let tbn = mat3x3<f32>(t * inv_max, b * inv_max, n);
    return normalize(tbn * tangent_normal);
}

fn blinn_phong(n: vec3<f32>, l: vec3<f32>, v: vec3<f32>, albedo: vec3<f32>, specular: f32, shininess: f32) -> vec3<f32> {
    let diffuse = max(dot(n, l), 0.0);
    let h = normalize(l + v);
    let highlight = pow(max(dot(n, h), 0.0), shininess) * specular * step(0.0, dot(n, l));
    return diffuse * albedo + vec3<f32>(highlight * 0.5);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    // Texture reads and derivatives stay in uniform control flow.
    let albedo = textureSample(diffuse_map, material_sampler, input.uv);
    let specular = textureSample(specular_map, material_sampler, input.uv).r;
    let roughness = textureSample(roughness_map, material_sampler, input.uv).r;
    let mapped = textureSample(normal_map, material_sampler, input.uv).xyz * 2.0 - 1.0;
    let mask = textureSample(opacity_map, mask_sampler, input.uv).r;
    let dp1 = dpdx(input.world_pos);
    let dp2 = dpdy(input.world_pos);
    let duv1 = dpdx(input.uv);
    let duv2 = dpdy(input.uv);

    let kind = instance.surface.x;
    if (kind > 0.5 && kind < 1.5) {
        return vec4<f32>(albedo.rgb, albedo.a * instance.surface.y);
    }

    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    var n = normalize(input.normal);
    if (material.flags.x > 0.5) {
        n = perturb_normal(n, dp1, dp2, duv1, duv2, mapped);
    }
    if (globals.settings.y > 0.5) {
        n = normalize(cross(dp1, dp2));
    }
    if (dot(n, view_dir) < 0.0) {
        n = -n;
    }

    let shininess = mix(64.0, 4.0, roughness);
    var color = globals.settings.z * albedo.rgb;

    let sun_l = -normalize(globals.sun_direction.xyz);
    let sun_bias = max(0.002 * (1.0 - dot(n, sun_l)), 0.0005);
    let sun_lit = shadow_factor(sun_shadow, globals.sun_view_proj, input.world_pos, sun_bias);
    color += sun_lit * globals.sun_color.rgb * blinn_phong(n, sun_l, view_dir, albedo.rgb, specular, shininess);

    let window_l = -normalize(globals.window_direction.xyz);
    let window_bias = max(0.002 * (1.0 - dot(n, window_l)), 0.0005);
    let window_lit = shadow_factor(window_shadow, globals.window_view_proj, input.world_pos, window_bias);
    color += window_lit * globals.window_color.rgb * blinn_phong(n, window_l, view_dir, albedo.rgb, specular, shininess);

    let spot_count = u32(globals.settings.x);
    for (var i = 0u; i < spot_count; i++) {
        let spot = globals.spots[i];
        let to_frag = input.world_pos - spot.position.xyz;
        let dist = length(to_frag);
        let l = -to_frag / max(dist, 1e-4);
        let theta = dot(-l, normalize(spot.direction.xyz));
        let cone = clamp((theta - spot.color.w) / max(spot.direction.w - spot.color.w, 1e-4), 0.0, 1.0);
        let attenuation = 1.0 / (spot.attenuation.x + spot.attenuation.y * dist + spot.attenuation.z * dist * dist);
        color += spot.color.rgb * spot.position.w * cone * attenuation * blinn_phong(n, l, view_dir, albedo.rgb, specular, shininess);
    }

    let fog_distance = length(globals.camera_position.xyz - input.world_pos);
    let fog_amount = exp(-pow(globals.fog.w * fog_distance, 2.0));
    color = mix(globals.fog.rgb, color, clamp(fog_amount, 0.0, 1.0));

    var alpha = albedo.a;
    if (kind > 1.5) {
        // White in the mask is frame, black is pane.
        let frame = select(0.0, mask, material.flags.y > 0.5);
        alpha = mix(instance.surface.y, 1.0, frame);
    }
    return vec4<f32>(color, alpha);
}
"#;

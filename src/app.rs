use log::info;

use crate::config::WalkthroughConfig;
use crate::error::InitError;
use crate::frame::FrameContext;
use crate::input::{InputState, KeyCode};
use crate::lighting::ShadowCaster;
use crate::pass_plan::{PassOrderError, PassSequencer, FRAME_ORDER};
use crate::placement::RenderPhase;
use crate::session::Walkthrough;

/// Simulated frame length when no window drives the clock.
pub const HEADLESS_FRAME_STEP: f32 = 1.0 / 60.0;

/// Viewport the headless run builds its frames for.
pub const HEADLESS_VIEWPORT: (u32, u32) = (1280, 720);

/// Result of stepping the walk-through without a window.
pub struct HeadlessRun {
    pub walkthrough: Walkthrough,
    pub last_frame: FrameContext,
}

/// Steps `frames` frames with `held` keys down from the first frame on,
/// walking the pass order of each frame without a GPU.
pub fn run_headless(
    config: WalkthroughConfig,
    frames: u32,
    held: &[KeyCode],
) -> Result<HeadlessRun, HeadlessError> {
    let mut walkthrough = Walkthrough::new(config)?;
    let (width, height) = HEADLESS_VIEWPORT;
    let mut sequencer = PassSequencer::new();
    let mut last_frame = walkthrough.frame_context(width, height, 0.0);
    let input = InputState::new();
    for key in held {
        input.set_key_down(*key);
    }

    for frame in 0..frames {
        let time = (frame + 1) as f32 * HEADLESS_FRAME_STEP;
        walkthrough.update(&input.snapshot(), time);
        last_frame = walkthrough.frame_context(width, height, time);

        sequencer.reset()?;
        for pass in FRAME_ORDER {
            sequencer.enter(pass)?;
        }
        sequencer.restore_depth_write();
        sequencer.finish()?;
        if walkthrough.exit_requested() {
            info!("exit requested after {} frames", frame + 1);
            break;
        }
    }

    Ok(HeadlessRun {
        walkthrough,
        last_frame,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    PassOrder(#[from] PassOrderError),
}

/// Instance counts of a frame grouped by label, in first-appearance order.
pub fn instance_groups(frame: &FrameContext) -> Vec<(&'static str, usize)> {
    let mut groups: Vec<(&'static str, usize)> = Vec::new();
    for instance in &frame.instances {
        match groups.iter_mut().find(|(label, _)| *label == instance.label) {
            Some((_, count)) => *count += 1,
            None => groups.push((instance.label, 1)),
        }
    }
    groups
}

pub fn print_summary(run: &HeadlessRun) {
    let frame = &run.last_frame;
    let room = &run.walkthrough.config().room;
    let casters = frame.shadow_casters().count();
    let transparent = frame.phase(RenderPhase::Transparent).count();
    println!(
        "Gallery {:.1} x {:.1} x {:.1} with {} instances ({} shadow casters, {} transparent)",
        room.width,
        room.depth,
        room.height,
        frame.instances.len(),
        casters,
        transparent
    );
    for (label, count) in instance_groups(frame) {
        println!(" - {label} x{count}");
    }
    for caster in ShadowCaster::ALL {
        let light = frame.shadow_light(caster);
        let center = light.transform.project(light_center(&run.walkthrough, caster));
        println!(
            " - {} shadow {}px, center maps to ({:.2}, {:.2}, {:.2})",
            caster.label(),
            light.map_size,
            center.x,
            center.y,
            center.z
        );
    }
    println!("{}", run.walkthrough.describe());
}

fn light_center(walkthrough: &Walkthrough, caster: ShadowCaster) -> glam::Vec3 {
    let config = walkthrough.config();
    match caster {
        ShadowCaster::Sun => config.sun.center,
        ShadowCaster::Window => config.window_light.center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_run_applies_held_keys_every_frame() {
        let held = [KeyCode::from_name("W").unwrap()];
        let run = run_headless(WalkthroughConfig::default(), 3, &held).unwrap();
        assert_eq!(run.walkthrough.frame_index(), 3);
        let z = run.walkthrough.camera().position().z;
        assert!((z - 5.7).abs() < 1e-4, "{z}");
    }

    #[test]
    fn escape_stops_the_run_early() {
        let held = [KeyCode::from_name("Escape").unwrap()];
        let run = run_headless(WalkthroughConfig::default(), 10, &held).unwrap();
        assert_eq!(run.walkthrough.frame_index(), 1);
    }

    #[test]
    fn groups_follow_draw_order() {
        let run = run_headless(WalkthroughConfig::default(), 1, &[]).unwrap();
        let groups = instance_groups(&run.last_frame);
        let total: usize = groups.iter().map(|(_, count)| count).sum();
        assert_eq!(total, run.last_frame.instances.len());
        assert_eq!(groups.first().map(|(label, _)| *label), Some(run.last_frame.instances[0].label));
    }
}

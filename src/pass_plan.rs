use thiserror::Error;

use crate::lighting::ShadowCaster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePass {
    Idle,
    Shadow(ShadowCaster),
    Opaque,
    Transparent,
    Finished,
}

/// Which program an instance is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Shadow,
    Lit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Replace,
    StraightAlpha,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PassOrderError {
    #[error("cannot enter {next:?} from {current:?}")]
    OutOfOrder { current: FramePass, next: FramePass },
    #[error("frame finished with depth writes still disabled")]
    DepthWriteNotRestored,
}

impl FramePass {
    pub fn depth(self) -> DepthState {
        match self {
            FramePass::Transparent => DepthState {
                test: true,
                write: false,
            },
            _ => DepthState {
                test: true,
                write: true,
            },
        }
    }

    pub fn blend(self) -> BlendMode {
        match self {
            FramePass::Transparent => BlendMode::StraightAlpha,
            _ => BlendMode::Replace,
        }
    }

    pub fn kind(self) -> Option<PassKind> {
        match self {
            FramePass::Shadow(_) => Some(PassKind::Shadow),
            FramePass::Opaque | FramePass::Transparent => Some(PassKind::Lit),
            FramePass::Idle | FramePass::Finished => None,
        }
    }

    fn successor(self) -> Option<FramePass> {
        match self {
            FramePass::Idle => Some(FramePass::Shadow(ShadowCaster::Sun)),
            FramePass::Shadow(ShadowCaster::Sun) => Some(FramePass::Shadow(ShadowCaster::Window)),
            FramePass::Shadow(ShadowCaster::Window) => Some(FramePass::Opaque),
            FramePass::Opaque => Some(FramePass::Transparent),
            FramePass::Transparent | FramePass::Finished => None,
        }
    }
}

/// Enforces sun shadow, window shadow, opaque, transparent for every frame.
#[derive(Debug)]
pub struct PassSequencer {
    current: FramePass,
    depth_write: bool,
}

impl Default for PassSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PassSequencer {
    pub fn new() -> Self {
        Self {
            current: FramePass::Idle,
            depth_write: true,
        }
    }

    pub fn current(&self) -> FramePass {
        self.current
    }

    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Moves to `next` and returns the depth state it must run with.
    pub fn enter(&mut self, next: FramePass) -> Result<DepthState, PassOrderError> {
        if self.current.successor() != Some(next) {
            return Err(PassOrderError::OutOfOrder {
                current: self.current,
                next,
            });
        }
        self.current = next;
        let depth = next.depth();
        self.depth_write = depth.write;
        Ok(depth)
    }

    /// Re-enables depth writes once the transparent draws are recorded.
    pub fn restore_depth_write(&mut self) {
        self.depth_write = true;
    }

    /// Closes the frame; depth writes must already be back on.
    pub fn finish(&mut self) -> Result<(), PassOrderError> {
        if self.current != FramePass::Transparent {
            return Err(PassOrderError::OutOfOrder {
                current: self.current,
                next: FramePass::Finished,
            });
        }
        if !self.depth_write {
            return Err(PassOrderError::DepthWriteNotRestored);
        }
        self.current = FramePass::Finished;
        Ok(())
    }

    /// Starts the next frame; only valid after `finish`.
    pub fn reset(&mut self) -> Result<(), PassOrderError> {
        match self.current {
            FramePass::Finished | FramePass::Idle => {
                self.current = FramePass::Idle;
                Ok(())
            }
            current => Err(PassOrderError::OutOfOrder {
                current,
                next: FramePass::Idle,
            }),
        }
    }
}

/// Full pass order of one frame.
pub const FRAME_ORDER: [FramePass; 4] = [
    FramePass::Shadow(ShadowCaster::Sun),
    FramePass::Shadow(ShadowCaster::Window),
    FramePass::Opaque,
    FramePass::Transparent,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_frame_in_order() {
        let mut sequencer = PassSequencer::new();
        for _ in 0..2 {
            for pass in FRAME_ORDER {
                let depth = sequencer.enter(pass).unwrap();
                assert_eq!(depth.write, pass != FramePass::Transparent);
                assert!(depth.test);
            }
            assert!(!sequencer.depth_write());
            sequencer.restore_depth_write();
            sequencer.finish().unwrap();
            assert!(sequencer.depth_write());
            sequencer.reset().unwrap();
        }
    }

    #[test]
    fn main_pass_before_shadows_is_rejected() {
        let mut sequencer = PassSequencer::new();
        assert_eq!(
            sequencer.enter(FramePass::Opaque),
            Err(PassOrderError::OutOfOrder {
                current: FramePass::Idle,
                next: FramePass::Opaque,
            })
        );
        sequencer.enter(FramePass::Shadow(ShadowCaster::Sun)).unwrap();
        assert!(sequencer
            .enter(FramePass::Shadow(ShadowCaster::Sun))
            .is_err());
        assert!(sequencer.enter(FramePass::Transparent).is_err());
    }

    #[test]
    fn finishing_early_is_rejected() {
        let mut sequencer = PassSequencer::new();
        sequencer.enter(FramePass::Shadow(ShadowCaster::Sun)).unwrap();
        assert!(sequencer.finish().is_err());
        assert!(sequencer.reset().is_err());
    }

    #[test]
    fn finishing_without_depth_write_is_rejected() {
        let mut sequencer = PassSequencer::new();
        for pass in FRAME_ORDER {
            sequencer.enter(pass).unwrap();
        }
        assert_eq!(sequencer.finish(), Err(PassOrderError::DepthWriteNotRestored));
        sequencer.restore_depth_write();
        assert_eq!(sequencer.finish(), Ok(()));
    }

    #[test]
    fn only_transparent_blends() {
        for pass in FRAME_ORDER {
            let expected = if pass == FramePass::Transparent {
                BlendMode::StraightAlpha
            } else {
                BlendMode::Replace
            };
            assert_eq!(pass.blend(), expected);
        }
        assert_eq!(FramePass::Opaque.kind(), Some(PassKind::Lit));
        assert_eq!(FramePass::Shadow(ShadowCaster::Window).kind(), Some(PassKind::Shadow));
    }
}

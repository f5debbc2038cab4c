//! Detector selection driven by the keyboard.
//!
//! `l` selects lanes only, `p` pedestrians only, `b` both; `q` or ESC ends the
//! run. Anything else is ignored. The controller never runs detection itself;
//! the session reads `mode()` once at the start of each frame.

pub const ESCAPE: char = '\u{1b}';

/// Which detectors run on a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Lane,
    Pedestrian,
    Both,
}

impl Mode {
    pub fn runs_lanes(self) -> bool {
        matches!(self, Mode::Lane | Mode::Both)
    }

    pub fn runs_pedestrians(self) -> bool {
        matches!(self, Mode::Pedestrian | Mode::Both)
    }

    /// Short label used in the on-screen caption.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Lane => "LANE",
            Mode::Pedestrian => "PED",
            Mode::Both => "BOTH",
        }
    }

    /// Console message printed after switching into this mode.
    pub fn announcement(self) -> &'static str {
        match self {
            Mode::Lane => "Switched to Lane Detection only.",
            Mode::Pedestrian => "Switched to Pedestrian Detection only.",
            Mode::Both => "Switched to BOTH Lane and Pedestrian Detection.",
        }
    }
}

/// Result of feeding one key press to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Switched(Mode),
    Quit,
}

#[derive(Clone, Debug)]
pub struct ModeController {
    mode: Mode,
    switchable: bool,
}

impl ModeController {
    /// Controller for the merged program: starts in `Both`, accepts mode keys.
    pub fn new() -> Self {
        Self {
            mode: Mode::Both,
            switchable: true,
        }
    }

    /// Controller fixed to one mode; only the quit keys do anything.
    pub fn locked(mode: Mode) -> Self {
        Self {
            mode,
            switchable: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_switchable(&self) -> bool {
        self.switchable
    }

    pub fn on_key(&mut self, key: char) -> KeyOutcome {
        let target = match key {
            'q' | ESCAPE => return KeyOutcome::Quit,
            'l' => Mode::Lane,
            'p' => Mode::Pedestrian,
            'b' => Mode::Both,
            _ => return KeyOutcome::Ignored,
        };
        if !self.switchable {
            return KeyOutcome::Ignored;
        }
        self.mode = target;
        KeyOutcome::Switched(target)
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_both() {
        let ctl = ModeController::new();
        assert_eq!(ctl.mode(), Mode::Both);
        assert!(ctl.mode().runs_lanes());
        assert!(ctl.mode().runs_pedestrians());
    }

    #[test]
    fn l_p_b_sequence() {
        let mut ctl = ModeController::new();
        assert_eq!(ctl.on_key('l'), KeyOutcome::Switched(Mode::Lane));
        assert!(ctl.mode().runs_lanes() && !ctl.mode().runs_pedestrians());
        assert_eq!(ctl.on_key('p'), KeyOutcome::Switched(Mode::Pedestrian));
        assert!(!ctl.mode().runs_lanes() && ctl.mode().runs_pedestrians());
        assert_eq!(ctl.on_key('b'), KeyOutcome::Switched(Mode::Both));
        assert_eq!(ctl.mode(), Mode::Both);
    }

    #[test]
    fn unknown_keys_are_noops() {
        let mut ctl = ModeController::new();
        ctl.on_key('l');
        for key in ['x', 'L', ' ', '1'] {
            assert_eq!(ctl.on_key(key), KeyOutcome::Ignored);
            assert_eq!(ctl.mode(), Mode::Lane);
        }
    }

    #[test]
    fn quit_keys() {
        let mut ctl = ModeController::new();
        assert_eq!(ctl.on_key('q'), KeyOutcome::Quit);
        assert_eq!(ctl.on_key(ESCAPE), KeyOutcome::Quit);
    }

    #[test]
    fn locked_controller_only_quits() {
        let mut ctl = ModeController::locked(Mode::Pedestrian);
        assert_eq!(ctl.on_key('l'), KeyOutcome::Ignored);
        assert_eq!(ctl.on_key('b'), KeyOutcome::Ignored);
        assert_eq!(ctl.mode(), Mode::Pedestrian);
        assert_eq!(ctl.on_key('q'), KeyOutcome::Quit);
    }

    #[test]
    fn labels() {
        assert_eq!(Mode::Lane.label(), "LANE");
        assert_eq!(Mode::Pedestrian.label(), "PED");
        assert_eq!(Mode::Both.label(), "BOTH");
    }
}

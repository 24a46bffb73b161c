//! Mode, phase and lamp vocabulary.
//!
//! ```text
//!  Mode (mode button):   NORMAL ──▶ FLASHING-RED ──▶ FLASHING-YELLOW ──┐
//!                          ▲                                           │
//!                          └───────────────────────────────────────────┘
//!
//!  Phase (Normal only):  GREEN ──▶ YELLOW ──▶ RED ──▶ GREEN ...
//! ```

/// Top-level operating regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Fixed-time three-phase cycling.
    Normal,
    /// All-way flashing red (implicit stop sign).
    FlashingRed,
    /// Flashing yellow (caution).
    FlashingYellow,
}

impl Mode {
    /// The mode the operator button steps to. Never skips, never reverses.
    pub const fn next(self) -> Self {
        match self {
            Self::Normal => Self::FlashingRed,
            Self::FlashingRed => Self::FlashingYellow,
            Self::FlashingYellow => Self::Normal,
        }
    }

    /// Name used in the status line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::FlashingRed => "flashing-red",
            Self::FlashingYellow => "flashing-yellow",
        }
    }
}

/// Signal phase within Normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Green,
    Yellow,
    Red,
}

impl Phase {
    /// Phase that follows this one in the fixed cycle.
    pub const fn next(self) -> Self {
        match self {
            Self::Green => Self::Yellow,
            Self::Yellow => Self::Red,
            Self::Red => Self::Green,
        }
    }
}

/// One of the three indicator outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lamp {
    Red,
    Yellow,
    Green,
}

impl Lamp {
    /// Every lamp, in status-line order.
    pub const ALL: [Lamp; 3] = [Lamp::Red, Lamp::Yellow, Lamp::Green];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        }
    }
}

/// The on/off pattern shown across the three lamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aspect {
    pub red: bool,
    pub yellow: bool,
    pub green: bool,
}

impl Aspect {
    /// All lamps off.
    pub const DARK: Self = Self::new(false, false, false);
    pub const GREEN: Self = Self::new(false, false, true);
    pub const YELLOW: Self = Self::new(false, true, false);
    pub const RED: Self = Self::new(true, false, false);
    /// Red and yellow together: the pedestrian crossing hold.
    pub const RED_YELLOW: Self = Self::new(true, true, false);

    pub const fn new(red: bool, yellow: bool, green: bool) -> Self {
        Self { red, yellow, green }
    }

    /// Only `lamp` lit, or dark if `on` is false.
    pub const fn single(lamp: Lamp, on: bool) -> Self {
        match lamp {
            Lamp::Red => Self::new(on, false, false),
            Lamp::Yellow => Self::new(false, on, false),
            Lamp::Green => Self::new(false, false, on),
        }
    }

    pub const fn lamp(&self, lamp: Lamp) -> bool {
        match lamp {
            Lamp::Red => self.red,
            Lamp::Yellow => self.yellow,
            Lamp::Green => self.green,
        }
    }

    pub fn set_lamp(&mut self, lamp: Lamp, on: bool) {
        match lamp {
            Lamp::Red => self.red = on,
            Lamp::Yellow => self.yellow = on,
            Lamp::Green => self.green = on,
        }
    }

    /// Number of lamps lit.
    pub fn lit_count(&self) -> usize {
        Lamp::ALL.iter().filter(|&&l| self.lamp(l)).count()
    }
}

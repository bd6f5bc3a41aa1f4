use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Frame header byte expected by the controller firmware.
pub const FRAME_HEAD: u8 = 0x80;

/// Set of buttons held at the same time, encoded the way the controller
/// firmware reads it. Every value carries the 0x8080 base bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonState(u16);

impl ButtonState {
    pub const ALL_RELEASED: Self = Self(0x8080);

    pub const A: Self = Self(0x8080 | 1);
    pub const B: Self = Self(0x8080 | (1 << 1));
    pub const X: Self = Self(0x8080 | (1 << 2));
    pub const Y: Self = Self(0x8080 | (1 << 3));
    pub const L: Self = Self(0x8080 | (1 << 4));
    pub const R: Self = Self(0x8080 | (1 << 5));
    pub const Z: Self = Self(0x8080 | (1 << 8));
    pub const START: Self = Self(0x8080 | (1 << 9));
    pub const LEFT: Self = Self(0x8080 | (1 << 10));
    pub const RIGHT: Self = Self(0x8080 | (1 << 11));
    pub const UP: Self = Self(0x8080 | (1 << 12));
    pub const DOWN: Self = Self(0x8080 | (1 << 13));
    /// Start+Y, the soft-reset chord.
    pub const TL: Self = Self(Self::START.0 | Self::Y.0);

    /// Rebuild a state from raw frame bits. The 0x8080 base is always kept.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits | 0x8080)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_released(self) -> bool {
        self == Self::ALL_RELEASED
    }

    /// 3-byte wire frame: head, low byte, high byte.
    pub fn frame(self) -> [u8; 3] {
        let [lo, hi] = self.0.to_le_bytes();
        [FRAME_HEAD, lo, hi]
    }

    /// Resolve one button symbol from the macro language.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let state = match symbol {
            "A" => Self::A,
            "B" => Self::B,
            "X" => Self::X,
            "Y" => Self::Y,
            "Z" => Self::Z,
            "L" => Self::L,
            "R" => Self::R,
            "St" => Self::START,
            "Sl" => Self::Y,
            "dU" => Self::UP,
            "dD" => Self::DOWN,
            "dL" => Self::LEFT,
            "dR" => Self::RIGHT,
            "tl" => Self::TL,
            _ => return None,
        };
        Some(state)
    }

    /// Resolve a `+`-joined chord such as `A+B`. Every symbol must resolve.
    pub fn from_chord(chord: &str) -> Option<Self> {
        chord
            .split('+')
            .try_fold(Self::ALL_RELEASED, |acc, sym| Some(acc | Self::from_symbol(sym)?))
    }
}

impl Default for ButtonState {
    fn default() -> Self {
        Self::ALL_RELEASED
    }
}

impl BitOr for ButtonState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ButtonState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

const NAMES: [(ButtonState, &str); 12] = [
    (ButtonState::A, "A"),
    (ButtonState::B, "B"),
    (ButtonState::X, "X"),
    (ButtonState::Y, "Y"),
    (ButtonState::Z, "Z"),
    (ButtonState::L, "L"),
    (ButtonState::R, "R"),
    (ButtonState::START, "St"),
    (ButtonState::UP, "dU"),
    (ButtonState::DOWN, "dD"),
    (ButtonState::LEFT, "dL"),
    (ButtonState::RIGHT, "dR"),
];

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_released() {
            return f.write_str("-");
        }
        let mut first = true;
        for (state, name) in NAMES {
            if self.0 & state.0 == state.0 {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ButtonState({:#06x} {})", self.0, self)
    }
}

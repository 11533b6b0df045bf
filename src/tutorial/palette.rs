//! Dot colors.
//!
//! The palette is a fixed table of 16 colors. Each token kind owns a base slot
//! followed by three lighter shades, which the fade walks through before the
//! dots turn white.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::tutorial::error::TutorialError;
use crate::tutorial::types::TokenKind;

pub const PALETTE_SIZE: usize = 16;
pub const WHITE_SLOT: usize = 2;
pub const FADE_STEPS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
}

impl FromStr for Rgb {
    type Err = TutorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TutorialError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
}

impl Palette {
    /// Parse a palette from `#RRGGBB` strings.
    pub fn parse<S: AsRef<str>>(colors: &[S]) -> Result<Self, TutorialError> {
        if colors.len() != PALETTE_SIZE {
            return Err(TutorialError::PaletteSize {
                expected: PALETTE_SIZE,
                found: colors.len(),
            });
        }
        let mut parsed = [Rgb::WHITE; PALETTE_SIZE];
        for (slot, color) in parsed.iter_mut().zip(colors) {
            *slot = color.as_ref().parse()?;
        }
        Ok(Self { colors: parsed })
    }

    pub fn slot(&self, slot: usize) -> Rgb {
        self.colors[slot % PALETTE_SIZE]
    }

    pub fn base(&self, kind: TokenKind) -> Rgb {
        self.slot(kind.base_slot())
    }

    /// Color of a `kind` token at fade `step` (1..=4). The last step is white
    /// whatever the starting hue.
    pub fn faded(&self, kind: TokenKind, step: u8) -> Rgb {
        if step >= FADE_STEPS {
            self.slot(WHITE_SLOT)
        } else {
            self.slot(kind.base_slot() + step as usize)
        }
    }
}

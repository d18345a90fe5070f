//! Color assignment for drawing tracks.
//!
//! [`IdColor`] is an explicit, seeded color wheel: the caller owns it and
//! passes it to every scene that should share colors, so the same track id
//! gets the same color across side-by-side views.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Parses `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Default wheel: distinguishable named colors.
pub const PALETTE: [Rgb; 40] = [
    Rgb::new(0x7e, 0x1e, 0x9c), // purple
    Rgb::new(0x15, 0xb0, 0x1a), // green
    Rgb::new(0x03, 0x43, 0xdf), // blue
    Rgb::new(0xff, 0x81, 0xc0), // pink
    Rgb::new(0x65, 0x37, 0x00), // brown
    Rgb::new(0xe5, 0x00, 0x00), // red
    Rgb::new(0x95, 0xd0, 0xfc), // light blue
    Rgb::new(0x02, 0x93, 0x86), // teal
    Rgb::new(0xf9, 0x73, 0x06), // orange
    Rgb::new(0x96, 0xf9, 0x7b), // light green
    Rgb::new(0xc2, 0x00, 0x78), // magenta
    Rgb::new(0xff, 0xff, 0x14), // yellow
    Rgb::new(0x75, 0xbb, 0xfd), // sky blue
    Rgb::new(0x92, 0x95, 0x91), // grey
    Rgb::new(0x89, 0xfe, 0x05), // lime green
    Rgb::new(0xbf, 0x77, 0xf6), // light purple
    Rgb::new(0x9a, 0x0e, 0xea), // violet
    Rgb::new(0x03, 0x35, 0x00), // dark green
    Rgb::new(0x06, 0xc2, 0xac), // turquoise
    Rgb::new(0xc7, 0x9f, 0xef), // lavender
    Rgb::new(0x00, 0x03, 0x5b), // dark blue
    Rgb::new(0xd1, 0xb2, 0x6f), // tan
    Rgb::new(0x00, 0xff, 0xff), // cyan
    Rgb::new(0x13, 0xea, 0xc9), // aqua
    Rgb::new(0x06, 0x47, 0x0c), // forest green
    Rgb::new(0xae, 0x71, 0x81), // mauve
    Rgb::new(0x35, 0x06, 0x3e), // dark purple
    Rgb::new(0x01, 0xff, 0x07), // bright green
    Rgb::new(0x65, 0x00, 0x21), // maroon
    Rgb::new(0x6e, 0x75, 0x0e), // olive
    Rgb::new(0xff, 0x79, 0x6c), // salmon
    Rgb::new(0xe6, 0xda, 0xa6), // beige
    Rgb::new(0x05, 0x04, 0xaa), // royal blue
    Rgb::new(0x00, 0x11, 0x46), // navy blue
    Rgb::new(0xce, 0xa2, 0xfd), // lilac
    Rgb::new(0xff, 0x02, 0x8d), // hot pink
    Rgb::new(0xad, 0x81, 0x50), // light brown
    Rgb::new(0xc7, 0xfd, 0xb5), // pale green
    Rgb::new(0xff, 0xb0, 0x7c), // peach
    Rgb::new(0x67, 0x7a, 0x04), // olive green
];

/// Hands out a stable color per id, drawing without repetition.
///
/// The palette is shuffled once with the constructor seed. When every color
/// has been handed out the wheel refills from the shuffled palette.
#[derive(Debug, Clone)]
pub struct IdColor {
    remaining: Vec<Rgb>,
    shuffled: Vec<Rgb>,
    assigned: HashMap<u64, Rgb>,
    resets: usize,
}

impl IdColor {
    /// Wheel over [`PALETTE`].
    pub fn new(seed: u64) -> Self {
        Self::with_palette(PALETTE.to_vec(), seed)
    }

    /// Wheel over a caller-supplied palette.
    ///
    /// An empty palette falls back to [`PALETTE`].
    pub fn with_palette(mut colors: Vec<Rgb>, seed: u64) -> Self {
        if colors.is_empty() {
            colors = PALETTE.to_vec();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        colors.shuffle(&mut rng);
        Self {
            remaining: colors.clone(),
            shuffled: colors,
            assigned: HashMap::new(),
            resets: 0,
        }
    }

    /// Color for `id`, assigning the next free one on first sight.
    pub fn color(&mut self, id: u64) -> Rgb {
        if let Some(color) = self.assigned.get(&id) {
            return *color;
        }
        if self.remaining.is_empty() {
            self.remaining = self.shuffled.clone();
            self.resets += 1;
        }
        // Palette is never empty, so neither is the refilled wheel
        let color = self.remaining.pop().unwrap_or(self.shuffled[0]);
        self.assigned.insert(id, color);
        color
    }

    /// Color already given to `id`, without assigning.
    pub fn peek(&self, id: u64) -> Option<Rgb> {
        self.assigned.get(&id).copied()
    }

    /// How often the wheel ran out and refilled.
    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}

impl Default for IdColor {
    fn default() -> Self {
        Self::new(44)
    }
}

/// Fallback color for particle types without a fixed color.
pub const PDGID_DEFAULT_COLOR: Rgb = Rgb::new(0x92, 0x95, 0x91);

/// Fixed color per particle type, sign ignored.
pub fn color_for_pdgid(pdgid: i32) -> Rgb {
    match pdgid.unsigned_abs() {
        0 => Rgb::new(0x7e, 0x1e, 0x9c),   // undefined: purple
        13 => Rgb::new(0x95, 0xd0, 0xfc),  // muon: light blue
        11 => Rgb::new(0x00, 0x80, 0x00),  // electron: green
        22 => Rgb::new(0xff, 0x00, 0x00),  // photon: red
        211 => Rgb::new(0xf9, 0x73, 0x06), // pion: orange
        _ => PDGID_DEFAULT_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_same_color() {
        let mut wheel = IdColor::new(7);
        let a = wheel.color(12);
        let _ = wheel.color(13);
        assert_eq!(wheel.color(12), a);
        assert_eq!(wheel.peek(12), Some(a));
        assert_eq!(wheel.peek(99), None);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let mut a = IdColor::new(44);
        let mut b = IdColor::new(44);
        let seq_a: Vec<Rgb> = (0..10).map(|i| a.color(i)).collect();
        let seq_b: Vec<Rgb> = (0..10).map(|i| b.color(i)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_no_repeats_until_reset() {
        let palette = vec![Rgb::new(1, 0, 0), Rgb::new(2, 0, 0), Rgb::new(3, 0, 0)];
        let mut wheel = IdColor::with_palette(palette, 1);

        let mut first: Vec<Rgb> = (0..3).map(|i| wheel.color(i)).collect();
        first.sort_by_key(|c| c.0);
        first.dedup();
        assert_eq!(first.len(), 3);
        assert_eq!(wheel.resets(), 0);

        let _ = wheel.color(3);
        assert_eq!(wheel.resets(), 1);
        assert_eq!(wheel.assigned_count(), 4);
    }

    #[test]
    fn test_hex_round_trip() {
        let c = Rgb::new(0xba, 0xcf, 0xbe);
        assert_eq!(c.to_hex(), "#bacfbe");
        assert_eq!(Rgb::from_hex("#bacfbe"), Some(c));
        assert_eq!(Rgb::from_hex("bacfbe"), None);
        assert_eq!(Rgb::from_hex("#bacf"), None);
    }

    #[test]
    fn test_pdgid_colors() {
        assert_eq!(color_for_pdgid(-211), color_for_pdgid(211));
        assert_eq!(color_for_pdgid(2212), PDGID_DEFAULT_COLOR);
        assert_ne!(color_for_pdgid(22), PDGID_DEFAULT_COLOR);
    }
}

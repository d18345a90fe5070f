//! HGCAL endcap geometry constants.
//!
//! Only what the tree adapters need: the longitudinal layer positions of
//! both endcaps and the sign convention that tells them apart.

use serde::{Deserialize, Serialize};

/// Layer z positions (cm) of the positive endcap, front face first.
pub const Z_POS_LAYERS: [f64; 51] = [
    320.5, 322.103, 323.047, 325.073, 326.017, 328.043, 328.987, 331.013, 331.957, 333.983,
    334.927, 336.953, 337.897, 339.923, 340.867, 342.893, 343.837, 345.863, 346.807, 348.833,
    349.777, 351.803, 352.747, 354.773, 355.717, 357.743, 358.687, 360.713, 361.657, 367.699,
    373.149, 378.599, 384.049, 389.499, 394.949, 400.399, 405.849, 411.299, 416.749, 422.199,
    427.649, 436.199, 444.749, 453.299, 461.849, 470.399, 478.949, 487.499, 496.049, 504.599,
    513.149,
];

/// Front face of the positive endcap (cm).
pub const HGCAL_Z_MIN: f64 = 320.5;

/// Back face of the positive endcap (cm).
pub const HGCAL_Z_MAX: f64 = 513.149;

/// One of the two symmetric detector halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endcap {
    Positive,
    Negative,
}

impl Endcap {
    /// Endcap on the side of `z`; zero counts as positive.
    pub fn from_z(z: f64) -> Self {
        if z < 0.0 {
            Endcap::Negative
        } else {
            Endcap::Positive
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endcap::Positive => "positive",
            Endcap::Negative => "negative",
        }
    }

    /// Layer z positions of this endcap (negated for the negative side).
    pub fn layers(&self) -> impl Iterator<Item = f64> {
        let sign = match self {
            Endcap::Positive => 1.0,
            Endcap::Negative => -1.0,
        };
        Z_POS_LAYERS.iter().map(move |z| sign * z)
    }
}

/// Whether `z` lies between the front and back face of either endcap.
pub fn in_calorimeter(z: f64) -> bool {
    (HGCAL_Z_MIN..=HGCAL_Z_MAX).contains(&z.abs())
}

/// 1-based index of the layer closest to `z` (either endcap).
pub fn nearest_layer(z: f64) -> usize {
    let target = z.abs();
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (i, layer_z) in Z_POS_LAYERS.iter().enumerate() {
        let dist = (layer_z - target).abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best + 1
}

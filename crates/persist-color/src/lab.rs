//! The LAB -> XYZ -> RGB formula pipeline.

use crate::{lut, Error, Result};

/// CIE constant epsilon (216/24389, truncated as the producing application does).
const E: f64 = 0.008856;

/// CIE constant kappa (24389/27, truncated likewise).
const K: f64 = 903.3;

/// Reference white derived from the Rec. 709 chromaticity (x = 0.3127, y = 0.3290)
/// scaled to Y = 1.0. The common D65 triple (0.95047, 1.0, 1.08883) shifts
/// results by several levels.
const WHITE: Xyz = Xyz {
    x: 0.9504559270516716,
    y: 1.0,
    z: 1.0888461217873364,
};

/// XYZ to linear RGB for the Apple RGB working space.
const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [2.9515373, -1.2894116, -0.4738445],
    [-1.0851093, 1.9908566, 0.0372026],
    [0.0854934, -0.2694964, 1.0912975],
];

const GAMMA: f64 = 1.8;

/// Channels that round below this level are forced to zero.
const LOW_CHANNEL_CUTOFF: f64 = 5.0;

/// A CIELAB color as stored in a persistent stream.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    /// Create a new LAB color.
    #[inline]
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }
}

/// A CIE XYZ color relative to [`WHITE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Inverse CIELAB transform.
pub fn lab_to_xyz(lab: Lab) -> Xyz {
    let fy = (lab.l + 16.0) / 116.0;
    let fz = fy - lab.b / 200.0;
    let fx = lab.a / 500.0 + fy;

    let xr = if fx.powi(3) > E { fx.powi(3) } else { (116.0 * fx - 16.0) / K };
    let yr = if lab.l > K * E { fy.powi(3) } else { lab.l / K };
    let zr = if fz.powi(3) > E { fz.powi(3) } else { (116.0 * fz - 16.0) / K };

    Xyz {
        x: xr * WHITE.x,
        y: yr * WHITE.y,
        z: zr * WHITE.z,
    }
}

/// Linear RGB in the working space, unclamped.
pub fn xyz_to_linear_rgb(xyz: Xyz) -> [f64; 3] {
    XYZ_TO_RGB.map(|row| row[0] * xyz.x + row[1] * xyz.y + row[2] * xyz.z)
}

/// Clamp negatives to zero and apply the 1.8 gamma.
pub fn apply_gamma(rgb: [f64; 3]) -> [f64; 3] {
    rgb.map(|c| c.max(0.0).powf(1.0 / GAMMA))
}

/// Scale to 0-255 and round half to even, then apply [`clamp_low_channels`].
///
/// The result is not range checked; values above 255 are possible.
pub fn scale_and_round(rgb: [f64; 3]) -> [f64; 3] {
    clamp_low_channels(rgb.map(|c| (c * 255.0).round_ties_even()))
}

/// Force channels below 5 to exactly zero.
///
/// The formula consistently lands on 1-4 where the producing application gives 0.
/// This is an empirical correction, kept here alone so it can be revisited.
pub fn clamp_low_channels(channels: [f64; 3]) -> [f64; 3] {
    channels.map(|c| if c < LOW_CHANNEL_CUTOFF { 0.0 } else { c })
}

/// Convert a persisted CIELAB color to RGB.
///
/// Fails with [`Error::InvalidColor`] when the formula result is not a
/// finite value in `[0, 255]`; results are never clamped into range.
pub fn cielab_to_rgb(lab: Lab) -> Result<Rgb> {
    if let Some(rgb) = lut::lookup(lab) {
        return Ok(rgb);
    }

    let invalid = |channels: [f64; 3]| Error::InvalidColor {
        l: lab.l,
        a: lab.a,
        b: lab.b,
        channels,
    };

    // Overflowing intermediates would otherwise collapse to 0 in the gamma clamp.
    let linear = xyz_to_linear_rgb(lab_to_xyz(lab));
    if linear.iter().any(|c| !c.is_finite()) {
        return Err(invalid(linear));
    }

    let channels = scale_and_round(apply_gamma(linear));
    if channels.iter().any(|c| !c.is_finite() || *c < 0.0 || *c > 255.0) {
        return Err(invalid(channels));
    }

    let [r, g, b] = channels.map(|c| c as u8);
    Ok(Rgb::new(r, g, b))
}

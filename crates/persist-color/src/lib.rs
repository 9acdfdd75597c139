//! CIELAB to RGB conversion for persisted colors.
//!
//! Colors in a persistent stream are stored as CIELAB doubles. The producing
//! application converts them to RGB with a closed-source routine; this crate
//! reproduces it to within one level per channel:
//!
//! 1. round the LAB triple to four decimals and consult the [`lookup`] table,
//!    which overrides the formula where it is known to be off;
//! 2. otherwise run [`lab_to_xyz`] -> [`xyz_to_linear_rgb`] ->
//!    [`apply_gamma`] -> [`scale_and_round`].
//!
//! # Example
//!
//! ```
//! use persist_color::{cielab_to_rgb, Lab, Rgb};
//!
//! let red = cielab_to_rgb(Lab::new(56.547017615341, 76.8994334713463, 68.1034442713808))?;
//! assert_eq!(red, Rgb::new(255, 0, 0));
//! # Ok::<(), persist_color::Error>(())
//! ```

mod error;
mod lab;
mod lut;

pub use error::{Error, Result};
pub use lab::{
    apply_gamma, cielab_to_rgb, clamp_low_channels, lab_to_xyz, scale_and_round, xyz_to_linear_rgb, Lab,
    Rgb, Xyz,
};
pub use lut::{lookup, round_lab};

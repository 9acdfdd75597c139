//! Lookup table of LAB values the formula does not reproduce.
//!
//! Each entry maps a LAB triple rounded to four decimals to the RGB value the
//! producing application gives for it. Entries are only needed where the
//! formula is off by more than one level in some channel.

use crate::{Lab, Rgb};

/// Keys are the LAB components multiplied by 10 000 and rounded.
static LAB_OVERRIDES: &[([i64; 3], Rgb)] = &[
    ([8_690, 140_670, -213_789], Rgb::new(0, 2, 20)),
    ([326_742, 515_019, 454_267], Rgb::new(131, 2, 2)),
];

fn key_component(v: f64) -> i64 {
    (v * 10_000.0).round_ties_even() as i64
}

/// Round each LAB component to four decimals.
pub fn round_lab(lab: Lab) -> Lab {
    let round = |v: f64| key_component(v) as f64 / 10_000.0;
    Lab::new(round(lab.l), round(lab.a), round(lab.b))
}

/// Look up the override for a LAB value, if any.
pub fn lookup(lab: Lab) -> Option<Rgb> {
    let key = [key_component(lab.l), key_component(lab.a), key_component(lab.b)];
    LAB_OVERRIDES
        .iter()
        .find(|(entry, _)| *entry == key)
        .map(|(_, rgb)| *rgb)
}

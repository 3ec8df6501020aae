use fixed::types::{I16F16, I32F32};

/// Q32.32 fixed-point: in-memory representation of fractional quantities
/// such as pending rewards.
pub type Fixed64 = I32F32;

/// Q16.16 fixed-point: the reduced precision used when persisting fractions.
pub type Fixed32 = I16F16;

/// Ticks are the atomic unit of station time.
pub type Ticks = u32;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick path.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Narrow a Fixed64 to the persisted precision, saturating at the Q16.16 range.
#[inline]
pub fn narrow(v: Fixed64) -> Fixed32 {
    Fixed32::saturating_from_num(v)
}

/// Widen a persisted Q16.16 value back to Fixed64. Always exact.
#[inline]
pub fn widen(v: Fixed32) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Saturate a tick count into the `u16` used on disk.
#[inline]
pub fn ticks_to_u16(ticks: Ticks) -> u16 {
    u16::try_from(ticks).unwrap_or(u16::MAX)
}

//! One-time-passcode generation.

use rand::{rngs::OsRng, Rng};

/// Number of digits in a generated OTP.
pub const OTP_LENGTH: usize = 6;

/// Generate a uniformly random 6-digit numeric code.
///
/// The code is a fixed-width string: leading zeros are preserved, never a
/// numeric type.
#[must_use]
pub fn generate_otp() -> String {
    generate_with_rng(&mut OsRng)
}

fn generate_with_rng<R: Rng + ?Sized>(rng: &mut R) -> String {
    let code: u32 = rng.gen_range(0..1_000_000);
    format!("{code:06}")
}

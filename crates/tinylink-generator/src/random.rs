use crate::Generator;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use tinylink_core::ShortCode;

/// Number of random bytes behind each code; 6 bytes encode to 8 characters.
const ENTROPY_BYTES: usize = 6;

/// Mints codes from the operating system's CSPRNG, encoded as unpadded
/// URL-safe base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let mut bytes = [0u8; ENTROPY_BYTES];
        // `Generator` is infallible. An entropy source failure leaves no safe
        // way to mint identifiers, so it aborts the caller.
        OsRng
            .try_fill_bytes(&mut bytes)
            .expect("operating system entropy source failed");
        ShortCode::new_unchecked(URL_SAFE_NO_PAD.encode(bytes))
    }
}

/// PCMU (G.711 mu-law) <-> linear PCM16 companding tables.
///
/// Built once at process start and shared read-only across every session
/// (spec S4.1): no synchronization is needed once the `Lazy` has resolved.
use once_cell::sync::Lazy;

const BIAS: i32 = 0x84;
const CLIP: i32 = 32635;

/// 256-entry mu-law byte -> signed 16-bit linear sample table.
pub static MU_LAW_TO_LINEAR: Lazy<[i16; 256]> = Lazy::new(build_mu_law_to_linear);

/// 65536-entry signed 16-bit linear sample -> mu-law byte table, indexed by
/// `sample as u16 as usize` (i.e. `(sample as i32 + 32768) as usize`).
pub static LINEAR_TO_MU_LAW: Lazy<[u8; 65536]> = Lazy::new(build_linear_to_mu_law);

fn build_mu_law_to_linear() -> [i16; 256] {
    let mut table = [0i16; 256];
    for (b, slot) in table.iter_mut().enumerate() {
        let v = (!(b as u32)) & 0xff;
        let sign = v & 0x80;
        let exponent = (v >> 4) & 0x07;
        let mantissa = v & 0x0f;
        let mut sample = (((mantissa << 3) + 0x84) << exponent) as i32 - 0x84;
        if sign != 0 {
            sample = -sample;
        }
        *slot = sample as i16;
    }
    table
}

fn build_linear_to_mu_law() -> [u8; 65536] {
    let mut table = [0u8; 65536];
    for (i, slot) in table.iter_mut().enumerate() {
        let linear = (i as i32) - 32768;
        *slot = encode_sample(linear);
    }
    table
}

fn encode_sample(sample: i32) -> u8 {
    encode_sample_with_exponent(sample).0
}

/// Encode and also return the exponent segment used, so tests can derive
/// the quantization-step bound for that segment.
fn encode_sample_with_exponent(sample: i32) -> (u8, i32) {
    let sign: i32 = if sample < 0 { 0x80 } else { 0x00 };
    let mut magnitude = if sample < 0 { -sample } else { sample };
    if magnitude > CLIP {
        magnitude = CLIP;
    }
    magnitude += BIAS;

    let mut exponent: i32 = 7;
    while exponent > 0 && magnitude < (0x80 << exponent) {
        exponent -= 1;
    }
    let mantissa = (magnitude >> (exponent + 3)) & 0x0f;
    let byte = sign | (exponent << 4) | mantissa;
    ((!byte) as u8, exponent)
}

/// Decode a single mu-law byte to a linear PCM16 sample.
#[inline]
pub fn mu_law_to_linear(b: u8) -> i16 {
    MU_LAW_TO_LINEAR[b as usize]
}

/// Encode a single linear PCM16 sample to a mu-law byte.
#[inline]
pub fn linear_to_mu_law(sample: i16) -> u8 {
    LINEAR_TO_MU_LAW[(sample as u16) as usize]
}

/// Decode a PCMU byte buffer into linear PCM16 samples.
pub fn decode_pcmu(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| mu_law_to_linear(b)).collect()
}

/// Encode linear PCM16 samples into a PCMU byte buffer.
pub fn encode_pcmu(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| linear_to_mu_law(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_bit_exact_for_every_byte() {
        for b in 0u16..=255 {
            let b = b as u8;
            let linear = mu_law_to_linear(b);
            let back = linear_to_mu_law(linear);
            assert_eq!(back, b, "byte {b:#04x} round-tripped to {back:#04x}");
        }
    }

    #[test]
    fn decode_is_bounded() {
        for b in 0u16..=255 {
            let linear = mu_law_to_linear(b as u8);
            assert!((-32124..=32124).contains(&linear), "sample {linear} out of range for byte {b}");
        }
    }

    #[test]
    fn encode_is_within_one_quantization_step_of_source_sample() {
        // The codec is lossy by segment; round-tripping an arbitrary i16
        // through encode->decode should land within that segment's
        // quantization step, which is monotonic in |sample|.
        let mut prev_step = 0i32;
        for sample in [0i32, 1, 100, 1000, 5000, 10000, 20000, 32767, -32768, -1] {
            let (byte, exponent) = encode_sample_with_exponent(sample);
            let decoded = mu_law_to_linear(byte) as i32;
            let step = 1i32 << (exponent + 3);
            assert!(
                (decoded - sample).abs() <= step,
                "sample {sample} decoded to {decoded}, step {step}"
            );
            if sample >= 0 {
                assert!(step >= prev_step, "step should be monotonic in |sample|");
                prev_step = step;
            }
        }
    }

    #[test]
    fn silence_round_trips_to_silence() {
        assert_eq!(mu_law_to_linear(linear_to_mu_law(0)).abs(), 0);
    }
}

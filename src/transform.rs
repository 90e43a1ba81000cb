/// Directional audio transform pipelines (spec S4.3): each is a pure
/// function of (input bytes, carried tail sample) -> (output bytes, new
/// tail sample). Neither does I/O; both run entirely on the calling
/// reader task, per S5's "transforms are CPU-only" rule.
use crate::codec;
use crate::dsp;
use crate::error::BridgeError;

const NARROWBAND_HZ: u32 = 8_000;
const WIDEBAND_HZ: u32 = 48_000;
const GATE_THRESHOLD: i16 = 50;
const LIMITER_CEILING: i16 = 28_000;
const SMOOTHER_ALPHA: f64 = 0.95;

/// Client (PCMU @ 8kHz) -> upstream (PCM16-LE @ 48kHz).
pub fn pcmu_to_wideband(input: &[u8], tail: f64) -> (Vec<u8>, f64) {
    let mut samples = codec::decode_pcmu(input);
    dsp::gate(&mut samples, GATE_THRESHOLD);
    dsp::limit(&mut samples, LIMITER_CEILING);

    let mut smoother = dsp::Smoother::with_tail(SMOOTHER_ALPHA, tail);
    smoother.smooth(&mut samples);
    let new_tail = smoother.tail();

    let wide = dsp::resample(&samples, NARROWBAND_HZ, WIDEBAND_HZ);
    let bytes = pcm16_le_encode(&wide);
    (bytes, new_tail)
}

/// Upstream (PCM16-LE @ 48kHz) -> client (PCMU @ 8kHz).
pub fn wideband_to_pcmu(input: &[u8], tail: f64) -> Result<(Vec<u8>, f64), BridgeError> {
    let mut samples = pcm16_le_decode(input)?;
    dsp::gate(&mut samples, GATE_THRESHOLD);
    dsp::limit(&mut samples, LIMITER_CEILING);

    let mut smoother = dsp::Smoother::with_tail(SMOOTHER_ALPHA, tail);
    smoother.smooth(&mut samples);
    let new_tail = smoother.tail();

    let narrow = dsp::resample(&samples, WIDEBAND_HZ, NARROWBAND_HZ);
    let bytes = codec::encode_pcmu(&narrow);
    Ok((bytes, new_tail))
}

/// True when every byte in a PCMU buffer decodes to silence. Used to
/// suppress uniformly-silent downstream output (spec S4.4).
pub fn is_silence(pcmu: &[u8]) -> bool {
    !pcmu.is_empty() && pcmu.iter().all(|&b| codec::mu_law_to_linear(b) == 0)
}

fn pcm16_le_decode(bytes: &[u8]) -> Result<Vec<i16>, BridgeError> {
    if bytes.len() % 2 != 0 {
        return Err(BridgeError::Transform(format!(
            "odd PCM16 byte length: {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

fn pcm16_le_encode(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcmu_to_wideband_upsamples_by_six() {
        let input = vec![0xffu8; 320]; // 40ms @ 8kHz
        let (out, _tail) = pcmu_to_wideband(&input, 0.0);
        assert_eq!(out.len(), 3840);
    }

    #[test]
    fn wideband_to_pcmu_downsamples_by_six() {
        let input = vec![0u8; 3840]; // 40ms @ 48kHz, silence
        let (out, _tail) = wideband_to_pcmu(&input, 0.0).unwrap();
        assert_eq!(out.len(), 320);
    }

    #[test]
    fn wideband_to_pcmu_rejects_odd_length() {
        let err = wideband_to_pcmu(&[0u8; 3], 0.0).unwrap_err();
        assert!(matches!(err, BridgeError::Transform(_)));
    }

    #[test]
    fn silence_detection() {
        let silent = codec::encode_pcmu(&vec![0i16; 160]);
        assert!(is_silence(&silent));

        let mut noisy = silent.clone();
        noisy[10] = codec::linear_to_mu_law(5000);
        assert!(!is_silence(&noisy));

        assert!(!is_silence(&[]));
    }

    #[test]
    fn tail_carries_across_calls() {
        let chunk = vec![0x80u8; 160];
        let (_, tail1) = pcmu_to_wideband(&chunk, 0.0);
        let (_, tail2) = pcmu_to_wideband(&chunk, tail1);
        assert_ne!(tail1, 0.0);
        assert!(tail2.is_finite());
    }
}

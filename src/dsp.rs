/// Speech-quality DSP primitives applied to linear PCM16 sample arrays.
///
/// These compose into the transform pipeline (`crate::transform`): noise
/// gate -> soft limiter -> exponential smoother -> resampler. All four are
/// pure functions of their input plus (for the smoother) carried state —
/// they perform no I/O and never block, matching spec S5's requirement
/// that transforms stay off the suspension points.

/// Zero out samples below the gate threshold.
pub fn gate(samples: &mut [i16], threshold: i16) {
    for s in samples.iter_mut() {
        if s.unsigned_abs() < threshold.unsigned_abs() {
            *s = 0;
        }
    }
}

/// Soft-clip samples above `limit` using a tanh knee, in place.
pub fn limit(samples: &mut [i16], limit: i16) {
    let l = limit as f64;
    for s in samples.iter_mut() {
        let x = *s as f64;
        if x.abs() > l {
            let clamped = x.signum() * (x.abs() / l).tanh() * l;
            *s = clamped.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        }
    }
}

/// Single-pole exponential smoother carrying its tail sample between
/// calls. Each session direction owns exactly one of these, created with
/// `prev = 0` and never shared across sessions or directions (spec S3/S5).
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    alpha: f64,
    prev: f64,
}

impl Smoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, prev: 0.0 }
    }

    /// Resume a smoother with a tail carried over from a prior chunk in
    /// the same direction of the same session (spec property 6).
    pub fn with_tail(alpha: f64, tail: f64) -> Self {
        Self { alpha, prev: tail }
    }

    /// Smooth `samples` in place, advancing the carried tail. Equivalent to
    /// calling this once on the concatenation of any chunk split (spec
    /// property 6): the tail is the only state threaded across calls.
    pub fn smooth(&mut self, samples: &mut [i16]) {
        let mut prev = self.prev;
        for s in samples.iter_mut() {
            let y = self.alpha * (*s as f64) + (1.0 - self.alpha) * prev;
            prev = y;
            *s = y.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        }
        self.prev = prev;
    }

    /// Current tail sample (spec's "last output of the smoother").
    pub fn tail(&self) -> f64 {
        self.prev
    }
}

/// Linear-interpolation resampler between arbitrary sample rates (spec
/// S4.2). `len(out) == floor(len(in) * r_out / r_in)`.
pub fn resample(input: &[i16], rate_in: u32, rate_out: u32) -> Vec<i16> {
    if input.is_empty() {
        return Vec::new();
    }
    let n_in = input.len() as u64;
    let n_out = (n_in * rate_out as u64) / rate_in as u64;
    let mut out = Vec::with_capacity(n_out as usize);

    for i in 0..n_out {
        let s = (i as f64) * (rate_in as f64) / (rate_out as f64);
        let k = s.floor() as i64;
        let frac = s - (k as f64);

        let sample = if k < 0 {
            0.0
        } else if (k as usize) >= input.len() {
            0.0
        } else if (k as usize) + 1 >= input.len() {
            input[k as usize] as f64
        } else {
            let a = input[k as usize] as f64;
            let b = input[k as usize + 1] as f64;
            a + (b - a) * frac
        };

        out.push(sample.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    out
}

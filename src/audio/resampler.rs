// Linear-interpolation block resampler. Deliberately simple: all real audio
// work (wake, VAD, STT) runs at a fixed 16 kHz / 512-sample geometry, so this
// only needs to adapt a differently-configured capture geometry, not deliver
// DSP-grade quality.

pub struct Resampler {
    grid: Option<(Vec<f32>, Vec<f32>)>,
    out_len: usize,
}

impl Resampler {
    /// Builds a resampler from `in_len` input samples to `out_len` output
    /// samples. Degenerate cases (equal lengths, or either length <= 1)
    /// produce an identity resampler.
    pub fn new(in_len: usize, out_len: usize) -> Self {
        if in_len == out_len || in_len <= 1 || out_len <= 1 {
            return Self {
                grid: None,
                out_len,
            };
        }
        let x_old: Vec<f32> = (0..in_len).map(|i| i as f32).collect();
        let x_new: Vec<f32> = (0..out_len)
            .map(|i| i as f32 * (in_len - 1) as f32 / (out_len - 1) as f32)
            .collect();
        Self {
            grid: Some((x_old, x_new)),
            out_len,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.grid.is_none()
    }

    pub fn resample(&self, block: &[i16]) -> Vec<i16> {
        let Some((x_old, x_new)) = &self.grid else {
            return block.to_vec();
        };
        x_new
            .iter()
            .map(|&x| interp(x, x_old, block))
            .map(|y| y.clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }
}

/// Linear interpolation of `block` (sampled at integer positions `x_old`) at
/// position `x`, matching `numpy.interp` semantics (clamped at the ends).
fn interp(x: f32, x_old: &[f32], block: &[i16]) -> f32 {
    if x <= x_old[0] {
        return block[0] as f32;
    }
    let last = x_old.len() - 1;
    if x >= x_old[last] {
        return block[last] as f32;
    }
    let i = x.floor() as usize;
    let i = i.min(last.saturating_sub(1));
    let frac = x - x_old[i];
    let a = block[i] as f32;
    let b = block[(i + 1).min(last)] as f32;
    a + (b - a) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_lengths_match() {
        let r = Resampler::new(512, 512);
        assert!(r.is_identity());
        let block: Vec<i16> = (0..512).map(|i| i as i16).collect();
        assert_eq!(r.resample(&block), block);
    }

    #[test]
    fn test_degenerate_lengths_are_identity() {
        let r = Resampler::new(1, 1);
        assert!(r.is_identity());
    }

    #[test]
    fn test_output_length_matches_requested() {
        let r = Resampler::new(256, 512);
        let block = vec![0i16; 256];
        assert_eq!(r.resample(&block).len(), 512);

        let r = Resampler::new(512, 256);
        let block = vec![0i16; 512];
        assert_eq!(r.resample(&block).len(), 256);
    }

    #[test]
    fn test_upsample_interpolates_between_samples() {
        let r = Resampler::new(2, 3);
        let block = [0i16, 100];
        let out = r.resample(&block);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 100);
        assert!(out[1] > 0 && out[1] < 100);
    }

    #[test]
    fn test_clamps_to_i16_range() {
        let r = Resampler::new(3, 5);
        let block = [i16::MAX, i16::MAX, i16::MAX];
        let out = r.resample(&block);
        assert!(out.iter().all(|&s| s == i16::MAX));
    }
}

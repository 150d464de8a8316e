/*
Triangle Pulser
===============

A single symmetric triangle used as the excitation for hard impacts:

      h ┤    ╱╲
        │   ╱  ╲
        │  ╱    ╲
      0 ┼─╱──────╲───→ samples
          0   w/2  w

The width w sets the spectral content (a narrow pulse is bright, a wide one is
dull). The height is normalized so that every pulse carries the same energy
regardless of width:

    sum(x²) ≈ h² · w / 3   =>   h = amp · sqrt(3 / w)

A pulse spans as many blocks as it needs. While one is armed but has not
started playing, further `hit`s are ignored; once it is playing, a new hit
restarts it.
*/

#[derive(Debug, Clone)]
pub struct TriPulser {
    width: usize,
    height: f32,
    pos: usize,
    armed: bool,
}

impl Default for TriPulser {
    fn default() -> Self {
        Self::new()
    }
}

impl TriPulser {
    pub fn new() -> Self {
        Self {
            width: 1,
            height: 0.0,
            pos: 1,
            armed: false,
        }
    }

    /// Arm a pulse of `width_samples` (at least one). Returns `false` when a
    /// pulse is already armed and the hit was dropped.
    pub fn hit(&mut self, amp: f32, width_samples: f32) -> bool {
        if self.armed {
            return false;
        }
        let width = (width_samples.round() as usize).max(1);
        self.width = width;
        self.height = amp * (3.0 / width as f32).sqrt();
        self.pos = 0;
        self.armed = true;
        true
    }

    /// Write the next stretch of the pulse into `out`, zero-padding once done.
    pub fn render(&mut self, out: &mut [f32]) {
        self.armed = false;
        let half = self.width as f32 * 0.5;
        for sample in out.iter_mut() {
            *sample = if self.pos < self.width {
                let t = (self.pos as f32 + 0.5) / half;
                let shape = if t <= 1.0 { t } else { 2.0 - t };
                self.pos += 1;
                self.height * shape
            } else {
                0.0
            };
        }
    }

    pub fn is_quiet(&self) -> bool {
        !self.armed && self.pos >= self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|x| x * x).sum()
    }

    #[test]
    fn new_pulser_is_quiet() {
        let pulser = TriPulser::new();
        assert!(pulser.is_quiet());
    }

    #[test]
    fn pulse_is_symmetric_triangle() {
        let mut pulser = TriPulser::new();
        assert!(pulser.hit(1.0, 8.0));
        let mut out = vec![0.0; 12];
        pulser.render(&mut out);

        for i in 0..4 {
            assert!((out[i] - out[7 - i]).abs() < 1e-6, "not symmetric at {i}");
            assert!(out[i] > 0.0);
        }
        assert!(out[8..].iter().all(|&x| x == 0.0));
        assert!(pulser.is_quiet());
    }

    #[test]
    fn energy_is_independent_of_width() {
        let mut narrow = TriPulser::new();
        narrow.hit(1.0, 16.0);
        let mut a = vec![0.0; 512];
        narrow.render(&mut a);

        let mut wide = TriPulser::new();
        wide.hit(1.0, 400.0);
        let mut b = vec![0.0; 512];
        wide.render(&mut b);

        let (ea, eb) = (energy(&a), energy(&b));
        assert!((ea - 1.0).abs() < 0.05, "narrow energy {ea}");
        assert!((eb - 1.0).abs() < 0.05, "wide energy {eb}");
    }

    #[test]
    fn pulse_spans_blocks() {
        let mut pulser = TriPulser::new();
        pulser.hit(1.0, 100.0);

        let mut block = vec![0.0; 64];
        pulser.render(&mut block);
        assert!(!pulser.is_quiet());
        pulser.render(&mut block);
        assert!(pulser.is_quiet());
        assert!(block[..36].iter().all(|&x| x > 0.0));
        assert!(block[36..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn hit_while_armed_is_ignored() {
        let mut pulser = TriPulser::new();
        assert!(pulser.hit(1.0, 10.0));
        assert!(!pulser.hit(5.0, 100.0));
        assert_eq!(pulser.width(), 10);

        let mut block = vec![0.0; 4];
        pulser.render(&mut block);
        assert!(pulser.hit(1.0, 20.0), "a playing pulse can be restarted");
        assert_eq!(pulser.width(), 20);
    }
}

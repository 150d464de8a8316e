use std::fs;
use std::path::Path;

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// One vibration mode: frequency in Hz, decay rate in 1/s, linear amplitude.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mode {
    pub freq: f32,
    pub damp: f32,
    pub amp: f32,
}

impl Mode {
    pub fn new(freq: f32, damp: f32, amp: f32) -> Self {
        Self { freq, damp, amp }
    }
}

/// Read-only set of modes shared (behind an `Arc`) by every resonator that
/// sounds like the same object.
///
/// Text format, whitespace separated:
///
/// ```text
/// freq_scale damp_scale amp_scale
/// freq damp amp
/// freq damp amp
/// ...
/// ```
///
/// Reading stops at end of input or at the first token that is not a number.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ModalData {
    freq_scale: f32,
    damp_scale: f32,
    amp_scale: f32,
    modes: Vec<Mode>,
}

impl ModalData {
    pub fn new(modes: Vec<Mode>) -> Result<Self> {
        if modes.is_empty() {
            return Err(SynthError::ModalData("no modes".into()));
        }
        Ok(Self {
            freq_scale: 1.0,
            damp_scale: 1.0,
            amp_scale: 1.0,
            modes,
        })
    }

    pub fn with_scales(mut self, freq_scale: f32, damp_scale: f32, amp_scale: f32) -> Self {
        self.freq_scale = freq_scale;
        self.damp_scale = damp_scale;
        self.amp_scale = amp_scale;
        self
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut numbers = text.split_whitespace().map(str::parse::<f32>);
        let mut header = [0.0f32; 3];
        for (i, slot) in header.iter_mut().enumerate() {
            *slot = match numbers.next() {
                Some(Ok(x)) => x,
                Some(Err(e)) => {
                    return Err(SynthError::ModalData(format!("bad header value {i}: {e}")))
                }
                None => return Err(SynthError::ModalData("missing header".into())),
            };
        }

        let mut modes = Vec::new();
        let mut numbers = numbers.map_while(|n| n.ok());
        while let (Some(freq), Some(damp), Some(amp)) =
            (numbers.next(), numbers.next(), numbers.next())
        {
            modes.push(Mode { freq, damp, amp });
        }

        Ok(Self::new(modes)?.with_scales(header[0], header[1], header[2]))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let data = Self::parse(&text)?;
        debug!("loaded {} modes from {}", data.n_modes(), path.display());
        Ok(data)
    }

    /// Replace the modes from a file. On failure the current modes are kept.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<()> {
        *self = Self::load(path)?;
        Ok(())
    }

    pub fn n_modes(&self) -> usize {
        self.modes.len()
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn scales(&self) -> (f32, f32, f32) {
        (self.freq_scale, self.damp_scale, self.amp_scale)
    }

    /// Mode `i` with the file-level scales applied.
    pub fn scaled(&self, i: usize) -> Option<Mode> {
        self.modes.get(i).map(|m| Mode {
            freq: m.freq * self.freq_scale,
            damp: m.damp * self.damp_scale,
            amp: m.amp * self.amp_scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_triples() {
        let data = ModalData::parse("2 0.5 1\n100 3 0.1\n250 4 0.2\n").unwrap();
        assert_eq!(data.n_modes(), 2);
        assert_eq!(data.scales(), (2.0, 0.5, 1.0));
        assert_eq!(data.scaled(1), Some(Mode::new(500.0, 2.0, 0.2)));
    }

    #[test]
    fn stops_at_first_bad_token() {
        let data = ModalData::parse("1 1 1\n100 1 1\n200 1 1\n# trailing notes\n300 1 1").unwrap();
        assert_eq!(data.n_modes(), 2);
    }

    #[test]
    fn ignores_incomplete_last_triple() {
        let data = ModalData::parse("1 1 1 100 1 1 200 1").unwrap();
        assert_eq!(data.n_modes(), 1);
    }

    #[test]
    fn rejects_bad_header_and_empty_data() {
        assert!(matches!(ModalData::parse(""), Err(SynthError::ModalData(_))));
        assert!(matches!(ModalData::parse("1 x 1\n100 1 1"), Err(SynthError::ModalData(_))));
        assert!(matches!(ModalData::parse("1 1 1\n"), Err(SynthError::ModalData(_))));
    }

    #[test]
    fn failed_reload_keeps_previous_modes() {
        let mut data = ModalData::new(vec![Mode::new(440.0, 2.0, 1.0)]).unwrap();
        let missing = std::env::temp_dir().join("contact_dsp_missing_modes.txt");
        assert!(matches!(data.reload(&missing), Err(SynthError::Io(_))));
        assert_eq!(data.n_modes(), 1);
        assert_eq!(data.modes()[0].freq, 440.0);
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("contact_dsp_modes_{}.txt", std::process::id()));
        fs::write(&path, "1 1 1\n440 2 0.5\n880 3 0.25\n").unwrap();
        let data = ModalData::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(data.n_modes(), 2);
    }
}

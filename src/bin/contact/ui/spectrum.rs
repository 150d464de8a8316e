//! Spectrum of the scene output, with the ringing modes called out.
//!
//! Modal resonators show up as narrow peaks, so the display is linear in
//! frequency up to `MAX_FREQ` and the strongest local maxima are labelled.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const MAX_FREQ: f32 = 8_000.0;
const FLOOR_DB: f64 = -100.0;
const PEAKS: usize = 4;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    bin_hz: f64,
    /// (frequency Hz, level dB) up to `MAX_FREQ`.
    spectrum: Vec<(f64, f64)>,
    peaks: Vec<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(buffer_len: usize, sample_rate: f32) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(buffer_len);

        // Hann
        let denom = buffer_len.saturating_sub(1).max(1) as f32;
        let window = (0..buffer_len)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos()))
            .collect();

        let bin_hz = sample_rate as f64 / buffer_len.max(1) as f64;
        let n_bins = ((MAX_FREQ.min(sample_rate * 0.5) as f64 / bin_hz) as usize)
            .clamp(1, (buffer_len / 2).max(1));
        let spectrum = (0..n_bins).map(|i| (i as f64 * bin_hz, FLOOR_DB)).collect();

        Self {
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); buffer_len],
            bin_hz,
            spectrum,
            peaks: Vec::with_capacity(PEAKS),
        }
    }

    /// Analyze a new buffer. Buffers of the wrong length are ignored.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }
        for ((c, &s), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *c = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (i, (freq, db)) in self.spectrum.iter_mut().enumerate() {
            let power = self.scratch[i].norm_sqr().max(1e-12);
            *freq = i as f64 * self.bin_hz;
            *db = (10.0 * (power as f64).log10()).max(FLOOR_DB);
        }
        self.find_peaks();
    }

    /// Strongest local maxima at least 40 dB above the floor.
    fn find_peaks(&mut self) {
        let mut candidates: Vec<(f64, f64)> = self
            .spectrum
            .windows(3)
            .filter(|w| w[1].1 > w[0].1 && w[1].1 >= w[2].1 && w[1].1 > FLOOR_DB + 40.0)
            .map(|w| w[1])
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        self.peaks.clear();
        self.peaks
            .extend(candidates.iter().take(PEAKS).map(|&(freq, _)| freq));
        self.peaks.sort_by(f64::total_cmp);
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }

    pub fn peaks(&self) -> &[f64] {
        &self.peaks
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, analyzer: &SpectrumAnalyzer) {
    let peaks: Vec<String> = analyzer
        .peaks()
        .iter()
        .map(|f| format!("{f:.0}"))
        .collect();
    let title = if peaks.is_empty() {
        " Spectrum ".to_string()
    } else {
        format!(" Spectrum  ringing: {} Hz ", peaks.join(" / "))
    };

    let data = analyzer.data();
    let max_freq = data.last().map_or(1.0, |&(f, _)| f.max(1.0));
    let max_db = data.iter().map(|&(_, db)| db).fold(FLOOR_DB, f64::max);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(data);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, max_freq])
                .labels(vec!["0".to_string(), format!("{:.0}k", max_freq / 1000.0)])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, max_db.max(0.0) + 10.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

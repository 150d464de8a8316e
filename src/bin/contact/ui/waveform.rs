//! Oscilloscope of the scene output

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Render the last samples against the limiter threshold. The trace turns
/// yellow while the limiter is pulling the gain down and red if a sample
/// still gets past the threshold.
pub fn render_waveform(
    frame: &mut Frame,
    area: Rect,
    audio_buffer: &[f32],
    threshold: f32,
    limiter_gain: f32,
) {
    let len = audio_buffer.len().max(1) as f64;
    let trace: Vec<(f64, f64)> = audio_buffer
        .iter()
        .enumerate()
        .map(|(i, &sample)| (i as f64 / len, sample as f64))
        .collect();

    let ceiling = threshold as f64;
    let upper = [(0.0, ceiling), (1.0, ceiling)];
    let lower = [(0.0, -ceiling), (1.0, -ceiling)];

    let over = audio_buffer.iter().any(|s| s.abs() > threshold + 1e-4);
    let limiting = limiter_gain < 0.999;
    let color = match (over, limiting) {
        (true, _) => Color::Red,
        (false, true) => Color::Yellow,
        _ => Color::Cyan,
    };

    let guide = Style::default().fg(Color::DarkGray);
    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(guide)
            .data(&upper),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(guide)
            .data(&lower),
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&trace),
    ];

    let title = if limiting {
        format!(" Output  limiting {:+.1} dB ", 20.0 * limiter_gain.max(1e-6).log10())
    } else {
        " Output ".to_string()
    };
    let range = ceiling.max(1.0) * 1.1;

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(Axis::default().bounds([0.0, 1.0]).style(guide))
        .y_axis(Axis::default().bounds([-range, range]).style(guide));

    frame.render_widget(chart, area);
}

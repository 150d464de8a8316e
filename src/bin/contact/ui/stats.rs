//! Engine panel: pool usage, time budget, limiter, output levels

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use contact_dsp::pool::PoolUsage;
use contact_dsp::SceneStats;

use super::DemoInfo;

pub struct AudioLevels {
    pub peak: f32,
    pub rms: f32,
}

impl AudioLevels {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

fn usage_line(name: &str, usage: PoolUsage) -> Line<'static> {
    let color = if usage.active == usage.capacity {
        Color::Red
    } else if usage.active > 0 {
        Color::White
    } else {
        Color::DarkGray
    };
    Line::from(vec![
        Span::styled(format!(" {name:<12}"), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{:>3} / {:<3}", usage.active, usage.capacity),
            Style::default().fg(color),
        ),
        Span::styled(format!("  peak {}", usage.peak), Style::default().fg(Color::DarkGray)),
    ])
}

pub fn render_stats(
    frame: &mut Frame,
    area: Rect,
    info: &DemoInfo,
    stats: &SceneStats,
    levels: &AudioLevels,
    rolling: bool,
    dropped: usize,
) {
    let block = Block::default().title(" contact ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let mut lines = vec![
        usage_line("resonators", stats.active_resonators),
        usage_line("contacts", stats.contacts),
        usage_line("impacts", stats.impacts),
        usage_line("contact gen", stats.contact_gens),
        usage_line("impact gen", stats.impact_gens),
        usage_line("blocks", stats.blocks),
    ];
    if dropped > 0 {
        lines.push(Line::styled(
            format!(" {dropped} commands dropped"),
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(Paragraph::new(lines), columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(columns[1]);

    let header = Line::from(vec![
        Span::styled(
            format!("{:.1}kHz  ", info.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{} frames  latency {}  ", info.block_size, info.latency),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            if rolling { "● rolling" } else { "○ still" },
            Style::default().fg(if rolling { Color::Green } else { Color::Yellow }),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), rows[0]);

    let budget = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(stats.budget_load() as f64)
        .label(format!(
            "budget {:.0} / {:.0}",
            stats.time_cost, stats.max_time_cost
        ));
    frame.render_widget(budget, rows[2]);

    let gain = stats.limiter_gain.clamp(0.0, 1.0);
    let limiter = Gauge::default()
        .gauge_style(Style::default().fg(if gain < 1.0 { Color::Red } else { Color::Green }))
        .ratio(gain as f64)
        .label(format!("limiter gain {gain:.2}"));
    frame.render_widget(limiter, rows[3]);

    let levels = Paragraph::new(Line::styled(
        format!("peak {:.2}  rms {:.3}  ticks {}", levels.peak, levels.rms, stats.ticks),
        Style::default().fg(Color::Magenta),
    ));
    frame.render_widget(levels, rows[4]);
}

//! TUI for the contact demo
//!
//! The UI loop doubles as the physics step: every frame it reports the
//! rolling contact (if any) and closes the step, the way a game would once
//! per physics tick.

mod spectrum;
mod stats;
mod waveform;

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use contact_dsp::{BodyId, ContactData, ImpactData, SceneCommands, SceneStats};

use super::objects::DemoObjects;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use stats::{render_stats, AudioLevels};
use waveform::render_waveform;

/// Audio visualization buffer size
pub const VIS_BUFFER_SIZE: usize = 1024;

/// Fixed facts about the running engine.
#[derive(Debug, Clone, Copy)]
pub struct DemoInfo {
    pub sample_rate: f32,
    pub block_size: usize,
    /// Limiter delay in samples.
    pub latency: usize,
    /// Peak the limiter holds the output to.
    pub threshold: f32,
}

pub struct UiApp {
    info: DemoInfo,
    objects: DemoObjects,
    commands: SceneCommands,
    audio_rx: Consumer<f32>,
    stats_rx: Consumer<SceneStats>,
    stats: SceneStats,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    rolling: bool,
    roll_phase: f32,
    /// Commands lost to a full queue.
    dropped: usize,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        info: DemoInfo,
        objects: DemoObjects,
        commands: SceneCommands,
        audio_rx: Consumer<f32>,
        stats_rx: Consumer<SceneStats>,
    ) -> Self {
        Self {
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, info.sample_rate),
            info,
            objects,
            commands,
            audio_rx,
            stats_rx,
            stats: SceneStats::default(),
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            rolling: false,
            roll_phase: 0.0,
            dropped: 0,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.poll_stats();
            self.physics_step();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    fn poll_audio(&mut self) {
        let mut fresh = false;
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
            fresh = true;
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
        if fresh {
            self.spectrum.update(&self.audio_buffer);
        }
    }

    fn poll_stats(&mut self) {
        // Keep only the latest
        while let Ok(stats) = self.stats_rx.pop() {
            self.stats = stats;
        }
    }

    fn physics_step(&mut self) {
        if self.rolling {
            // the ball speeds up and slows down across the plate
            self.roll_phase = (self.roll_phase + 0.02) % std::f32::consts::TAU;
            let speed = 0.4 + 0.3 * self.roll_phase.sin();
            let data = ContactData {
                speed_contact_rel_body1: speed,
                speed_contact_rel_body2: speed,
                speed_body1_rel_body2: 0.01,
                contact_force: 2.0,
            };
            let sent = self.commands.touch(self.objects.ball, self.objects.plate, data);
            self.count_drop(sent.is_ok());
        }
        let sent = self.commands.end_physics_step();
        self.count_drop(sent.is_ok());
    }

    fn hit(&mut self, body1: BodyId, body2: BodyId, impulse: f32, tangent: f32) {
        let data = ImpactData {
            impulse,
            rel_tangent_speed: tangent,
            rel_normal_speed: impulse,
        };
        let sent = self.commands.impact(body1, body2, data);
        self.count_drop(sent.is_ok());
    }

    fn count_drop(&mut self, sent: bool) {
        if !sent {
            self.dropped += 1;
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        let DemoObjects { plate, bowl, ball } = self.objects;
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('1') => self.hit(ball, plate, 0.6, 0.0),
            KeyCode::Char('2') => self.hit(ball, bowl, 0.4, 0.0),
            KeyCode::Char('3') => self.hit(bowl, plate, 1.5, 1.2),
            KeyCode::Char('r') | KeyCode::Char('R') => self.rolling = !self.rolling,
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(10), // Scene stats
                Constraint::Min(6),     // Waveform
                Constraint::Min(6),     // Spectrum
                Constraint::Length(1),  // Help bar
            ])
            .split(area);

        let levels = AudioLevels::from_buffer(&self.audio_buffer);
        render_stats(
            frame,
            chunks[0],
            &self.info,
            &self.stats,
            &levels,
            self.rolling,
            self.dropped,
        );
        render_waveform(
            frame,
            chunks[1],
            &self.audio_buffer,
            self.info.threshold,
            self.stats.limiter_gain,
        );
        render_spectrum(frame, chunks[2], &self.spectrum);

        let help = Paragraph::new(
            " [1] ball→plate  [2] ball→bowl  [3] bowl skids on plate  [R] roll ball  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}

//! ContactDemo - audio stream setup and the block-sized render loop

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Producer, RingBuffer};

use contact_dsp::{EngineConfig, Scene, SceneStats};

use super::objects;
use super::ui::{DemoInfo, UiApp, VIS_BUFFER_SIZE};

/// Main application builder
pub struct ContactDemo {
    block_size: usize,
    max_time_cost: f32,
}

impl ContactDemo {
    pub fn new() -> Self {
        Self {
            block_size: 256,
            max_time_cost: 2_000.0,
        }
    }

    /// Scene block size in frames; independent of the device buffer size.
    pub fn block_size(mut self, frames: usize) -> Self {
        self.block_size = frames;
        self
    }

    pub fn max_time_cost(mut self, cost: f32) -> Self {
        self.max_time_cost = cost;
        self
    }

    /// Run the application (takes over the terminal, plays audio)
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let engine = EngineConfig::new()
            .sample_rate(sample_rate)
            .block_size(self.block_size)
            .max_time_cost(self.max_time_cost);
        let mut scene = Scene::new(engine).wrap_err("failed to build scene")?;
        let objects = objects::populate(&mut scene).wrap_err("failed to add demo bodies")?;
        let commands = scene.command_queue();

        let info = DemoInfo {
            sample_rate,
            block_size: self.block_size,
            latency: scene.latency(),
            threshold: scene.config().limiter.threshold,
        };

        let (audio_tx, audio_rx) = RingBuffer::<f32>::new(VIS_BUFFER_SIZE * 8);
        let (stats_tx, stats_rx) = RingBuffer::<SceneStats>::new(64);
        let mut render = BlockRender::new(scene, audio_tx, stats_tx);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| render.fill(data, channels),
            |err| eprintln!("Audio error: {}", err),
            None,
        )?;
        stream.play()?;

        let mut terminal = ratatui::init();
        let result = UiApp::new(info, objects, commands, audio_rx, stats_rx).run(&mut terminal);
        ratatui::restore();
        result
    }
}

impl Default for ContactDemo {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio-thread side: re-blocks the device's buffers into scene ticks.
struct BlockRender {
    scene: Scene,
    block: Vec<f32>,
    pos: usize,
    audio_tx: Producer<f32>,
    stats_tx: Producer<SceneStats>,
}

impl BlockRender {
    fn new(scene: Scene, audio_tx: Producer<f32>, stats_tx: Producer<SceneStats>) -> Self {
        let block_size = scene.context().block_size;
        Self {
            scene,
            block: vec![0.0; block_size],
            pos: block_size,
            audio_tx,
            stats_tx,
        }
    }

    fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels) {
            if self.pos == self.block.len() {
                self.scene.tick(&mut self.block);
                self.pos = 0;
                // UI only needs the latest; a full queue just skips one
                let _ = self.stats_tx.push(self.scene.stats());
            }
            let sample = self.block[self.pos];
            self.pos += 1;

            // mono to all channels
            frame.fill(sample);
            let _ = self.audio_tx.push(sample);
        }
    }
}

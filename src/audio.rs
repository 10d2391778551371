//! Sound effects and background music
//!
//! Audio is optional: with no output device or no `assets/` directory the
//! game runs silently.

use crate::events::GameEvent;
use crate::settings::AudioSettings;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Most block-break sounds layered for one removal
pub const MAX_BREAK_SOUNDS: usize = 10;
/// Gap between layered block-break sounds
const BREAK_STAGGER: Duration = Duration::from_millis(35);

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sfx {
    BlockBreak,
    Swoosh,
}

impl Sfx {
    fn filename(&self) -> &'static str {
        match self {
            Sfx::BlockBreak => "block_break.wav",
            Sfx::Swoosh => "swoosh.wav",
        }
    }
}

const BGM_FILE: &str = "theme.wav";

/// How many break sounds to layer for `removed` blocks
pub fn break_sound_count(removed: usize) -> usize {
    removed.min(MAX_BREAK_SOUNDS)
}

/// Settings percent to a rodio volume
pub fn volume_from_percent(percent: u32) -> f32 {
    (percent.min(100) as f32) / 100.0
}

/// Audio manager handles all sound playback
pub struct AudioManager {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    bgm_sink: Option<Sink>,
    assets_path: PathBuf,
    bgm_volume: f32,
    sfx_volume: f32,
    sfx_cache: HashMap<Sfx, Arc<[u8]>>,
}

impl AudioManager {
    /// Open the default output device. Returns None if there is no device or no assets.
    pub fn new(settings: &AudioSettings) -> Option<Self> {
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("No audio output, running silent: {}", e);
                return None;
            }
        };
        let Some(assets_path) = Self::find_assets_path() else {
            tracing::warn!("No assets directory found, running silent");
            return None;
        };
        tracing::info!("Audio assets at {}", assets_path.display());

        Some(Self {
            _stream: stream,
            stream_handle,
            bgm_sink: None,
            assets_path,
            bgm_volume: volume_from_percent(settings.bgm_volume),
            sfx_volume: volume_from_percent(settings.sfx_volume),
            sfx_cache: HashMap::new(),
        })
    }

    fn find_assets_path() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("assets")];
        if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(|p| p.join("assets"))) {
            paths.push(dir);
        }

        paths.into_iter().find(|p| p.join("sfx").exists())
    }

    /// Loop the background theme
    pub fn play_bgm(&mut self) {
        if self.bgm_sink.is_some() || self.bgm_volume <= 0.0 {
            return;
        }

        let path = self.assets_path.join("bgm").join(BGM_FILE);
        let Ok(bytes) = fs::read(&path) else {
            tracing::debug!("No background music at {}", path.display());
            return;
        };
        let Ok(sink) = Sink::try_new(&self.stream_handle) else { return };
        let Ok(decoder) = Decoder::new(Cursor::new(bytes)) else { return };

        sink.set_volume(self.bgm_volume);
        sink.append(decoder.repeat_infinite());
        self.bgm_sink = Some(sink);
    }

    /// Stop background music
    pub fn stop_bgm(&mut self) {
        if let Some(sink) = self.bgm_sink.take() {
            sink.stop();
        }
    }

    /// Pause background music
    pub fn pause_bgm(&mut self) {
        if let Some(sink) = &self.bgm_sink {
            sink.pause();
        }
    }

    /// Resume background music
    pub fn resume_bgm(&mut self) {
        if let Some(sink) = &self.bgm_sink {
            sink.play();
        }
    }

    /// Raw bytes of an effect, read from disk once
    fn sfx_bytes(&mut self, sfx: Sfx) -> Option<Arc<[u8]>> {
        if let Some(bytes) = self.sfx_cache.get(&sfx) {
            return Some(Arc::clone(bytes));
        }
        let path = self.assets_path.join("sfx").join(sfx.filename());
        match fs::read(&path) {
            Ok(bytes) => {
                let bytes: Arc<[u8]> = bytes.into();
                self.sfx_cache.insert(sfx, Arc::clone(&bytes));
                Some(bytes)
            }
            Err(e) => {
                tracing::debug!("Missing sound {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Play a sound effect after `delay`, on its own sink so effects overlap
    fn play_sfx_delayed(&mut self, sfx: Sfx, delay: Duration) {
        if self.sfx_volume <= 0.0 {
            return;
        }
        let Some(bytes) = self.sfx_bytes(sfx) else { return };
        let Ok(decoder) = Decoder::new(Cursor::new(bytes)) else { return };
        let Ok(sink) = Sink::try_new(&self.stream_handle) else { return };

        sink.set_volume(self.sfx_volume);
        sink.append(decoder.delay(delay));
        sink.detach(); // Let it play and clean up automatically
    }

    /// Play a sound effect
    pub fn play_sfx(&mut self, sfx: Sfx) {
        self.play_sfx_delayed(sfx, Duration::ZERO);
    }

    /// One staggered break sound per removed block, up to `MAX_BREAK_SOUNDS`
    pub fn play_block_break_multiple(&mut self, removed: usize) {
        for i in 0..break_sound_count(removed) {
            self.play_sfx_delayed(Sfx::BlockBreak, BREAK_STAGGER * i as u32);
        }
    }

    /// React to a rules engine event
    pub fn handle_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::BlocksRemoved { count } => self.play_block_break_multiple(*count),
            GameEvent::HardDrop { height } if *height > 0 => self.play_sfx(Sfx::Swoosh),
            _ => {}
        }
    }
}

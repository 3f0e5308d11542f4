/// Sound engine: flap effect and looping background music via rodio.
///
/// `Flap.wav` is read once at init time and replayed from memory; when it
/// is missing a short procedural chirp stands in. Music streams from
/// `Music.ogg` (or `Music.mp3`) and loops forever.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::fs::File;
    use std::io::{BufReader, Cursor};
    use std::path::Path;
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    use crate::config::AudioConfig;
    use crate::ui::assets::{find_asset, FLAP_SOUND, MUSIC};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_flap: Option<Arc<Vec<u8>>>,
        flap_volume: f32,
        /// Held so the music keeps playing.
        music: Option<Sink>,
    }

    impl SoundEngine {
        /// Open the default output device. `None` means the game runs silent.
        pub fn new(assets: &Path, audio: &AudioConfig) -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };

            let sfx_flap = audio.sound.then(|| Arc::new(load_flap(assets)));
            let mut engine = SoundEngine {
                _stream: stream,
                handle,
                sfx_flap,
                flap_volume: audio.flap_volume,
                music: None,
            };
            if audio.music {
                engine.music = engine.start_music(assets);
            }
            Some(engine)
        }

        fn start_music(&self, assets: &Path) -> Option<Sink> {
            let Some(path) = find_asset(assets, MUSIC) else {
                log::warn!("no music found in {}", assets.display());
                return None;
            };
            let source = File::open(&path)
                .map_err(|e| e.to_string())
                .and_then(|f| Decoder::new(BufReader::new(f)).map_err(|e| e.to_string()));
            match (source, Sink::try_new(&self.handle)) {
                (Ok(src), Ok(sink)) => {
                    log::info!("music: {}", path.display());
                    sink.append(src.repeat_infinite());
                    Some(sink)
                }
                (Err(e), _) => {
                    log::warn!("cannot decode {}: {e}", path.display());
                    None
                }
                (_, Err(e)) => {
                    log::warn!("cannot open music sink: {e}");
                    None
                }
            }
        }

        pub fn play_flap(&self) {
            let Some(buf) = &self.sfx_flap else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = Decoder::new(cursor) {
                    sink.set_volume(self.flap_volume);
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    fn load_flap(assets: &Path) -> Vec<u8> {
        match find_asset(assets, FLAP_SOUND).map(std::fs::read) {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                log::warn!("cannot read flap sound, using chirp: {e}");
                make_wav(&gen_chirp())
            }
            None => {
                log::warn!("no flap sound in {}, using chirp", assets.display());
                make_wav(&gen_chirp())
            }
        }
    }

    /// Quick upward sweep, loosely a wing beat.
    fn gen_chirp() -> Vec<f32> {
        let duration = 0.08;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = 900.0 + p * 900.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - p).powf(1.5);
                (phase * 2.0 * std::f32::consts::PI).sin() * env * 0.6
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new(_assets: &std::path::Path, _audio: &crate::config::AudioConfig) -> Option<Self> {
        Some(SoundEngine)
    }
    pub fn play_flap(&self) {}
}

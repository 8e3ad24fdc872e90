//! Audible alert for new unread activity.
//!
//! Uses rodio. The alert is decoded from bytes loaded once at startup; without
//! a sound file a short generated tone is played instead.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

pub trait AlertPlayer {
    fn play(&self) -> Result<(), String>;
}

pub struct RodioAlert {
    /// Output stream (must be kept alive for playback)
    _stream: Option<OutputStream>,
    stream_handle: Option<OutputStreamHandle>,
    sound: Option<Arc<[u8]>>,
}

impl RodioAlert {
    pub fn new(sound_path: Option<&Path>) -> Self {
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok((stream, handle)) => (Some(stream), Some(handle)),
            Err(e) => {
                tracing::warn!("Failed to initialize audio output: {}", e);
                (None, None)
            }
        };

        let sound: Option<Arc<[u8]>> = sound_path.and_then(|path| match std::fs::read(path) {
            Ok(bytes) => Some(Arc::from(bytes)),
            Err(e) => {
                tracing::warn!("Failed to load alert sound {}: {}", path.display(), e);
                None
            }
        });

        Self {
            _stream: stream,
            stream_handle,
            sound,
        }
    }

    pub fn is_available(&self) -> bool {
        self.stream_handle.is_some()
    }
}

impl AlertPlayer for RodioAlert {
    fn play(&self) -> Result<(), String> {
        let stream_handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| "Audio output not available".to_string())?;

        let sink =
            Sink::try_new(stream_handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;

        match &self.sound {
            Some(bytes) => {
                let source = Decoder::new(Cursor::new(bytes.clone()))
                    .map_err(|e| format!("Failed to decode alert sound: {}", e))?;
                sink.append(source);
            }
            None => {
                let tone = SineWave::new(880.0)
                    .take_duration(Duration::from_millis(150))
                    .amplify(0.2);
                sink.append(tone);
            }
        }
        sink.detach();
        Ok(())
    }
}

/// No audio device, or sound turned off at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlert;

impl AlertPlayer for SilentAlert {
    fn play(&self) -> Result<(), String> {
        Ok(())
    }
}

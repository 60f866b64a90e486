//! Alarm controller implementation
//!
//! Audio objects in rodio are not `Send`, so playback lives on a dedicated
//! thread fed by a channel. The controller itself holds only the channel
//! sender and the logical `active` flag, which it alone writes.

use crate::tone::FallbackTone;
use crate::AlarmError;
use detection::{AlarmSettings, SoundResource};
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{debug, error, info, warn};

/// Bundled sound played when no custom sound is selected
const DEFAULT_SOUND_FILE: &str = "alarm-default.mp3";

enum AudioCommand {
    Play { path: PathBuf, volume: f32 },
    SetVolume(f32),
    Stop,
}

/// Owns the alarm-active flag and drives playback
pub struct AlarmController {
    sound_dir: PathBuf,
    tx: Option<Sender<AudioCommand>>,
    active: bool,
}

impl AlarmController {
    /// Create a controller that resolves sound names inside `sound_dir`
    pub fn new(sound_dir: impl Into<PathBuf>) -> Self {
        Self {
            sound_dir: sound_dir.into(),
            tx: None,
            active: false,
        }
    }

    /// Start the alarm. No-op for audio if already active, but the volume
    /// is refreshed in case settings changed mid-alarm.
    pub fn start(&mut self, settings: &AlarmSettings) {
        if self.active {
            self.send(AudioCommand::SetVolume(settings.volume));
            return;
        }
        self.active = true;

        let path = self.resolve(&settings.sound);
        info!(path = %path.display(), volume = settings.volume, "alarm started");
        self.send(AudioCommand::Play {
            path,
            volume: settings.volume,
        });
    }

    /// Stop the alarm. No-op if not active.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.send(AudioCommand::Stop);
        info!("alarm stopped");
    }

    /// Whether the alarm is currently sounding
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn resolve(&self, sound: &SoundResource) -> PathBuf {
        match sound {
            SoundResource::Default => self.sound_dir.join(DEFAULT_SOUND_FILE),
            SoundResource::Named(name) => self.sound_dir.join(name),
        }
    }

    fn send(&mut self, cmd: AudioCommand) {
        let Some(tx) = self.sender().cloned() else {
            return;
        };
        if tx.send(cmd).is_err() {
            warn!("audio thread is gone; alarm playback unavailable");
            self.tx = None;
        }
    }

    fn sender(&mut self) -> Option<&Sender<AudioCommand>> {
        if self.tx.is_none() {
            let (tx, rx) = mpsc::channel::<AudioCommand>();
            let spawned = thread::Builder::new()
                .name("alarm-audio".to_string())
                .spawn(move || {
                    // Stream must outlive the sink; both stay on this thread.
                    let mut _stream: Option<OutputStream> = None;
                    let mut sink: Option<Sink> = None;

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AudioCommand::Play { path, volume } => {
                                if let Some(old) = sink.take() {
                                    old.stop();
                                }
                                match open_sink() {
                                    Ok((s, new_sink)) => {
                                        new_sink.set_volume(volume.clamp(0.0, 1.0));
                                        append_looping(&new_sink, &path);
                                        _stream = Some(s);
                                        sink = Some(new_sink);
                                    }
                                    Err(e) => {
                                        // Even the fallback cannot play without a device.
                                        error!(error = %e, "alarm playback unavailable");
                                        _stream = None;
                                    }
                                }
                            }
                            AudioCommand::SetVolume(volume) => {
                                if let Some(ref s) = sink {
                                    s.set_volume(volume.clamp(0.0, 1.0));
                                }
                            }
                            AudioCommand::Stop => {
                                if let Some(old) = sink.take() {
                                    old.stop();
                                }
                                _stream = None;
                            }
                        }
                    }
                });

            match spawned {
                Ok(_) => self.tx = Some(tx),
                Err(e) => {
                    error!(error = %e, "failed to spawn alarm audio thread");
                    return None;
                }
            }
        }
        self.tx.as_ref()
    }
}

fn open_sink() -> Result<(OutputStream, Sink), AlarmError> {
    let (stream, handle) =
        OutputStream::try_default().map_err(|e| AlarmError::Device(e.to_string()))?;
    let sink = Sink::try_new(&handle).map_err(|e| AlarmError::Device(e.to_string()))?;
    Ok((stream, sink))
}

/// Loop the sound file on the sink, falling back to the synthesized tone
/// when the file cannot be opened or decoded.
fn append_looping(sink: &Sink, path: &Path) {
    match decode_file(path) {
        Ok(source) => {
            sink.append(source.repeat_infinite());
            debug!(path = %path.display(), "alarm sound playing");
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "alarm sound failed; using fallback tone");
            sink.append(FallbackTone::new());
        }
    }
}

fn decode_file(path: &Path) -> Result<Decoder<BufReader<File>>, AlarmError> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_keeps_one_logical_alarm() {
        let mut controller = AlarmController::new("/nonexistent");
        let settings = AlarmSettings::default();

        controller.start(&settings);
        assert!(controller.is_active());

        // Second start is a no-op for playback; still exactly one alarm.
        controller.start(&settings);
        assert!(controller.is_active());

        controller.stop();
        assert!(!controller.is_active());
    }

    #[test]
    fn stop_when_inactive_is_a_noop() {
        let mut controller = AlarmController::new("/nonexistent");
        controller.stop();
        assert!(!controller.is_active());
    }

    #[test]
    fn resolve_falls_back_to_bundled_default() {
        let controller = AlarmController::new("/sounds");
        assert_eq!(
            controller.resolve(&SoundResource::Default),
            PathBuf::from("/sounds").join(DEFAULT_SOUND_FILE)
        );
        assert_eq!(
            controller.resolve(&SoundResource::Named("siren.mp3".into())),
            PathBuf::from("/sounds/siren.mp3")
        );
    }
}

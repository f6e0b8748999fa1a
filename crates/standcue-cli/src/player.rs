//! Sound output for live sessions.
//!
//! Every adapter reports one-shot completions over an unbounded channel that
//! the session loop selects on. Cancelled playbacks may still report; the
//! machine drops those as stale.

use std::time::Duration;

use standcue_core::storage::{AppConfig, SoundBackend};
use standcue_core::{CueId, PlaybackTicket, SoundError, SoundPlayer};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A finished playback as reported back to the session loop.
pub type Completion = (PlaybackTicket, Result<(), SoundError>);

/// Pick the adapter named by the app config.
pub fn build(
    config: &AppConfig,
    silent: bool,
    done: UnboundedSender<Completion>,
) -> Box<dyn SoundPlayer> {
    let cue_length = Duration::from_millis(config.sound.cue_length_ms);
    let backend = if silent {
        SoundBackend::Silent
    } else {
        config.sound.backend
    };
    match backend {
        SoundBackend::Bell => Box::new(BellPlayer::new(true, cue_length, done)),
        SoundBackend::Silent => Box::new(BellPlayer::new(false, cue_length, done)),
        #[cfg(feature = "audio")]
        SoundBackend::File => match file::FilePlayer::open(config.sounds_dir(), done.clone()) {
            Ok(player) => Box::new(player),
            Err(e) => {
                warn!(error = %e, "audio output unavailable, falling back to bell");
                Box::new(BellPlayer::new(true, cue_length, done))
            }
        },
        #[cfg(not(feature = "audio"))]
        SoundBackend::File => {
            warn!("built without the `audio` feature, falling back to bell");
            Box::new(BellPlayer::new(true, cue_length, done))
        }
    }
}

/// Rings the terminal bell and names the cue; each cue "plays" for a
/// nominal length. With the bell off it is fully silent.
pub struct BellPlayer {
    bell: bool,
    cue_length: Duration,
    done: UnboundedSender<Completion>,
    tasks: Vec<(CueId, JoinHandle<()>)>,
}

impl BellPlayer {
    pub fn new(bell: bool, cue_length: Duration, done: UnboundedSender<Completion>) -> Self {
        Self {
            bell,
            cue_length,
            done,
            tasks: Vec::new(),
        }
    }

    fn prune(&mut self) {
        self.tasks.retain(|(_, task)| !task.is_finished());
    }
}

fn ring(cue: &CueId) {
    eprintln!("\x07♪ {cue}");
}

impl SoundPlayer for BellPlayer {
    fn play(&mut self, ticket: PlaybackTicket, cue: &CueId) -> Result<(), SoundError> {
        self.prune();
        if self.bell {
            ring(cue);
        }
        let done = self.done.clone();
        let length = self.cue_length;
        let task = tokio::spawn(async move {
            tokio::time::sleep(length).await;
            let _ = done.send((ticket, Ok(())));
        });
        self.tasks.push((cue.clone(), task));
        Ok(())
    }

    fn stop(&mut self, cue: &CueId) {
        self.tasks.retain(|(c, task)| {
            if c == cue {
                task.abort();
                false
            } else {
                true
            }
        });
    }

    fn play_loop(&mut self, cue: &CueId) -> Result<(), SoundError> {
        self.prune();
        let bell = self.bell;
        let period = (self.cue_length * 2).max(Duration::from_millis(500));
        let name = cue.clone();
        let task = tokio::spawn(async move {
            loop {
                if bell {
                    ring(&name);
                }
                tokio::time::sleep(period).await;
            }
        });
        debug!(%cue, "attention loop started");
        self.tasks.push((cue.clone(), task));
        Ok(())
    }

    fn stop_all(&mut self) {
        for (_, task) in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(feature = "audio")]
mod file {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
    use standcue_core::{CueId, PlaybackTicket, SoundError, SoundPlayer};
    use tokio::sync::mpsc::UnboundedSender;
    use tracing::info;

    use super::Completion;

    const EXTENSIONS: [&str; 4] = ["wav", "ogg", "mp3", "flac"];

    /// Decodes `<sounds_dir>/<cue>.<ext>` and plays it on the default device.
    pub struct FilePlayer {
        dir: PathBuf,
        stream: OutputStream,
        done: UnboundedSender<Completion>,
        sinks: Vec<(CueId, Arc<Sink>)>,
    }

    impl FilePlayer {
        pub fn open(dir: PathBuf, done: UnboundedSender<Completion>) -> Result<Self, SoundError> {
            let stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;
            info!(dir = %dir.display(), "audio output opened");
            Ok(Self {
                dir,
                stream,
                done,
                sinks: Vec::new(),
            })
        }

        fn decode(&self, cue: &CueId) -> Result<Decoder<BufReader<File>>, SoundError> {
            let path = EXTENSIONS
                .iter()
                .map(|ext| self.dir.join(format!("{cue}.{ext}")))
                .find(|p| p.is_file())
                .ok_or_else(|| SoundError::MissingCue(cue.clone()))?;
            let file = File::open(&path)
                .map_err(|e| SoundError::PlaybackFailed(format!("{}: {e}", path.display())))?;
            Decoder::new(BufReader::new(file))
                .map_err(|e| SoundError::PlaybackFailed(format!("{}: {e}", path.display())))
        }

        fn sink(&mut self, cue: &CueId) -> Arc<Sink> {
            self.sinks.retain(|(_, sink)| !sink.empty());
            let sink = Arc::new(Sink::connect_new(self.stream.mixer()));
            self.sinks.push((cue.clone(), Arc::clone(&sink)));
            sink
        }
    }

    impl SoundPlayer for FilePlayer {
        fn play(&mut self, ticket: PlaybackTicket, cue: &CueId) -> Result<(), SoundError> {
            let source = self.decode(cue)?;
            let sink = self.sink(cue);
            sink.append(source);
            let done = self.done.clone();
            tokio::task::spawn_blocking(move || {
                sink.sleep_until_end();
                let _ = done.send((ticket, Ok(())));
            });
            Ok(())
        }

        fn stop(&mut self, cue: &CueId) {
            self.sinks.retain(|(c, sink)| {
                if c == cue {
                    sink.stop();
                    false
                } else {
                    true
                }
            });
        }

        fn play_loop(&mut self, cue: &CueId) -> Result<(), SoundError> {
            let source = self.decode(cue)?;
            self.sink(cue).append(source.repeat_infinite());
            Ok(())
        }

        fn stop_all(&mut self) {
            for (_, sink) in self.sinks.drain(..) {
                sink.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn completes_after_cue_length() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut player = BellPlayer::new(false, Duration::from_millis(700), tx);
        player.play(PlaybackTicket(1), &CueId::new("beep")).unwrap();

        let (ticket, result) = rx.recv().await.unwrap();
        assert_eq!(ticket, PlaybackTicket(1));
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stop_all_cancels_pending_completions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut player = BellPlayer::new(false, Duration::from_millis(700), tx);
        player.play(PlaybackTicket(1), &CueId::new("beep")).unwrap();
        player.play_loop(&CueId::new("attention")).unwrap();
        player.stop_all();
        drop(player);

        // Every sender is gone once the aborted tasks are dropped.
        assert!(rx.recv().await.is_none());
    }
}

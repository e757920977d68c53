//! espeak-ng backend
//!
//! Spawns one `espeak-ng` process per utterance and lets it play the audio
//! itself (PulseAudio / ALSA). Unlike the native backend this one can pause:
//! the child is stopped with `SIGSTOP` and continued with `SIGCONT`.
//!
//! On WSL the WSLg PulseAudio server is auto-detected.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)

use crate::platform::is_wsl;
use crate::speech::utterance::{scale_to_range, Utterance, Voice, MAX_PITCH};
use crate::speech::{EndCallback, EngineFeatures, SpeechEngine};
use crate::{Result, TtsrecError};
use log::{debug, error, info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How often the watcher checks whether the child has exited
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// espeak-ng speed limits and default, words per minute
const MIN_SPEED: f32 = 80.0;
const NORMAL_SPEED: f32 = 175.0;
const MAX_SPEED: f32 = 450.0;

/// One row of `espeak-ng --voices`:
/// `Pty Language Age/Gender VoiceName File Other Languages`
static VOICE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\s+(?P<lang>\S+)\s+\S+\s+(?P<name>\S+)\s+\S+")
        .expect("voice line pattern is valid")
});

/// The process speaking the current utterance
struct ActiveUtterance {
    id: u64,
    child: Child,
    paused: bool,
}

type Slot = Arc<Mutex<Option<ActiveUtterance>>>;

/// espeak-ng subprocess backend
pub struct EspeakEngine {
    /// Currently running espeak-ng process, shared with its watcher thread
    current: Slot,

    /// Id handed to the next utterance so stale watchers can tell they lost
    next_id: u64,

    /// Coordinator's end-of-utterance notification
    on_end: Arc<Mutex<Option<EndCallback>>>,

    /// Cached volume setting (0-100)
    volume: u8,

    /// Path to espeak-ng
    espeak_path: String,
}

impl EspeakEngine {
    /// Setup PulseAudio server environment
    ///
    /// Auto-detects WSLG PulseAudio server and sets PULSE_SERVER if needed.
    fn setup_pulseaudio() -> Result<()> {
        const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";

        if std::env::var("PULSE_SERVER").is_ok() {
            debug!("PULSE_SERVER already set via environment");
            return Ok(());
        }

        if std::path::Path::new(WSLG_PULSE_PATH).exists() {
            info!("Auto-detected WSLG PulseAudio server at {}", WSLG_PULSE_PATH);
            std::env::set_var("PULSE_SERVER", WSLG_PULSE_PATH);
            return Ok(());
        }

        if is_wsl() {
            warn!("WSLG PulseAudio server not found at {}", WSLG_PULSE_PATH);
            warn!("Make sure WSLg is installed and running, or set PULSE_SERVER");
            return Err(TtsrecError::Speech(
                "PulseAudio server not found. Install WSLg or set PULSE_SERVER environment variable."
                    .to_string(),
            ));
        }

        // Native Linux uses the default PulseAudio/ALSA configuration
        Ok(())
    }

    /// Create a new espeak-ng engine
    ///
    /// Verifies espeak-ng is installed
    pub fn new() -> Result<Self> {
        debug!("Creating espeak-ng backend");

        Self::setup_pulseaudio()?;

        let espeak_path = Self::find_espeak()?;
        debug!("Found espeak-ng at: {}", espeak_path);

        Ok(Self {
            current: Arc::new(Mutex::new(None)),
            next_id: 0,
            on_end: Arc::new(Mutex::new(None)),
            volume: 50,
            espeak_path,
        })
    }

    /// Find espeak-ng executable
    fn find_espeak() -> Result<String> {
        let paths = ["espeak-ng", "/usr/bin/espeak-ng", "/usr/local/bin/espeak-ng"];

        for path in paths {
            if let Ok(status) = Command::new(path)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                if status.success() {
                    return Ok(path.to_string());
                }
            }
        }

        Err(TtsrecError::Speech(
            "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
        ))
    }

    /// Convert a rate multiplier to espeak speed (80-450 wpm)
    fn rate_to_speed(rate: f32) -> u16 {
        (NORMAL_SPEED * rate).clamp(MIN_SPEED, MAX_SPEED).round() as u16
    }

    /// Convert a pitch multiplier to espeak pitch (0-99, 50 is normal)
    fn pitch_to_espeak(pitch: f32) -> u8 {
        scale_to_range(pitch, MAX_PITCH, 0.0, 50.0, 99.0).round() as u8
    }

    /// Convert volume (0-100) to espeak amplitude (0-200)
    fn volume_to_amplitude(volume: u8) -> u8 {
        ((volume.min(100) as u16 * 200) / 100) as u8
    }

    /// Parse the output of `espeak-ng --voices`
    fn parse_voices(output: &str) -> Vec<Voice> {
        output
            .lines()
            .filter_map(|line| VOICE_LINE.captures(line))
            .map(|caps| {
                let lang = &caps["lang"];
                let name = caps["name"].replace('_', " ");
                Voice::new(lang, name, lang)
            })
            .collect()
    }

    fn signal_current(&self, signal: Signal, paused: bool) -> Result<bool> {
        let mut guard = self
            .current
            .lock()
            .map_err(|_| TtsrecError::Speech("Speech process lock poisoned".to_string()))?;

        let Some(active) = guard.as_mut() else {
            return Ok(false);
        };
        if active.paused == paused {
            return Ok(false);
        }

        let pid = Pid::from_raw(active.child.id() as i32);
        kill(pid, signal)
            .map_err(|e| TtsrecError::Speech(format!("Failed to signal espeak-ng: {}", e)))?;
        active.paused = paused;
        Ok(true)
    }

    /// Cancel any currently running speech process
    fn cancel_process(&mut self) {
        let taken = match self.current.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };

        if let Some(mut active) = taken {
            debug!("Killing espeak-ng process");
            match active.child.kill() {
                Ok(_) => {
                    let _ = active.child.wait(); // Clean up zombie
                }
                Err(e) => {
                    debug!("Failed to kill espeak-ng process: {}", e);
                }
            }
        }
    }

    /// Wait for utterance `id` to exit and report its end
    fn spawn_watcher(&self, id: u64) {
        let current = self.current.clone();
        let on_end = self.on_end.clone();

        thread::spawn(move || loop {
            thread::sleep(WATCH_INTERVAL);

            let mut guard = match current.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let finished = match guard.as_mut() {
                Some(active) if active.id == id => match active.child.try_wait() {
                    Ok(Some(status)) => {
                        debug!("espeak-ng exited with {}", status);
                        true
                    }
                    Ok(None) => false,
                    Err(e) => {
                        warn!("Lost track of espeak-ng process: {}", e);
                        true
                    }
                },
                // Cancelled or replaced by a newer utterance
                _ => return,
            };

            if finished {
                *guard = None;
                drop(guard);
                if let Ok(mut callback) = on_end.lock() {
                    if let Some(callback) = callback.as_mut() {
                        callback();
                    }
                }
                return;
            }
        });
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak"
    }

    fn features(&self) -> EngineFeatures {
        EngineFeatures {
            pause: true,
            pitch: true,
            rate: true,
            voices: true,
        }
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        let output = Command::new(&self.espeak_path)
            .arg("--voices")
            .stderr(Stdio::null())
            .output()
            .map_err(|e| TtsrecError::Speech(format!("Failed to list voices: {}", e)))?;

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(Self::parse_voices(&text))
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        if utterance.text().trim().is_empty() {
            return Ok(());
        }

        self.cancel_process();

        let voice = utterance.voice().map(|v| v.id.as_str()).unwrap_or("en");
        let mut cmd = Command::new(&self.espeak_path);
        cmd.arg("-v").arg(voice);
        cmd.arg("-s").arg(Self::rate_to_speed(utterance.rate()).to_string());
        cmd.arg("-p").arg(Self::pitch_to_espeak(utterance.pitch()).to_string());
        cmd.arg("-a").arg(Self::volume_to_amplitude(self.volume).to_string());
        // Text goes through stdin so leading dashes are never read as options
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        debug!("Speaking: {}", utterance.text());
        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn espeak-ng: {}", e);
            TtsrecError::Speech(format!("Failed to start espeak-ng: {}", e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(utterance.text().as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TtsrecError::Speech(format!("Failed to send text: {}", e)));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        {
            let mut guard = self
                .current
                .lock()
                .map_err(|_| TtsrecError::Speech("Speech process lock poisoned".to_string()))?;
            *guard = Some(ActiveUtterance {
                id,
                child,
                paused: false,
            });
        }
        self.spawn_watcher(id);

        debug!("espeak-ng process started");
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if self.signal_current(Signal::SIGSTOP, true)? {
            debug!("espeak-ng paused");
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if self.signal_current(Signal::SIGCONT, false)? {
            debug!("espeak-ng resumed");
        }
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        self.cancel_process();
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn is_paused(&self) -> bool {
        self.current
            .lock()
            .map(|guard| guard.as_ref().map_or(false, |active| active.paused))
            .unwrap_or(false)
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        debug!("Setting volume to {}", volume);
        self.volume = volume.min(100);
        Ok(())
    }

    fn on_end(&mut self, callback: EndCallback) -> Result<()> {
        let mut guard = self
            .on_end
            .lock()
            .map_err(|_| TtsrecError::Speech("End callback lock poisoned".to_string()))?;
        *guard = Some(callback);
        Ok(())
    }
}

impl Drop for EspeakEngine {
    fn drop(&mut self) {
        debug!("Shutting down espeak-ng backend");
        self.cancel_process();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_conversion() {
        assert_eq!(EspeakEngine::rate_to_speed(1.0), 175);
        assert_eq!(EspeakEngine::rate_to_speed(2.0), 350);
        assert_eq!(EspeakEngine::rate_to_speed(0.1), 80); // Slowest
        assert_eq!(EspeakEngine::rate_to_speed(10.0), 450); // Fastest
    }

    #[test]
    fn test_pitch_conversion() {
        assert_eq!(EspeakEngine::pitch_to_espeak(1.0), 50);
        assert_eq!(EspeakEngine::pitch_to_espeak(0.0), 0);
        assert_eq!(EspeakEngine::pitch_to_espeak(2.0), 99);
    }

    #[test]
    fn test_volume_conversion() {
        assert_eq!(EspeakEngine::volume_to_amplitude(0), 0);
        assert_eq!(EspeakEngine::volume_to_amplitude(50), 100);
        assert_eq!(EspeakEngine::volume_to_amplitude(100), 200);
        assert_eq!(EspeakEngine::volume_to_amplitude(255), 200);
    }

    #[test]
    fn test_parse_voices() {
        let output = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en            (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
";
        let voices = EspeakEngine::parse_voices(output);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0], Voice::new("af", "Afrikaans", "af"));
        assert_eq!(voices[1].name, "English (Great Britain)");
        assert_eq!(voices[2].id, "en-us");
        assert_eq!(voices[2].language, "en-us");
    }

    #[test]
    fn test_create_espeak_engine() {
        match EspeakEngine::new() {
            Ok(engine) => {
                assert!(!engine.is_speaking());
                assert!(!engine.is_paused());
                println!("✓ espeak-ng backend available");
            }
            Err(e) => println!("⚠ espeak-ng backend not available: {}", e),
        }
    }
}

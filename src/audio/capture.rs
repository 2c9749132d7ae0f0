use anyhow::{anyhow, Result};
use libpulse_binding as pulse;
use libpulse_simple_binding as psimple;
use pulse::sample::{Format, Spec};
use pulse::stream::Direction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use wavestrip::session::SpectrumProvider;
use wavestrip::{ProviderError, SourceId};

use super::fft::SpectrumAnalyzer;
use super::AudioSettings;

/// Latest byte spectrum published by the capture thread.
pub type SpectrumFrame = Arc<Vec<u8>>;

/// Capture thread reading the sink monitor and publishing spectra.
struct AudioCapture {
    capture_thread: Option<thread::JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

impl AudioCapture {
    fn start(settings: &AudioSettings, sender: watch::Sender<SpectrumFrame>) -> Result<Self> {
        let source = match &settings.device {
            Some(sink_name) => {
                let monitor = format!("{}.monitor", sink_name);
                info!("Using explicit sink monitor: {}", monitor);
                Some(monitor)
            }
            None => find_monitor_source(),
        };

        let spec = Spec {
            format: Format::F32le,
            channels: 2,
            rate: settings.sample_rate,
        };
        if !spec.is_valid() {
            return Err(anyhow!("Invalid PulseAudio sample spec"));
        }

        let pulse = psimple::Simple::new(
            None,
            "wavestrip",
            Direction::Record,
            source.as_deref(),
            "spectrum-strip",
            &spec,
            None,
            None,
        )
        .map_err(|e| anyhow!("Failed to connect to PulseAudio: {:?}", e))?;

        info!(
            "Capturing {} at {} Hz",
            source.as_deref().unwrap_or("default source"),
            settings.sample_rate
        );

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_clone = stop_flag.clone();
        let analyzer = SpectrumAnalyzer::new(settings);
        let frames = settings.fft_size;

        let capture_thread = thread::Builder::new()
            .name("wavestrip-capture".to_string())
            .spawn(move || capture_loop(pulse, analyzer, frames, sender, stop_flag_clone))?;

        Ok(Self {
            capture_thread: Some(capture_thread),
            stop_flag,
        })
    }

    /// Stop the thread and wait for it to finish its current read.
    fn stop(mut self) -> Result<(), ProviderError> {
        self.stop_flag.store(true, Ordering::Relaxed);
        match self.capture_thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| ProviderError::Disconnect("capture thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

fn capture_loop(
    pulse: psimple::Simple,
    mut analyzer: SpectrumAnalyzer,
    frames: usize,
    sender: watch::Sender<SpectrumFrame>,
    stop_flag: Arc<AtomicBool>,
) {
    // interleaved stereo f32le
    let mut raw = vec![0u8; frames * 2 * std::mem::size_of::<f32>()];
    let mut mono = vec![0.0f32; frames];
    let mut spectrum = Vec::with_capacity(analyzer.bins());

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            debug!("Stop flag set, ending capture loop");
            break;
        }

        if let Err(e) = pulse.read(&mut raw) {
            warn!("PulseAudio read error: {:?}", e);
            thread::sleep(Duration::from_millis(50));
            continue;
        }

        for (slot, frame) in mono.iter_mut().zip(raw.chunks_exact(8)) {
            let left = f32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
            let right = f32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
            *slot = (left + right) / 2.0;
        }

        analyzer.process(&mono, &mut spectrum);

        if sender.send(Arc::new(spectrum.clone())).is_err() {
            debug!("Spectrum receiver dropped, stopping capture");
            break;
        }
    }
}

/// Monitor source of the default sink, so we capture whatever the user hears.
fn find_monitor_source() -> Option<String> {
    if let Ok(output) = std::process::Command::new("pactl")
        .args(["get-default-sink"])
        .output()
    {
        if output.status.success() {
            let sink_name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !sink_name.is_empty() {
                let monitor = format!("{}.monitor", sink_name);
                info!("Using default sink monitor: {}", monitor);
                return Some(monitor);
            }
        }
    }

    warn!("Could not determine default sink, using PulseAudio default source");
    None
}

/// Live connection: the running capture plus the receiving end of its spectra.
pub struct CaptureHandle {
    capture: AudioCapture,
    frames: watch::Receiver<SpectrumFrame>,
}

/// Spectrum provider backed by the PulseAudio (or PipeWire) sink monitor.
///
/// Players share the sink, so every source maps onto the same monitor; the
/// session still opens and closes it as players come and go.
pub struct PulseSpectrum {
    settings: AudioSettings,
}

impl PulseSpectrum {
    pub fn new(settings: AudioSettings) -> Self {
        Self { settings }
    }
}

impl SpectrumProvider for PulseSpectrum {
    type Handle = CaptureHandle;

    fn connect(&mut self, source: SourceId) -> Result<CaptureHandle, ProviderError> {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let capture = AudioCapture::start(&self.settings, tx).map_err(|e| ProviderError::Connect {
            source_id: source,
            reason: format!("{:#}", e),
        })?;
        Ok(CaptureHandle {
            capture,
            frames: rx,
        })
    }

    fn disconnect(&mut self, handle: CaptureHandle) -> Result<(), ProviderError> {
        handle.capture.stop()
    }

    fn sample(&mut self, handle: &CaptureHandle, out: &mut Vec<u8>) -> Result<(), ProviderError> {
        let frame = handle.frames.borrow();
        if frame.is_empty() {
            return Err(ProviderError::SampleUnavailable);
        }
        out.clear();
        out.extend_from_slice(&frame);
        Ok(())
    }
}

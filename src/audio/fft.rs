use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::AudioSettings;

/// Byte spectrum in the style of an analyser node: Blackman window, linear
/// magnitude smoothing over time, decibels mapped onto 0-255.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    previous_magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(settings: &AudioSettings) -> Self {
        let fft_size = settings.fft_size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let n = fft_size as f32;
        let tau = 2.0 * std::f32::consts::PI;
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (tau * x).cos() + 0.08 * (2.0 * tau * x).cos()
            })
            .collect();

        let (min_decibels, max_decibels) = if settings.max_decibels > settings.min_decibels {
            (settings.min_decibels, settings.max_decibels)
        } else {
            (-100.0, -30.0)
        };

        Self {
            fft_size,
            smoothing: settings.smoothing.clamp(0.0, 1.0),
            min_decibels,
            max_decibels,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            window,
            previous_magnitudes: vec![0.0; fft_size / 2],
        }
    }

    /// Number of magnitudes produced per frame.
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyse the most recent `fft_size` mono samples into `out`.
    pub fn process(&mut self, samples: &[f32], out: &mut Vec<u8>) {
        let start = samples.len().saturating_sub(self.fft_size);
        let recent = &samples[start..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = recent.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        out.clear();
        for (bin, previous) in self.previous_magnitudes.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() * scale;
            let smoothed = self.smoothing * *previous + (1.0 - self.smoothing) * magnitude;
            let smoothed = if smoothed.is_finite() { smoothed } else { 0.0 };
            *previous = smoothed;

            let byte = if smoothed <= 0.0 {
                0
            } else {
                let db = 20.0 * smoothed.log10();
                (255.0 * (db - self.min_decibels) / range).clamp(0.0, 255.0) as u8
            };
            out.push(byte);
        }
    }
}

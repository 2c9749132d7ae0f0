#[cfg(feature = "pulse")]
mod capture;
mod fft;

#[cfg(feature = "pulse")]
pub use capture::PulseSpectrum;

use crate::config::AudioConfig;

/// Capture and analysis parameters handed to the capture thread.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

impl From<&AudioConfig> for AudioSettings {
    fn from(config: &AudioConfig) -> Self {
        Self {
            device: config.device.clone(),
            sample_rate: config.sample_rate,
            fft_size: config.fft_size.clamp(32, 32768).next_power_of_two(),
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }
}

/// Provider used when the binary is built without audio capture: every
/// connection is refused, so the strip runs degraded and draws silence.
#[cfg(not(feature = "pulse"))]
pub struct SilentSpectrum;

#[cfg(not(feature = "pulse"))]
impl wavestrip::session::SpectrumProvider for SilentSpectrum {
    type Handle = ();

    fn connect(&mut self, source: wavestrip::SourceId) -> Result<(), wavestrip::ProviderError> {
        Err(wavestrip::ProviderError::Connect {
            source_id: source,
            reason: "built without audio capture".to_string(),
        })
    }

    fn disconnect(&mut self, _handle: ()) -> Result<(), wavestrip::ProviderError> {
        Ok(())
    }

    fn sample(&mut self, _handle: &(), _out: &mut Vec<u8>) -> Result<(), wavestrip::ProviderError> {
        Err(wavestrip::ProviderError::SampleUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_size_is_rounded_to_a_power_of_two() {
        let config = AudioConfig {
            fft_size: 300,
            ..AudioConfig::default()
        };
        assert_eq!(AudioSettings::from(&config).fft_size, 512);
        assert_eq!(AudioSettings::default().fft_size, 256);
    }
}

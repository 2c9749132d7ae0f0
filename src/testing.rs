//! Test doubles for the core's collaborators.

use crate::error::{ProviderError, StoreError};
use crate::mapping::DrawCommand;
use crate::renderer::RenderSurface;
use crate::session::SpectrumProvider;
use crate::settings::{SettingKey, SettingsStore};
use crate::source::SourceId;

/// Provider that hands out numbered tokens and counts what is live.
#[derive(Debug, Default)]
pub struct FakeProvider {
    frame: Vec<u8>,
    live: usize,
    connects: usize,
    disconnects: usize,
    fail_connect_every: u32,
    fail_disconnect: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(frame: Vec<u8>) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    pub fn failing_connect() -> Self {
        Self::new().fail_connect_every(1)
    }

    pub fn failing_disconnect() -> Self {
        Self {
            fail_disconnect: true,
            ..Self::default()
        }
    }

    /// Fail every `n`th connect attempt; 0 never fails.
    pub fn fail_connect_every(mut self, n: u32) -> Self {
        self.fail_connect_every = n;
        self
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn connects(&self) -> usize {
        self.connects
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects
    }
}

impl SpectrumProvider for FakeProvider {
    type Handle = usize;

    fn connect(&mut self, source: SourceId) -> Result<usize, ProviderError> {
        self.connects += 1;
        let n = self.fail_connect_every as usize;
        if n > 0 && self.connects % n == 0 {
            return Err(ProviderError::Connect {
                source_id: source,
                reason: "refused by test".to_string(),
            });
        }
        self.live += 1;
        Ok(self.connects)
    }

    fn disconnect(&mut self, _handle: usize) -> Result<(), ProviderError> {
        self.disconnects += 1;
        self.live = self.live.saturating_sub(1);
        if self.fail_disconnect {
            return Err(ProviderError::Disconnect("refused by test".to_string()));
        }
        Ok(())
    }

    fn sample(&mut self, _handle: &usize, out: &mut Vec<u8>) -> Result<(), ProviderError> {
        if self.frame.is_empty() {
            return Err(ProviderError::SampleUnavailable);
        }
        out.clear();
        out.extend_from_slice(&self.frame);
        Ok(())
    }
}

/// Store whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub attempts: usize,
}

impl SettingsStore for FailingStore {
    fn get(&self, key: SettingKey) -> Result<Option<f64>, StoreError> {
        Err(StoreError::InvalidValue { key: key.as_str() })
    }

    fn set(&mut self, _key: SettingKey, _value: f64) -> Result<(), StoreError> {
        self.attempts += 1;
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}

/// Surface that keeps every frame it is handed.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub frames: Vec<(Vec<DrawCommand>, f32, f32)>,
}

impl RenderSurface for RecordingSurface {
    fn draw(&mut self, commands: &[DrawCommand], width: f32, height: f32) {
        self.frames.push((commands.to_vec(), width, height));
    }
}

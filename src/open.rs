// Acquisition step turning a `MediaData` into an input for a specific engine.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::error::{MediaSourceOpenError, OpenFailure};
use crate::input::SeekableInput;
use crate::media::{InputContext, MediaData};

/// Capabilities and on/off switch of the playback engine inputs are opened for.
#[derive(Debug)]
pub struct EngineGate {
    name: String,
    enabled: AtomicBool,
    incremental_read: bool,
}

impl EngineGate {
    /// `incremental_read` is whether the engine tolerates reads that wait for
    /// bytes still being downloaded.
    pub fn new(name: impl Into<String>, incremental_read: bool) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            incremental_read,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::AcqRel) != enabled {
            info!("engine {} enabled={}", self.name, enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Open an input on `media` for this engine.
    pub async fn open(
        &self,
        media: &dyn MediaData,
        ctx: &InputContext,
    ) -> Result<Box<dyn SeekableInput>, MediaSourceOpenError> {
        if !self.is_enabled() {
            return Err(MediaSourceOpenError::new(OpenFailure::EngineDisabled)
                .with_message(format!("engine {} is disabled", self.name)));
        }
        if media.is_progressive() && !self.incremental_read {
            return Err(MediaSourceOpenError::new(OpenFailure::UnsupportedVideoSource)
                .with_message(format!(
                    "engine {} cannot read a source that is still downloading",
                    self.name
                )));
        }

        let input = media.create_input(ctx).await.map_err(|e| {
            warn!("engine {} failed to create input: {}", self.name, e);
            MediaSourceOpenError::new(OpenFailure::NoMatchingFile)
                .with_message("media input could not be created")
                .with_cause(e)
        })?;

        // The engine may have been switched off while the input was being created.
        if !self.is_enabled() {
            let mut input = input;
            input.close();
            return Err(MediaSourceOpenError::new(OpenFailure::EngineDisabled)
                .with_message(format!("engine {} was disabled while opening", self.name)));
        }
        Ok(input)
    }
}

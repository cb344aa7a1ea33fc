use thiserror::Error;

/// Pixel dimensions of a single key display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFormat {
    pub width: u32,
    pub height: u32,
}

impl KeyFormat {
    /// Byte length of a native key image (RGB888, row-major).
    pub fn byte_len(&self) -> usize {
        (self.width * self.height * 3) as usize
    }
}

/// A raw hardware event: one key going down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u8,
    pub pressed: bool,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no key panel found")]
    NotFound,
    #[error("device is not open")]
    NotOpen,
    #[error("key index {0} out of range")]
    InvalidKey(u8),
    #[error("image payload size mismatch (expected {expected} bytes, got {actual})")]
    BadImageSize { expected: usize, actual: usize },
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),
}

/// Capability contract for a grid key panel.
///
/// The adapter owns the physical transport; this crate only drives it.
/// Key images are RGB888 bytes, row-major, sized per [`KeyFormat::byte_len`].
/// Event delivery is polled: the dispatch loop calls [`Device::poll_event`]
/// once per iteration, so no two dispatches ever run concurrently.
pub trait Device {
    fn open(&mut self) -> Result<(), DeviceError>;

    fn close(&mut self);

    /// Clear every key back to its blank state.
    fn reset(&mut self) -> Result<(), DeviceError>;

    /// Set panel brightness as a percentage. Values above 100 are clamped
    /// by the adapter.
    fn set_brightness(&mut self, percent: u8) -> Result<(), DeviceError>;

    fn key_count(&self) -> u8;

    fn key_image_format(&self) -> KeyFormat;

    fn set_key_image(&mut self, key: u8, pixels: &[u8]) -> Result<(), DeviceError>;

    /// Poll for the next key event, if any is pending.
    fn poll_event(&mut self) -> Result<Option<KeyEvent>, DeviceError>;
}

use thiserror::Error;

use crate::device::DeviceError;
use crate::dispatch::DeckContext;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A side-effecting operation bound to a key.
///
/// Actions are constructed fully bound at registry build time (capturing any
/// parameters they need) and invoked zero or more times by the dispatcher.
/// They may call back into the panel through the [`DeckContext`] to switch
/// layouts or refresh a single key.
///
/// Failures are reported through the `Result`; the dispatcher logs and
/// suppresses them so one misbehaving action cannot take the panel down.
pub trait Action {
    fn invoke(&self, deck: &mut DeckContext<'_>) -> Result<(), ActionError>;
}

/// Adapter turning a plain closure into an action.
pub struct FnAction<F>(F);

impl<F> FnAction<F>
where
    F: Fn(&mut DeckContext<'_>) -> Result<(), ActionError>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Action for FnAction<F>
where
    F: Fn(&mut DeckContext<'_>) -> Result<(), ActionError>,
{
    fn invoke(&self, deck: &mut DeckContext<'_>) -> Result<(), ActionError> {
        (self.0)(deck)
    }
}

/// Bound layout-switch action.
///
/// Constructing this does not perform the switch; only invocation does.
/// A target name missing from the registry makes the invocation a no-op.
pub struct SwitchLayout {
    target: String,
}

impl SwitchLayout {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Action for SwitchLayout {
    fn invoke(&self, deck: &mut DeckContext<'_>) -> Result<(), ActionError> {
        deck.switch_layout(&self.target)
    }
}

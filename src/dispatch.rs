use std::thread;
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::action::ActionError;
use crate::config::{KeyConfig, Registry};
use crate::controller::Controller;
use crate::device::{DeviceError, KeyEvent};

/// Sleep between polls when the panel has no pending events.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum StartError {
    #[error("initial layout {0:?} is not in the registry")]
    UnknownLayout(String),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Callback surface handed to an action while it runs.
///
/// Lets actions reach back into the panel without owning it: switching the
/// active layout, or repainting a single key (toggle indicators).
pub struct DeckContext<'a> {
    controller: &'a mut Controller,
    registry: &'a Registry,
}

impl DeckContext<'_> {
    pub fn current_layout(&self) -> Option<&str> {
        self.controller.current_layout()
    }

    /// Switch to the named layout. Unknown names are a no-op, same as from
    /// anywhere else.
    pub fn switch_layout(&mut self, name: &str) -> Result<(), ActionError> {
        self.controller
            .switch(self.registry, name)
            .map_err(ActionError::from)
    }

    /// Repaint one key without changing the active layout.
    pub fn refresh_key(&mut self, key: u8, config: &KeyConfig) -> Result<(), ActionError> {
        self.controller
            .refresh_key(key, config)
            .map_err(ActionError::from)
    }
}

/// The assembled panel: controller plus the immutable layout registry,
/// dispatching hardware events to bound actions.
pub struct Deck {
    controller: Controller,
    registry: Registry,
}

impl Deck {
    pub fn new(controller: Controller, registry: Registry) -> Self {
        Self { controller, registry }
    }

    /// Render the initial layout. Unlike a runtime switch, a name missing
    /// from the registry here is a hard error: starting blank is never
    /// intended.
    pub fn start(&mut self, initial: &str) -> Result<(), StartError> {
        if !self.registry.contains(initial) {
            return Err(StartError::UnknownLayout(initial.to_owned()));
        }

        self.controller.switch(&self.registry, initial)?;
        Ok(())
    }

    pub fn current_layout(&self) -> Option<&str> {
        self.controller.current_layout()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Feed one raw hardware event through the filter chain.
    ///
    /// Releases are discarded; so are presses on keys with no config in the
    /// current layout. A failing action is logged and suppressed right here,
    /// so the rest of the panel stays responsive.
    pub fn handle_event(&mut self, event: KeyEvent) {
        if !event.pressed {
            return;
        }

        let Deck { controller, registry } = self;
        let registry: &Registry = registry;

        let Some(layout) = controller
            .current_layout()
            .and_then(|name| registry.get(name))
        else {
            return;
        };

        let Some(config) = layout.key(event.key) else {
            return;
        };
        let Some(action) = config.action.as_ref() else {
            return;
        };

        let mut deck = DeckContext { controller, registry };
        if let Err(err) = action.invoke(&mut deck) {
            warn!("action for key {} failed: {err}", event.key);
        }
    }

    /// Pump hardware events until the device fails.
    ///
    /// This is the single event-delivery context: events are dispatched in
    /// arrival order, one at a time, with no queueing or debouncing. An
    /// action that blocks simply delays the next event.
    pub fn run(&mut self) -> Result<(), DeviceError> {
        loop {
            match self.controller.poll_event()? {
                Some(event) => self.handle_event(event),
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    /// Blank the panel and release the device.
    pub fn shutdown(mut self) {
        self.controller.shutdown();
    }
}

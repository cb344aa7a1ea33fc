//! Driver core for grid-addressable key panels: each key is a small bitmap
//! display that fires press and release events.
//!
//! The crate is the panel's brain, not its transport. A [`Device`]
//! implementation supplies the hardware; deckhand owns per-key bitmap
//! composition ([`Renderer`]), the named layout model ([`Registry`]), the
//! current-layout state machine ([`Controller`]) and the dispatch loop
//! ([`Deck`]) that turns key presses into [`Action`] invocations without
//! letting a misbehaving action take the panel down.

mod action;
mod config;
mod controller;
mod device;
mod dispatch;
mod display;

pub use action::{Action, ActionError, FnAction, SwitchLayout};
pub use config::{KeyConfig, Layout, Registry};
pub use controller::{Controller, OPERATING_BRIGHTNESS};
pub use device::{Device, DeviceError, KeyEvent, KeyFormat};
pub use dispatch::{Deck, DeckContext, StartError};
pub use display::{Renderer, ERROR_COLOR};

/// Color type used for key backgrounds and labels.
pub use embedded_graphics::pixelcolor::Rgb888;

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::config::{KeyConfig, Layout, Registry};
use crate::device::{Device, DeviceError, KeyEvent, KeyFormat};
use crate::display::Renderer;

/// Brightness applied on every full redraw.
pub const OPERATING_BRIGHTNESS: u8 = 100;

/// Owns the panel handle and the name of the layout currently on it.
///
/// `current` is the only mutable cell in the model. It is written once per
/// successful switch, and only ever from the dispatch context; nothing else
/// may call [`Controller::switch`] concurrently.
pub struct Controller {
    device: Box<dyn Device>,
    renderer: Renderer,
    current: Option<String>,
    open: bool,
}

impl Controller {
    /// Open the panel. Fails loudly if the device is unavailable; this is
    /// the only part of the hot path allowed to.
    pub fn open(mut device: Box<dyn Device>, renderer: Renderer) -> Result<Self, DeviceError> {
        device.open()?;

        Ok(Self { device, renderer, current: None, open: true })
    }

    /// Open the panel, retrying within a bounded window before giving up
    /// with the last error. Useful when the service starts before the panel
    /// is plugged in.
    pub fn open_with_retry(
        mut device: Box<dyn Device>,
        renderer: Renderer,
        attempts: u32,
        interval: Duration,
    ) -> Result<Self, DeviceError> {
        let attempts = attempts.max(1);
        let mut last = DeviceError::NotFound;

        for attempt in 1..=attempts {
            match device.open() {
                Ok(()) => {
                    return Ok(Self { device, renderer, current: None, open: true });
                }
                Err(err) => {
                    warn!("panel open attempt {attempt}/{attempts} failed: {err}");
                    last = err;

                    if attempt < attempts {
                        thread::sleep(interval);
                    }
                }
            }
        }

        Err(last)
    }

    /// Name of the layout currently on the panel, or `None` before the
    /// first render.
    pub fn current_layout(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn key_count(&self) -> u8 {
        self.device.key_count()
    }

    pub fn key_image_format(&self) -> KeyFormat {
        self.device.key_image_format()
    }

    /// Transition to the named layout with a full redraw.
    ///
    /// A name missing from the registry makes this a no-op: the current
    /// layout stays up and no device call is issued. That keeps a
    /// misconfigured switch key from blanking the panel; the warning is the
    /// only trace of it.
    pub fn switch(&mut self, registry: &Registry, name: &str) -> Result<(), DeviceError> {
        let Some(layout) = registry.get(name) else {
            warn!("ignoring switch to unknown layout {name:?}");
            return Ok(());
        };

        debug!("switching to layout {name:?}");
        self.current = Some(name.to_owned());
        self.redraw(layout)
    }

    /// Clear the panel and repaint every key present in the layout.
    /// Stale images from the previous layout never survive a transition.
    fn redraw(&mut self, layout: &Layout) -> Result<(), DeviceError> {
        self.device.reset()?;
        self.device.set_brightness(OPERATING_BRIGHTNESS)?;

        let format = self.device.key_image_format();
        for (key, config) in layout.iter() {
            let pixels = self.renderer.render(format, config);
            self.device.set_key_image(key, &pixels)?;
        }

        Ok(())
    }

    /// Repaint a single key without touching the current layout. Used by
    /// stateful toggle actions to flip an indicator.
    pub fn refresh_key(&mut self, key: u8, config: &KeyConfig) -> Result<(), DeviceError> {
        let format = self.device.key_image_format();
        let pixels = self.renderer.render(format, config);
        self.device.set_key_image(key, &pixels)
    }

    pub(crate) fn poll_event(&mut self) -> Result<Option<KeyEvent>, DeviceError> {
        self.device.poll_event()
    }

    /// Idempotent cleanup: blank the panel and release the device. Errors
    /// are logged and ignored, as there is nothing left to do with them.
    pub fn shutdown(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        if let Err(err) = self.device.reset() {
            warn!("panel reset during shutdown failed: {err}");
        }
        self.device.close();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::{Call, MockPanel};

    fn three_key_layout() -> Layout {
        Layout::new()
            .with_key(0, KeyConfig::new().label("one"))
            .with_key(1, KeyConfig::new().label("two"))
            .with_key(5, KeyConfig::new().label("five"))
    }

    #[test]
    fn open_failure_is_loud() {
        let (panel, log) = MockPanel::new();
        log.borrow_mut().fail_open = true;

        let result = Controller::open(Box::new(panel), Renderer::new());
        assert!(matches!(result, Err(DeviceError::NotFound)));
    }

    #[test]
    fn retry_gives_up_with_the_last_error() {
        let (panel, log) = MockPanel::new();
        log.borrow_mut().fail_open = true;

        let result = Controller::open_with_retry(
            Box::new(panel),
            Renderer::new(),
            3,
            Duration::ZERO,
        );
        assert!(matches!(result, Err(DeviceError::NotFound)));
    }

    #[test]
    fn retry_succeeds_on_first_attempt() {
        let (panel, log) = MockPanel::new();

        let controller =
            Controller::open_with_retry(Box::new(panel), Renderer::new(), 3, Duration::ZERO)
                .unwrap();
        assert!(controller.current_layout().is_none());
        assert_eq!(log.borrow().calls, vec![Call::Open]);
    }

    #[test]
    fn switch_to_unknown_layout_is_a_noop() {
        let (panel, log) = MockPanel::new();
        let registry = Registry::new().with_layout("main", three_key_layout());
        let mut controller = Controller::open(Box::new(panel), Renderer::new()).unwrap();

        controller.switch(&registry, "nonexistent").unwrap();

        assert!(controller.current_layout().is_none());
        assert_eq!(log.borrow().calls, vec![Call::Open]);
    }

    #[test]
    fn switch_performs_a_full_redraw() {
        let (panel, log) = MockPanel::new();
        let registry = Registry::new().with_layout("main", three_key_layout());
        let mut controller = Controller::open(Box::new(panel), Renderer::new()).unwrap();

        controller.switch(&registry, "main").unwrap();

        assert_eq!(controller.current_layout(), Some("main"));
        assert_eq!(
            log.borrow().calls,
            vec![
                Call::Open,
                Call::Reset,
                Call::Brightness(OPERATING_BRIGHTNESS),
                Call::KeyImage(0),
                Call::KeyImage(1),
                Call::KeyImage(5),
            ]
        );
    }

    #[test]
    fn failed_switch_leaves_previous_layout_active() {
        let (panel, _log) = MockPanel::new();
        let registry = Registry::new().with_layout("main", three_key_layout());
        let mut controller = Controller::open(Box::new(panel), Renderer::new()).unwrap();

        controller.switch(&registry, "main").unwrap();
        controller.switch(&registry, "missing").unwrap();

        assert_eq!(controller.current_layout(), Some("main"));
    }

    #[test]
    fn refresh_key_pushes_exactly_one_image() {
        let (panel, log) = MockPanel::new();
        let mut controller = Controller::open(Box::new(panel), Renderer::new()).unwrap();

        controller
            .refresh_key(7, &KeyConfig::new().label("mic"))
            .unwrap();

        assert!(controller.current_layout().is_none());
        assert_eq!(log.borrow().calls, vec![Call::Open, Call::KeyImage(7)]);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (panel, log) = MockPanel::new();
        let mut controller = Controller::open(Box::new(panel), Renderer::new()).unwrap();

        controller.shutdown();
        controller.shutdown();
        drop(controller);

        assert_eq!(
            log.borrow().calls,
            vec![Call::Open, Call::Reset, Call::Close]
        );
    }
}

//! Installing the unwinder once the debugger is ready for it.
//!
//! The classifier usually needs the VM's symbols, which only exist once the
//! target is loaded, while the unwinder wants to be set up from a startup
//! script. So installation is lazy: every attempt queries the classifier with
//! `(0, 0)` first and gives up quietly if that fails.

#[cfg(test)]
mod tests;

use alloc::{boxed::Box, rc::Rc};

use crate::classify::FrameClassifier;
use crate::config::Config;
use crate::host::Debugger;
use crate::unwinder::JitUnwinder;

/// `Uninitialized` to `Installed` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallState {
    #[default]
    Uninitialized,
    Installed,
}

#[derive(Debug)]
pub struct Installer<C> {
    classifier: Rc<C>,
    config: Config,
    state: InstallState,
}

impl<C: FrameClassifier + 'static> Installer<C> {
    pub fn new(classifier: Rc<C>, config: Config) -> Self {
        Self {
            classifier,
            config,
            state: InstallState::Uninitialized,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn is_installed(&self) -> bool {
        self.state == InstallState::Installed
    }

    /// Register the unwinder with `debugger` unless that already happened.
    /// Returns whether it is installed afterwards.
    #[instrument(level = "debug", skip_all, fields(name = %self.config.unwinder_name))]
    pub fn ensure_installed(&mut self, debugger: &mut dyn Debugger) -> bool {
        if self.is_installed() {
            return true;
        }

        if let Err(err) = self.classifier.is_jitted(0, 0) {
            debug!(%err, "classifier not ready, not installing yet");
            return false;
        }

        let unwinder = JitUnwinder::new(
            &*debugger,
            self.classifier.clone(),
            self.config.unwinder_name.clone(),
        );
        if let Err(err) = debugger.register_unwinder(Box::new(unwinder)) {
            warn!(%err, "debugger refused the unwinder");
            return false;
        }

        info!("installed JIT unwinder");
        self.state = InstallState::Installed;
        true
    }
}

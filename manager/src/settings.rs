//! Runtime settings consulted on every evaluation.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use trustgate_types::ForegroundHint;

/// Host-application state the evaluator needs per call.
pub trait Settings: Send + Sync {
    /// `None` means non-interactive: unknown certificates are rejected
    /// without asking anyone.
    fn foreground_hint(&self) -> Option<ForegroundHint>;

    fn trust_system_roots(&self) -> bool;
}

const NON_INTERACTIVE: u8 = 0;
const BACKGROUND: u8 = 1;
const FOREGROUND: u8 = 2;

/// Settings the host application updates as its state changes.
#[derive(Debug)]
pub struct AppSettings {
    hint: AtomicU8,
    trust_system_roots: AtomicBool,
}

impl AppSettings {
    pub fn new(hint: Option<ForegroundHint>, trust_system_roots: bool) -> Self {
        Self {
            hint: AtomicU8::new(encode(hint)),
            trust_system_roots: AtomicBool::new(trust_system_roots),
        }
    }

    pub fn set_foreground_hint(&self, hint: Option<ForegroundHint>) {
        self.hint.store(encode(hint), Ordering::Relaxed);
    }

    pub fn set_in_foreground(&self, in_foreground: bool) {
        self.set_foreground_hint(Some(ForegroundHint::from_foreground(in_foreground)));
    }

    pub fn set_trust_system_roots(&self, trust: bool) {
        self.trust_system_roots.store(trust, Ordering::Relaxed);
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::new(Some(ForegroundHint::Foreground), true)
    }
}

impl Settings for AppSettings {
    fn foreground_hint(&self) -> Option<ForegroundHint> {
        match self.hint.load(Ordering::Relaxed) {
            FOREGROUND => Some(ForegroundHint::Foreground),
            BACKGROUND => Some(ForegroundHint::Background),
            _ => None,
        }
    }

    fn trust_system_roots(&self) -> bool {
        self.trust_system_roots.load(Ordering::Relaxed)
    }
}

fn encode(hint: Option<ForegroundHint>) -> u8 {
    match hint {
        None => NON_INTERACTIVE,
        Some(ForegroundHint::Background) => BACKGROUND,
        Some(ForegroundHint::Foreground) => FOREGROUND,
    }
}

// src/engine/integrity.rs

use serde::{Deserialize, Serialize};

use crate::models::submission::IntegrityTelemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
}

/// Host-level events forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegritySignal {
    VisibilityChange {
        hidden: bool,
    },
    Clipboard {
        action: ClipboardAction,
    },
    ContextMenu,
    KeyCombination {
        key: String,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        meta: bool,
    },
    FullscreenChange {
        active: bool,
    },
}

/// Whether the host should let the underlying action through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Suppress,
}

enum KeyClass {
    Clipboard,
    Blocked,
    Harmless,
}

fn classify_key(key: &str, ctrl: bool, shift: bool) -> KeyClass {
    let key = key.to_ascii_lowercase();
    match key.as_str() {
        "f12" | "printscreen" => return KeyClass::Blocked,
        _ => {}
    }
    if !ctrl {
        return KeyClass::Harmless;
    }
    // Ctrl+Shift+C opens the inspector, not the clipboard.
    if shift && matches!(key.as_str(), "i" | "j" | "c") {
        return KeyClass::Blocked;
    }
    match key.as_str() {
        "c" | "x" | "v" => KeyClass::Clipboard,
        "u" | "s" | "p" => KeyClass::Blocked,
        _ => KeyClass::Harmless,
    }
}

/// Counts integrity signals while active. Never blocks the session itself.
#[derive(Debug, Clone, Default)]
pub struct IntegrityMonitor {
    active: bool,
    telemetry: IntegrityTelemetry,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_fullscreen(&self) -> bool {
        self.telemetry.is_fullscreen
    }

    pub fn snapshot(&self) -> IntegrityTelemetry {
        self.telemetry
    }

    /// Records `signal` and tells the host whether to let it through.
    /// Signals observed while stopped are ignored and allowed.
    pub fn observe(&mut self, signal: &IntegritySignal) -> Verdict {
        if !self.active {
            return Verdict::Allow;
        }
        let t = &mut self.telemetry;
        match signal {
            IntegritySignal::VisibilityChange { hidden } => {
                if *hidden {
                    t.visibility_losses += 1;
                    tracing::debug!(count = t.visibility_losses, "visibility lost");
                }
                Verdict::Allow
            }
            IntegritySignal::Clipboard { action } => {
                t.clipboard_attempts += 1;
                tracing::debug!(?action, count = t.clipboard_attempts, "clipboard blocked");
                Verdict::Suppress
            }
            IntegritySignal::ContextMenu => {
                t.context_menu_attempts += 1;
                Verdict::Suppress
            }
            IntegritySignal::KeyCombination {
                key,
                ctrl,
                shift,
                meta,
                ..
            } => match classify_key(key, *ctrl || *meta, *shift) {
                KeyClass::Clipboard => {
                    t.clipboard_attempts += 1;
                    Verdict::Suppress
                }
                KeyClass::Blocked => {
                    t.blocked_shortcuts += 1;
                    Verdict::Suppress
                }
                KeyClass::Harmless => Verdict::Allow,
            },
            IntegritySignal::FullscreenChange { active } => {
                if t.is_fullscreen && !*active {
                    t.fullscreen_exits += 1;
                    tracing::debug!(count = t.fullscreen_exits, "fullscreen exited");
                }
                t.is_fullscreen = *active;
                Verdict::Allow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str, ctrl: bool, shift: bool) -> IntegritySignal {
        IntegritySignal::KeyCombination {
            key: k.into(),
            ctrl,
            shift,
            alt: false,
            meta: false,
        }
    }

    #[test]
    fn test_inactive_monitor_counts_nothing() {
        let mut m = IntegrityMonitor::new();
        assert_eq!(m.observe(&IntegritySignal::ContextMenu), Verdict::Allow);
        assert_eq!(m.snapshot(), IntegrityTelemetry::default());
    }

    #[test]
    fn test_context_menu_then_fullscreen_exit() {
        let mut m = IntegrityMonitor::new();
        m.start();
        m.observe(&IntegritySignal::FullscreenChange { active: true });
        for _ in 0..3 {
            assert_eq!(m.observe(&IntegritySignal::ContextMenu), Verdict::Suppress);
        }
        m.observe(&IntegritySignal::FullscreenChange { active: false });

        let t = m.snapshot();
        assert_eq!(t.context_menu_attempts, 3);
        assert_eq!(t.fullscreen_exits, 1);
        assert_eq!(t.visibility_losses, 0);
        assert_eq!(t.clipboard_attempts, 0);
        assert_eq!(t.blocked_shortcuts, 0);
        assert_eq!(t.total_events(), 4);
        assert!(!t.is_fullscreen);
    }

    #[test]
    fn test_exit_without_prior_fullscreen_is_not_counted() {
        let mut m = IntegrityMonitor::new();
        m.start();
        m.observe(&IntegritySignal::FullscreenChange { active: false });
        assert_eq!(m.snapshot().fullscreen_exits, 0);
    }

    #[test]
    fn test_visibility_is_counted_but_allowed() {
        let mut m = IntegrityMonitor::new();
        m.start();
        assert_eq!(
            m.observe(&IntegritySignal::VisibilityChange { hidden: true }),
            Verdict::Allow
        );
        m.observe(&IntegritySignal::VisibilityChange { hidden: false });
        assert_eq!(m.snapshot().visibility_losses, 1);
    }

    #[test]
    fn test_key_combinations() {
        let mut m = IntegrityMonitor::new();
        m.start();
        assert_eq!(m.observe(&key("v", true, false)), Verdict::Suppress);
        assert_eq!(m.observe(&key("C", true, true)), Verdict::Suppress);
        assert_eq!(m.observe(&key("F12", false, false)), Verdict::Suppress);
        assert_eq!(m.observe(&key("a", false, false)), Verdict::Allow);
        assert_eq!(m.observe(&key("a", true, false)), Verdict::Allow);

        let t = m.snapshot();
        assert_eq!(t.clipboard_attempts, 1);
        assert_eq!(t.blocked_shortcuts, 2);
        assert_eq!(t.total_events(), 3);
    }

    #[test]
    fn test_counters_survive_stop() {
        let mut m = IntegrityMonitor::new();
        m.start();
        m.observe(&IntegritySignal::Clipboard {
            action: ClipboardAction::Paste,
        });
        m.stop();
        m.observe(&IntegritySignal::Clipboard {
            action: ClipboardAction::Copy,
        });
        assert_eq!(m.snapshot().clipboard_attempts, 1);
    }

    #[test]
    fn test_signal_wire_format() {
        let s: IntegritySignal =
            serde_json::from_value(serde_json::json!({"kind": "clipboard", "action": "cut"}))
                .unwrap();
        assert_eq!(
            s,
            IntegritySignal::Clipboard {
                action: ClipboardAction::Cut
            }
        );
    }
}

//! Key events → editor key notation.
//!
//! ```text
//! crossterm::KeyEvent ──► key_to_notation() ──► "<C-x>" ──► BridgeHandle::send_input
//! ```
//!
//! Plain characters pass through as-is (except `<`, which is spelled
//! `<lt>`). Named keys and modified characters use the bracketed form with
//! `C-` / `M-` / `S-` prefixes, in that order.

// Rust guideline compliant 2026-02

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Convert a key event to editor key notation.
///
/// Returns `None` for key releases and keys the editor has no name for
/// (media keys, bare modifier presses, ...).
#[must_use]
pub fn key_to_notation(key: &KeyEvent) -> Option<String> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    let name = match key.code {
        // Shift is already folded into the character.
        KeyCode::Char('<') => return Some(bracket(ctrl, alt, false, "lt")),
        KeyCode::Char(c) if !ctrl && !alt => return Some(c.to_string()),
        KeyCode::Char(' ') => return Some(bracket(ctrl, alt, false, "Space")),
        KeyCode::Char(c) => return Some(bracket(ctrl, alt, false, &c.to_string())),
        KeyCode::BackTab => return Some(bracket(ctrl, alt, true, "Tab")),
        KeyCode::Enter => "CR",
        KeyCode::Esc => "Esc",
        KeyCode::Backspace => "BS",
        KeyCode::Tab => "Tab",
        KeyCode::Up => "Up",
        KeyCode::Down => "Down",
        KeyCode::Left => "Left",
        KeyCode::Right => "Right",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Delete => "Del",
        KeyCode::Insert => "Insert",
        KeyCode::F(n @ 1..=12) => return Some(bracket(ctrl, alt, shift, &format!("F{n}"))),
        _ => return None,
    };
    Some(bracket(ctrl, alt, shift, name))
}

fn bracket(ctrl: bool, alt: bool, shift: bool, name: &str) -> String {
    let mut out = String::from("<");
    if ctrl {
        out.push_str("C-");
    }
    if alt {
        out.push_str("M-");
    }
    if shift {
        out.push_str("S-");
    }
    out.push_str(name);
    out.push('>');
    out
}

//! Tagged redraw events.
//!
//! Each update kind the terminal surface understands is one variant of
//! [`RedrawEvent`]. Decoding an update name outside this set fails with
//! [`BridgeError::UnsupportedUpdate`]: an unknown kind means the editor and
//! the UI disagree on the protocol, and silently skipping it would leave the
//! screen wrong.

// Rust guideline compliant 2026-02

use serde::Deserialize;
use serde_json::Value;

use crate::error::BridgeError;

/// Text attributes set by `highlight_set`.
///
/// Missing keys mean "off" / "default colour".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Highlight {
    /// Foreground colour, `0xRRGGBB`.
    pub foreground: Option<u32>,
    /// Background colour, `0xRRGGBB`.
    pub background: Option<u32>,
    /// Underline/undercurl colour, `0xRRGGBB`.
    pub special: Option<u32>,
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
    /// Underlined text.
    pub underline: bool,
    /// Curly underline (rendered as underline).
    pub undercurl: bool,
    /// Swap foreground and background.
    pub reverse: bool,
}

/// One decoded update with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum RedrawEvent {
    /// Grid was resized.
    Resize {
        /// New width.
        columns: u16,
        /// New height.
        rows: u16,
    },
    /// Clear the whole grid.
    Clear,
    /// Clear from the cursor to the end of the line.
    EolClear,
    /// Move the cursor.
    CursorGoto {
        /// Zero-based row.
        row: u16,
        /// Zero-based column.
        col: u16,
    },
    /// Write text at the cursor, advancing it.
    Put {
        /// Text for one cell (may be empty for wide-char continuations).
        text: String,
    },
    /// Attributes for subsequent `put`s.
    HighlightSet(Highlight),
    /// Region affected by subsequent `scroll`s.
    SetScrollRegion {
        /// First row (inclusive).
        top: u16,
        /// Last row (inclusive).
        bottom: u16,
        /// First column (inclusive).
        left: u16,
        /// Last column (inclusive).
        right: u16,
    },
    /// Scroll the region; positive moves text up.
    Scroll {
        /// Lines to scroll.
        count: i64,
    },
    /// Default foreground (`None` = terminal default).
    UpdateFg(Option<u32>),
    /// Default background (`None` = terminal default).
    UpdateBg(Option<u32>),
    /// Default special colour (`None` = terminal default).
    UpdateSp(Option<u32>),
    /// Editor mode changed (e.g. `insert`, `normal`).
    ModeChange {
        /// Mode name.
        mode: String,
    },
    /// Editor is busy: hide the cursor.
    BusyStart,
    /// Editor is idle again.
    BusyStop,
    /// Mouse support enabled.
    MouseOn,
    /// Mouse support disabled.
    MouseOff,
    /// Audible bell.
    Bell,
    /// Visual bell.
    VisualBell,
    /// Window title.
    SetTitle(String),
    /// Window icon title.
    SetIcon(String),
    /// End of a logical screen update.
    Flush,
    /// Informational updates with no effect on a terminal grid
    /// (`mode_info_set`, `option_set`, `default_colors_set`).
    Informational,
}

impl RedrawEvent {
    /// Decode one argument tuple of update `name`.
    pub fn decode(name: &str, args: &[Value]) -> Result<Self, BridgeError> {
        let args = Args { name, args };
        let event = match name {
            "resize" => Self::Resize {
                columns: args.u16(0)?,
                rows: args.u16(1)?,
            },
            "clear" => Self::Clear,
            "eol_clear" => Self::EolClear,
            "cursor_goto" => Self::CursorGoto {
                row: args.u16(0)?,
                col: args.u16(1)?,
            },
            "put" => Self::Put {
                text: args.string(0)?,
            },
            "highlight_set" => Self::HighlightSet(args.highlight(0)?),
            "set_scroll_region" => Self::SetScrollRegion {
                top: args.u16(0)?,
                bottom: args.u16(1)?,
                left: args.u16(2)?,
                right: args.u16(3)?,
            },
            "scroll" => Self::Scroll {
                count: args.i64(0)?,
            },
            "update_fg" => Self::UpdateFg(args.color(0)?),
            "update_bg" => Self::UpdateBg(args.color(0)?),
            "update_sp" => Self::UpdateSp(args.color(0)?),
            "mode_change" => Self::ModeChange {
                mode: args.string(0)?,
            },
            "busy_start" => Self::BusyStart,
            "busy_stop" => Self::BusyStop,
            "mouse_on" => Self::MouseOn,
            "mouse_off" => Self::MouseOff,
            "bell" => Self::Bell,
            "visual_bell" => Self::VisualBell,
            "set_title" => Self::SetTitle(args.string(0)?),
            "set_icon" => Self::SetIcon(args.string(0)?),
            "flush" => Self::Flush,
            "mode_info_set" | "option_set" | "default_colors_set" => Self::Informational,
            _ => {
                return Err(BridgeError::UnsupportedUpdate {
                    name: name.to_string(),
                })
            }
        };
        Ok(event)
    }
}

/// Positional argument accessors with uniform error messages.
struct Args<'a> {
    name: &'a str,
    args: &'a [Value],
}

impl Args<'_> {
    fn get(&self, index: usize) -> Result<&Value, BridgeError> {
        self.args.get(index).ok_or_else(|| {
            BridgeError::MalformedUpdate(format!("'{}' is missing argument {index}", self.name))
        })
    }

    fn invalid(&self, index: usize, expected: &str) -> BridgeError {
        BridgeError::MalformedUpdate(format!(
            "'{}' argument {index} is not {expected}",
            self.name
        ))
    }

    fn i64(&self, index: usize) -> Result<i64, BridgeError> {
        self.get(index)?
            .as_i64()
            .ok_or_else(|| self.invalid(index, "an integer"))
    }

    fn u16(&self, index: usize) -> Result<u16, BridgeError> {
        let value = self.i64(index)?;
        u16::try_from(value).map_err(|e| {
            BridgeError::MalformedUpdate(format!(
                "'{}' argument {index} out of range ({value}): {e}",
                self.name
            ))
        })
    }

    fn string(&self, index: usize) -> Result<String, BridgeError> {
        self.get(index)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(index, "a string"))
    }

    /// Colours are `0xRRGGBB`; negative means "use the default".
    fn color(&self, index: usize) -> Result<Option<u32>, BridgeError> {
        let value = self.i64(index)?;
        Ok(u32::try_from(value).ok())
    }

    fn highlight(&self, index: usize) -> Result<Highlight, BridgeError> {
        Highlight::deserialize(self.get(index)?)
            .map_err(|e| BridgeError::MalformedUpdate(format!("'{}' attributes: {e}", self.name)))
    }
}

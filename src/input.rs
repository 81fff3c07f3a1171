//! Keyboard shortcuts and the link field's edit menu

use iced::keyboard::key::Named;
use iced::keyboard::{Key, Modifiers};

/// Action bound to a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Ctrl+D
    Download,
    /// Ctrl+P
    Print,
    /// Escape
    CloseMenu,
    /// Ctrl+Q
    Quit,
    None,
}

/// Maps key presses to actions
#[derive(Debug, Default)]
pub struct ShortcutHandler;

impl ShortcutHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_key(&self, key: &Key, modifiers: Modifiers) -> ShortcutAction {
        match key.as_ref() {
            Key::Named(Named::Escape) => ShortcutAction::CloseMenu,
            Key::Character(c) if modifiers.command() => match c {
                "d" | "D" => ShortcutAction::Download,
                "p" | "P" => ShortcutAction::Print,
                "q" | "Q" => ShortcutAction::Quit,
                _ => ShortcutAction::None,
            },
            _ => ShortcutAction::None,
        }
    }
}

/// Entries of the right-click menu on the link field.
///
/// The text field does not expose its selection, so each action applies to
/// the whole link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Cut,
    Copy,
    Paste,
    Clear,
}

impl EditAction {
    pub const ALL: [EditAction; 4] = [
        EditAction::Cut,
        EditAction::Copy,
        EditAction::Paste,
        EditAction::Clear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EditAction::Cut => "Cut",
            EditAction::Copy => "Copy",
            EditAction::Paste => "Paste",
            EditAction::Clear => "Clear",
        }
    }
}

/// System text clipboard
pub trait TextClipboard {
    fn get_text(&mut self) -> Result<String, arboard::Error>;
    fn set_text(&mut self, text: &str) -> Result<(), arboard::Error>;
}

impl TextClipboard for arboard::Clipboard {
    fn get_text(&mut self) -> Result<String, arboard::Error> {
        arboard::Clipboard::get_text(self)
    }

    fn set_text(&mut self, text: &str) -> Result<(), arboard::Error> {
        arboard::Clipboard::set_text(self, text)
    }
}

/// Apply an edit action to the link text
pub fn apply_edit(
    action: EditAction,
    link: &mut String,
    clipboard: &mut dyn TextClipboard,
) -> Result<(), arboard::Error> {
    match action {
        EditAction::Cut => {
            clipboard.set_text(link)?;
            link.clear();
        }
        EditAction::Copy => clipboard.set_text(link)?,
        EditAction::Paste => {
            let text = clipboard.get_text()?;
            link.push_str(text.trim());
        }
        EditAction::Clear => link.clear(),
    }
    Ok(())
}

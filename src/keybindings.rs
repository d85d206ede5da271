//! Keyboard shortcuts for the annotation canvas.
//!
//! Tool and label hotkeys are configurable and persisted with the config;
//! the editing shortcuts (undo, redo, delete, close, cancel) are fixed.

use serde::{Deserialize, Serialize};

use crate::message::{Key, KeyEvent};
use crate::model::Tool;

/// Maximum number of labels that can have hotkeys (1..9, 0).
pub const MAX_LABEL_HOTKEYS: usize = 10;

/// What a key press asks the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    SelectTool(Tool),
    /// Make the label at this directory index active.
    SelectLabel(usize),
    Undo,
    Redo,
    DeleteSelection,
    ClosePolygon,
    Cancel,
    SelectAll,
}

/// Keybinding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub tool_select: char,
    pub tool_box: char,
    pub tool_polygon: char,
    pub tool_pan: char,
    /// Hotkeys for label selection; index 0 is the first label.
    pub label_hotkeys: [Option<char>; MAX_LABEL_HOTKEYS],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            tool_select: 'v',
            tool_box: 'b',
            tool_polygon: 'p',
            tool_pan: 'h',
            label_hotkeys: [
                Some('1'),
                Some('2'),
                Some('3'),
                Some('4'),
                Some('5'),
                Some('6'),
                Some('7'),
                Some('8'),
                Some('9'),
                Some('0'),
            ],
        }
    }
}

fn same_key(a: char, b: char) -> bool {
    a.eq_ignore_ascii_case(&b)
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tool bound to `key`, if any.
    pub fn tool_for_key(&self, key: char) -> Option<Tool> {
        Tool::all()
            .iter()
            .copied()
            .find(|tool| same_key(self.key_for_tool(*tool), key))
    }

    /// Label index (0-based) bound to `key`, if any.
    pub fn label_index_for_key(&self, key: char) -> Option<usize> {
        self.label_hotkeys
            .iter()
            .position(|hotkey| hotkey.is_some_and(|k| same_key(k, key)))
    }

    pub fn key_for_tool(&self, tool: Tool) -> char {
        match tool {
            Tool::Select => self.tool_select,
            Tool::Box => self.tool_box,
            Tool::Polygon => self.tool_polygon,
            Tool::Pan => self.tool_pan,
        }
    }

    pub fn set_tool_key(&mut self, tool: Tool, key: char) {
        match tool {
            Tool::Select => self.tool_select = key,
            Tool::Box => self.tool_box = key,
            Tool::Polygon => self.tool_polygon = key,
            Tool::Pan => self.tool_pan = key,
        }
    }

    pub fn set_label_key(&mut self, index: usize, key: Option<char>) {
        if index < MAX_LABEL_HOTKEYS {
            self.label_hotkeys[index] = key;
        }
    }

    /// Describe what `key` is already bound to, ignoring `exclude_tool`.
    pub fn key_conflict(&self, key: char, exclude_tool: Option<Tool>) -> Option<String> {
        for tool in Tool::all() {
            if exclude_tool != Some(*tool) && same_key(self.key_for_tool(*tool), key) {
                return Some(format!("{} tool", tool.name()));
            }
        }
        self.label_index_for_key(key)
            .map(|i| format!("Label {}", i + 1))
    }

    /// Resolve a key press to an editor action.
    ///
    /// Ctrl chords are checked first so Ctrl+Z never falls through to a
    /// tool hotkey bound to `z`.
    pub fn action_for(&self, event: &KeyEvent) -> Option<KeyAction> {
        let mods = event.modifiers;
        match event.key {
            Key::Delete | Key::Backspace => Some(KeyAction::DeleteSelection),
            Key::Escape => Some(KeyAction::Cancel),
            Key::Enter => Some(KeyAction::ClosePolygon),
            Key::Char(c) if mods.ctrl => match c.to_ascii_lowercase() {
                'z' if mods.shift => Some(KeyAction::Redo),
                'z' => Some(KeyAction::Undo),
                'y' => Some(KeyAction::Redo),
                'a' => Some(KeyAction::SelectAll),
                _ => None,
            },
            Key::Char(c) => self
                .tool_for_key(c)
                .map(KeyAction::SelectTool)
                .or_else(|| self.label_index_for_key(c).map(KeyAction::SelectLabel)),
        }
    }
}

//! Discrete engine commands and keyboard dispatch.
//!
//! Buttons and keyboard shortcuts funnel into the same [`Command`] values,
//! which are a thin façade over the engine operations the pointer lifecycle
//! already uses. The keyboard path carries a typing guard: while the user is
//! typing into an unrelated text field, key commands are rejected so the
//! engine is never invoked by accident.

use crate::engine::AnnotationEngine;

/// Keys the engine can bind, independent of the host's event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Escape,
    Enter,
    Delete,
    Space,
}

/// Modifier state accompanying a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
    };
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
    };
}

/// A discrete user command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Undo the last committed action
    Undo,
    /// Redo the last undone action
    Redo,
    /// Flush the autosave channel immediately
    SaveNow,
    /// Discard the in-progress drawing or move
    Cancel,
    /// Arm drawing for a field type
    StartAnnotation {
        field_type_id: String,
        sub_type: Option<String>,
    },
    /// Arm drawing for the field type at a step index
    StartStep(usize),
    /// Remove a stored annotation
    RemoveAnnotation {
        field_type_id: String,
        index: Option<usize>,
    },
}

/// Maximum number of steps that can have digit hotkeys (1-9, 0).
pub const MAX_STEP_HOTKEYS: usize = 10;

/// Keyboard shortcut configuration.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    /// Undo (with Ctrl; Ctrl+Shift redoes)
    pub undo: Key,
    /// Redo (with Ctrl)
    pub redo: Key,
    /// Save now (with Ctrl)
    pub save: Key,
    /// Cancel the in-progress interaction
    pub cancel: Key,
    /// Hotkeys arming the field step at each index
    /// (None means no hotkey assigned for that slot)
    pub step_hotkeys: [Option<Key>; MAX_STEP_HOTKEYS],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            undo: Key::Z,
            redo: Key::Y,
            save: Key::S,
            cancel: Key::Escape,
            step_hotkeys: [
                Some(Key::Key1),
                Some(Key::Key2),
                Some(Key::Key3),
                Some(Key::Key4),
                Some(Key::Key5),
                Some(Key::Key6),
                Some(Key::Key7),
                Some(Key::Key8),
                Some(Key::Key9),
                Some(Key::Key0),
            ],
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a key press to a command.
    ///
    /// `typing` is whether a text input currently has focus; every key
    /// command is rejected while typing.
    pub fn command_for_key(
        &self,
        key: Key,
        modifiers: Modifiers,
        typing: bool,
    ) -> Option<Command> {
        if typing {
            log::trace!("Key {key:?} ignored while typing");
            return None;
        }

        if modifiers.ctrl {
            if key == self.undo {
                return Some(if modifiers.shift {
                    Command::Redo
                } else {
                    Command::Undo
                });
            }
            if key == self.redo && !modifiers.shift {
                return Some(Command::Redo);
            }
            if key == self.save && !modifiers.shift {
                return Some(Command::SaveNow);
            }
            return None;
        }

        if key == self.cancel {
            return Some(Command::Cancel);
        }

        self.step_index_for_key(key).map(Command::StartStep)
    }

    /// Step index (0-based) a digit hotkey selects, if any.
    pub fn step_index_for_key(&self, key: Key) -> Option<usize> {
        self.step_hotkeys
            .iter()
            .enumerate()
            .find(|(_, hotkey)| **hotkey == Some(key))
            .map(|(index, _)| index)
    }
}

/// Apply a command to the engine. Returns true if it changed anything.
pub fn dispatch(engine: &mut AnnotationEngine, command: Command) -> bool {
    match command {
        Command::Undo => engine.undo(),
        Command::Redo => engine.redo(),
        Command::SaveNow => engine.save_now(),
        Command::Cancel => {
            engine.cancel();
            true
        }
        Command::StartAnnotation {
            field_type_id,
            sub_type,
        } => match engine.start_annotation(&field_type_id, sub_type.as_deref()) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("StartAnnotation rejected: {err}");
                false
            }
        },
        Command::StartStep(index) => {
            let Some(field_type_id) = engine.registry().at(index).map(|s| s.id.clone()) else {
                log::warn!("No field step at index {index}");
                return false;
            };
            match engine.start_annotation(&field_type_id, None) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("StartStep rejected: {err}");
                    false
                }
            }
        }
        Command::RemoveAnnotation {
            field_type_id,
            index,
        } => engine.remove_annotation(&field_type_id, index).is_some(),
    }
}

//! Global navigation and selection-id conventions.
//!
//! Some selections mean the same thing in every flow and step ("menu",
//! "back", "retry"); the router intercepts them before any step logic runs.
//! Entity-bearing selections use `<prefix>_<numeric id>` ids.

use super::event::IncomingEvent;

/// Selection id that returns to the main menu.
pub const MENU_ID: &str = "menu";
/// Selection id that abandons the current flow (same effect as menu).
pub const CANCEL_ID: &str = "cancel";
/// Selection id that steps back within the current flow.
pub const BACK_ID: &str = "back";
/// Selection id offered after a failed action; re-shows the current step.
pub const RETRY_ID: &str = "retry";

/// Words a user may type instead of pressing the menu button.
const MENU_WORDS: &[&str] = &["menu", "main menu", "cancel", "stop", "exit"];

/// Navigation commands available from any step of any flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCommand {
    /// Abandon the flow and show the main menu.
    Menu,
    /// Go to the flow's previous step, or restart it.
    Back,
    /// Re-issue the current step's prompt.
    Retry,
}

impl NavigationCommand {
    /// Detects a navigation command in an event.
    ///
    /// Selections match on id; typed text matches only the menu words and
    /// "back", so free-text answers rarely collide.
    pub fn detect(event: &IncomingEvent) -> Option<Self> {
        if let Some(id) = event.selection_id() {
            return match id.to_ascii_lowercase().as_str() {
                MENU_ID | CANCEL_ID | "main_menu" => Some(NavigationCommand::Menu),
                BACK_ID => Some(NavigationCommand::Back),
                RETRY_ID => Some(NavigationCommand::Retry),
                _ => None,
            };
        }

        let text = event.text_content()?.to_ascii_lowercase();
        if MENU_WORDS.contains(&text.as_str()) {
            Some(NavigationCommand::Menu)
        } else if text == BACK_ID {
            Some(NavigationCommand::Back)
        } else {
            None
        }
    }
}

/// Builds a selection id carrying an entity id, e.g. `agreement_42`.
pub fn entity_selection_id(prefix: &str, id: i64) -> String {
    format!("{}_{}", prefix, id)
}

/// Recovers the entity id from a `<prefix>_<id>` selection.
///
/// Returns `None` when the prefix does not match or the suffix is missing,
/// non-numeric or not positive.
pub fn parse_entity_selection(selection_id: &str, prefix: &str) -> Option<i64> {
    let suffix = selection_id.strip_prefix(prefix)?.strip_prefix('_')?;
    match suffix.parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => None,
    }
}

/// Returns true if the selection uses `prefix`, regardless of its suffix.
pub fn has_selection_prefix(selection_id: &str, prefix: &str) -> bool {
    selection_id
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

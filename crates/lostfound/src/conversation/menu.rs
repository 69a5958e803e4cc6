//! Main menu and inline choices.

use crate::error::Result;
use crate::model::ItemKind;
use crate::transport::{Button, ChatTarget, ChatTransport, Keyboard};

/// Prompt sent with the main menu.
pub const MENU_PROMPT: &str = "Choose an option:";

/// Menu label starting a lost report.
pub const REPORT_LOST: &str = "Report Lost Item";

/// Menu label starting a found report.
pub const REPORT_FOUND: &str = "Report Found Item";

/// Menu label listing stored reports.
pub const BROWSE_ITEMS: &str = "Browse Items";

/// Button data for "the item is an ID".
pub const ITEM_TYPE_YES: &str = "item_type_yes";

/// Button data for "the item is not an ID".
pub const ITEM_TYPE_NO: &str = "item_type_no";

/// An option picked from the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Start a report of the given kind.
    Report(ItemKind),
    /// List stored reports.
    Browse,
}

impl MenuChoice {
    /// Match a text message against the menu labels.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            REPORT_LOST => Some(Self::Report(ItemKind::Lost)),
            REPORT_FOUND => Some(Self::Report(ItemKind::Found)),
            BROWSE_ITEMS => Some(Self::Browse),
            _ => None,
        }
    }
}

/// Reply keyboard of the main menu.
#[must_use]
pub fn main_menu_keyboard(show_browse: bool) -> Keyboard {
    let mut rows = vec![vec![REPORT_LOST.to_string()], vec![REPORT_FOUND.to_string()]];
    if show_browse {
        rows.push(vec![BROWSE_ITEMS.to_string()]);
    }
    Keyboard::Reply(rows)
}

/// Inline Yes/No choice asking whether the item is an ID.
#[must_use]
pub fn item_kind_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("Yes", ITEM_TYPE_YES)],
        vec![Button::new("No", ITEM_TYPE_NO)],
    ])
}

/// Send the main menu to `chat`.
///
/// # Errors
///
/// Returns an error if the transport fails.
pub async fn show_main_menu(
    transport: &dyn ChatTransport,
    chat: &ChatTarget,
    show_browse: bool,
) -> Result<()> {
    transport
        .send_text(chat, MENU_PROMPT, Some(&main_menu_keyboard(show_browse)))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::recording::{RecordingTransport, Sent};

    #[test]
    fn test_parse_choices() {
        assert_eq!(
            MenuChoice::parse("Report Lost Item"),
            Some(MenuChoice::Report(ItemKind::Lost))
        );
        assert_eq!(
            MenuChoice::parse("Report Found Item"),
            Some(MenuChoice::Report(ItemKind::Found))
        );
        assert_eq!(MenuChoice::parse("Browse Items"), Some(MenuChoice::Browse));
        assert_eq!(MenuChoice::parse("report lost item"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn test_main_menu_hides_browse_by_default() {
        assert_eq!(
            main_menu_keyboard(false),
            Keyboard::Reply(vec![
                vec!["Report Lost Item".to_string()],
                vec!["Report Found Item".to_string()],
            ])
        );
    }

    #[test]
    fn test_main_menu_with_browse() {
        match main_menu_keyboard(true) {
            Keyboard::Reply(rows) => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[2], vec!["Browse Items".to_string()]);
            }
            Keyboard::Inline(_) => panic!("expected reply keyboard"),
        }
    }

    #[test]
    fn test_item_kind_keyboard() {
        match item_kind_keyboard() {
            Keyboard::Inline(rows) => {
                assert_eq!(rows[0][0], Button::new("Yes", "item_type_yes"));
                assert_eq!(rows[1][0], Button::new("No", "item_type_no"));
            }
            Keyboard::Reply(_) => panic!("expected inline keyboard"),
        }
    }

    #[tokio::test]
    async fn test_show_main_menu_sends_prompt() {
        let transport = RecordingTransport::new();
        let chat = ChatTarget::Chat(42);

        show_main_menu(&transport, &chat, false).await.unwrap();

        assert_eq!(
            transport.sent(),
            vec![Sent::Text {
                chat,
                text: "Choose an option:".to_string(),
                keyboard: Some(main_menu_keyboard(false)),
            }]
        );
    }

    #[tokio::test]
    async fn test_show_main_menu_propagates_failure() {
        let transport = RecordingTransport::new();
        let chat = ChatTarget::Chat(42);
        transport.fail_sends_to(chat.clone());

        assert!(show_main_menu(&transport, &chat, false).await.is_err());
    }
}

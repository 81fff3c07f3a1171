//! User-facing result dialogs

use rfd::{MessageButtons, MessageDialog, MessageLevel};

/// Shows outcomes of user actions
pub trait Notifier {
    fn error(&self, title: &str, message: &str);
    fn info(&self, title: &str, message: &str);
}

/// Native modal message boxes
pub struct MessageBox;

impl Notifier for MessageBox {
    fn error(&self, title: &str, message: &str) {
        show(MessageLevel::Error, title, message);
    }

    fn info(&self, title: &str, message: &str) {
        show(MessageLevel::Info, title, message);
    }
}

fn show(level: MessageLevel, title: &str, message: &str) {
    let _ = MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

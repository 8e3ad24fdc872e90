use hashchat_core::notifications::{DesktopNotifier, Permission};

/// Prints notifications as a highlighted line on stderr and rings the bell.
#[derive(Debug)]
pub struct TerminalNotifier {
    permission: Permission,
}

impl TerminalNotifier {
    /// `enabled = false` behaves like a user who denied notifications.
    pub fn new(enabled: bool) -> Self {
        Self {
            permission: if enabled {
                Permission::Default
            } else {
                Permission::Denied
            },
        }
    }
}

impl DesktopNotifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        self.permission = Permission::Granted;
        self.permission
    }

    fn show(&mut self, title: &str, body: &str, _icon: &str) -> Result<(), String> {
        eprintln!("\x07** {} **\n   {}", title, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_notifier_starts_denied() {
        assert_eq!(TerminalNotifier::new(false).permission(), Permission::Denied);

        let mut notifier = TerminalNotifier::new(true);
        assert_eq!(notifier.permission(), Permission::Default);
        assert_eq!(notifier.request_permission(), Permission::Granted);
    }
}

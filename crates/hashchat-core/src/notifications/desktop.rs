//! Platform notification capability.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

pub trait DesktopNotifier {
    fn permission(&self) -> Permission;

    /// Ask the platform. Only called while the permission is still `Default`.
    fn request_permission(&mut self) -> Permission;

    fn show(&mut self, title: &str, body: &str, icon: &str) -> Result<(), String>;
}

/// Writes notifications to the tracing log. Used where no desktop exists.
#[derive(Debug)]
pub struct LogNotifier {
    permission: Permission,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            permission: Permission::Default,
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopNotifier for LogNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        self.permission = Permission::Granted;
        self.permission
    }

    fn show(&mut self, title: &str, body: &str, _icon: &str) -> Result<(), String> {
        tracing::info!(target: "hashchat::notify", "{}: {}", title, body);
        Ok(())
    }
}

//! Best-effort alerts. Nothing here returns an error to the caller; failures
//! are logged and dropped.

pub mod desktop;
pub mod sound;

pub use desktop::{DesktopNotifier, LogNotifier, Permission};
pub use sound::{AlertPlayer, RodioAlert, SilentAlert};

use crate::constants::NOTIFICATION_ICON;
use crate::tlog;

pub struct NotificationTrigger {
    desktop: Box<dyn DesktopNotifier>,
    alert: Box<dyn AlertPlayer>,
}

impl NotificationTrigger {
    pub fn new(desktop: Box<dyn DesktopNotifier>, alert: Box<dyn AlertPlayer>) -> Self {
        Self { desktop, alert }
    }

    /// Show a visual notification, asking for permission the first time.
    ///
    /// Returns whether anything was shown.
    pub fn notify(&mut self, title: &str, body: &str) -> bool {
        let permission = match self.desktop.permission() {
            Permission::Default => self.desktop.request_permission(),
            other => other,
        };
        if permission != Permission::Granted {
            return false;
        }
        match self.desktop.show(title, body, NOTIFICATION_ICON) {
            Ok(()) => true,
            Err(e) => {
                tlog!("NOTIFY", "Notification failed: {}", e);
                false
            }
        }
    }

    /// Play the alert sound if the preference allows it.
    pub fn notify_with_sound(&self, enabled: bool) -> bool {
        if !enabled {
            return false;
        }
        match self.alert.play() {
            Ok(()) => true,
            Err(e) => {
                tlog!("NOTIFY", "Playback failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    pub struct Recorded {
        pub shown: Vec<(String, String, String)>,
        pub requests: usize,
        pub sounds: usize,
    }

    pub struct RecordingNotifier {
        pub permission: Permission,
        pub answer: Permission,
        pub log: Arc<Mutex<Recorded>>,
    }

    impl DesktopNotifier for RecordingNotifier {
        fn permission(&self) -> Permission {
            self.permission
        }

        fn request_permission(&mut self) -> Permission {
            self.log.lock().unwrap().requests += 1;
            self.permission = self.answer;
            self.permission
        }

        fn show(&mut self, title: &str, body: &str, icon: &str) -> Result<(), String> {
            self.log
                .lock()
                .unwrap()
                .shown
                .push((title.to_string(), body.to_string(), icon.to_string()));
            Ok(())
        }
    }

    pub struct RecordingAlert {
        pub fail: bool,
        pub log: Arc<Mutex<Recorded>>,
    }

    impl AlertPlayer for RecordingAlert {
        fn play(&self) -> Result<(), String> {
            if self.fail {
                return Err("device busy".to_string());
            }
            self.log.lock().unwrap().sounds += 1;
            Ok(())
        }
    }

    pub fn recording(answer: Permission) -> (NotificationTrigger, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let trigger = NotificationTrigger::new(
            Box::new(RecordingNotifier {
                permission: Permission::Default,
                answer,
                log: log.clone(),
            }),
            Box::new(RecordingAlert {
                fail: false,
                log: log.clone(),
            }),
        );
        (trigger, log)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_permission_requested_once_then_shown() {
        let (mut trigger, log) = recording(Permission::Granted);
        assert!(trigger.notify("alice mentioned you in #_", "hi"));
        assert!(trigger.notify("second", "body"));

        let log = log.lock().unwrap();
        assert_eq!(log.requests, 1);
        assert_eq!(log.shown.len(), 2);
        assert_eq!(log.shown[0].2, "favicon-32x32.png");
    }

    #[test]
    fn test_denied_permission_is_not_asked_again() {
        let (mut trigger, log) = recording(Permission::Denied);
        assert!(!trigger.notify("t", "b"));
        assert!(!trigger.notify("t", "b"));
        let log = log.lock().unwrap();
        assert_eq!(log.requests, 1);
        assert!(log.shown.is_empty());
    }

    #[test]
    fn test_sound_respects_preference_and_swallows_errors() {
        let (trigger, log) = recording(Permission::Granted);
        assert!(!trigger.notify_with_sound(false));
        assert!(trigger.notify_with_sound(true));
        assert_eq!(log.lock().unwrap().sounds, 1);

        let failing = NotificationTrigger::new(
            Box::new(LogNotifier::new()),
            Box::new(RecordingAlert {
                fail: true,
                log: Arc::new(Mutex::new(Recorded::default())),
            }),
        );
        assert!(!failing.notify_with_sound(true));
    }
}

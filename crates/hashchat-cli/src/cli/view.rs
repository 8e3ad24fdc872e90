//! What the terminal knows about channels, rebuilt from `CoreEvent`s.

use hashchat_core::nostr::ConnectionState;
use hashchat_core::store::MessageStore;
use hashchat_core::CoreEvent;

#[derive(Debug, Clone)]
pub struct ChannelView {
    pub channels: Vec<String>,
    pub unread: Vec<String>,
    pub selected: String,
    pub connection: ConnectionState,
    pub relay_url: Option<String>,
}

impl ChannelView {
    pub fn from_store(store: &MessageStore) -> Self {
        Self {
            channels: store.channels().to_vec(),
            unread: store.unread().to_vec(),
            selected: store.selected().to_string(),
            connection: ConnectionState::Stopped,
            relay_url: None,
        }
    }

    /// Apply an event; returns the line to print, if any.
    pub fn apply(&mut self, event: &CoreEvent) -> Option<String> {
        match event {
            CoreEvent::MessageAppended {
                channel,
                author,
                content,
                ..
            } => {
                let from = author.as_deref().unwrap_or("*");
                Some(format!("{} <{}> {}", channel, from, content))
            }
            CoreEvent::NewChannel(channel) => {
                if !self.channels.contains(channel) {
                    self.channels.push(channel.clone());
                }
                None
            }
            CoreEvent::ChannelUnread(channel) => {
                if !self.unread.contains(channel) {
                    self.unread.push(channel.clone());
                }
                None
            }
            CoreEvent::ChannelSelected(channel) => {
                self.unread.retain(|c| c != channel);
                if !self.channels.contains(channel) {
                    self.channels.push(channel.clone());
                }
                self.selected = channel.clone();
                Some(format!("-- now in {}", channel))
            }
            CoreEvent::ChannelsRemoved(removed) => {
                self.channels.retain(|c| !removed.contains(c));
                self.unread.retain(|c| !removed.contains(c));
                Some(format!("-- removed {}", removed.join(" ")))
            }
            CoreEvent::Mention { .. } => None,
            CoreEvent::ProfileUpdated {
                pubkey,
                name,
                verified,
            } => {
                tracing::debug!("profile {} -> {:?} (verified: {})", pubkey, name, verified);
                None
            }
            CoreEvent::ConnectionChanged { state, relay_url } => {
                let changed = *state != self.connection;
                self.connection = *state;
                self.relay_url = relay_url.clone();
                changed.then(|| {
                    format!(
                        "-- {:?} {}",
                        state,
                        relay_url.as_deref().unwrap_or("(no relay)")
                    )
                })
            }
            CoreEvent::LoggedIn(pubkey) => Some(format!("-- logged in as {}", pubkey)),
            CoreEvent::Error(message) => Some(format!("!! {}", message)),
        }
    }

    pub fn render_channels(&self) -> String {
        self.channels
            .iter()
            .map(|c| {
                let marker = if *c == self.selected {
                    '>'
                } else if self.unread.contains(c) {
                    '*'
                } else {
                    ' '
                };
                format!("{} {}", marker, c)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ChannelView {
        ChannelView::from_store(&MessageStore::new())
    }

    #[test]
    fn test_tracks_channels_and_unread() {
        let mut view = view();
        assert!(view
            .apply(&CoreEvent::NewChannel("#news".to_string()))
            .is_none());
        view.apply(&CoreEvent::ChannelUnread("#news".to_string()));
        assert_eq!(view.render_channels(), "> #_\n* #news");

        let line = view.apply(&CoreEvent::ChannelSelected("#news".to_string()));
        assert_eq!(line.as_deref(), Some("-- now in #news"));
        assert_eq!(view.render_channels(), "  #_\n> #news");
    }

    #[test]
    fn test_message_line_format() {
        let mut view = view();
        let line = view.apply(&CoreEvent::MessageAppended {
            channel: "#_".to_string(),
            id: "e1".to_string(),
            author: Some("alice".to_string()),
            content: "hi".to_string(),
        });
        assert_eq!(line.as_deref(), Some("#_ <alice> hi"));
    }

    #[test]
    fn test_connection_lines_only_on_change() {
        let mut view = view();
        let event = CoreEvent::ConnectionChanged {
            state: ConnectionState::Connected,
            relay_url: Some("wss://relay.example.com".to_string()),
        };
        assert_eq!(
            view.apply(&event).as_deref(),
            Some("-- Connected wss://relay.example.com")
        );
        assert!(view.apply(&event).is_none());
    }
}

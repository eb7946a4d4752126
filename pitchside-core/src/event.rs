#![forbid(unsafe_code)]

//! Notification event definitions.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Served from the club's static assets; used when an event carries no icon.
pub const DEFAULT_ICON: &str = "/icons/icon-192x192.png";

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Audience {
    #[default]
    AllSubscribers,
    SpecificUsers { user_ids: Vec<String> },
}

impl Audience {
    pub fn users(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Audience::SpecificUsers {
            user_ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// One logical message to deliver. Created per dispatch call, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub audience: Audience,
}

impl NotificationEvent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: default_icon(),
            tag: None,
            link: None,
            audience: Audience::AllSubscribers,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Notifications sharing a tag supersede each other on clients that
    /// support coalescing.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidEvent("title must not be empty".into()));
        }
        if self.body.trim().is_empty() {
            return Err(Error::InvalidEvent("body must not be empty".into()));
        }
        Ok(())
    }
}

//! Message payloads that render themselves per output target

use std::fmt;
use std::sync::Arc;

/// Output target a message renders against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Text,
    Json,
}

/// A message value built outside the pipeline (e.g. a styled text builder)
///
/// # Example
///
/// ```
/// use rust_log_pipeline::{Message, Render, RenderTarget};
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct Bold(String);
///
/// impl Render for Bold {
///     fn render(&self, target: RenderTarget, color: bool) -> String {
///         match target {
///             RenderTarget::Text if color => format!("\x1b[1m{}\x1b[0m", self.0),
///             _ => self.0.clone(),
///         }
///     }
/// }
///
/// let message = Message::from(Arc::new(Bold("ready".into())) as Arc<dyn Render>);
/// assert_eq!(message.render(RenderTarget::Json, true), "ready");
/// ```
pub trait Render: Send + Sync + fmt::Debug {
    fn render(&self, target: RenderTarget, color: bool) -> String;
}

#[derive(Debug, Clone)]
pub enum Message {
    Text(String),
    Rendered(Arc<dyn Render>),
}

impl Message {
    pub fn render(&self, target: RenderTarget, color: bool) -> String {
        match self {
            Message::Text(text) => text.clone(),
            Message::Rendered(value) => value.render(target, color),
        }
    }

    /// Uncoloured text form
    pub fn plain(&self) -> String {
        self.render(RenderTarget::Text, false)
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::Text(String::new())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<Arc<dyn Render>> for Message {
    fn from(value: Arc<dyn Render>) -> Self {
        Message::Rendered(value)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plain())
    }
}

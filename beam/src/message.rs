use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Outcome of a single filter for a message
#[derive(Hash, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The filter has no opinion about the message, the next filter should run
    #[display(fmt = "pass")]
    Pass,
    /// The message is unsolicited
    #[display(fmt = "spam")]
    Spam,
    /// The message is legitimate
    #[display(fmt = "tofu")]
    Tofu,
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Pass
    }
}

impl Verdict {
    /// Whether the verdict ends the run of a filter chain
    pub fn is_decisive(&self) -> bool {
        !matches!(self, Verdict::Pass)
    }
}

impl From<bool> for Verdict {
    fn from(is_spam: bool) -> Self {
        match is_spam {
            true => Verdict::Spam,
            false => Verdict::Tofu,
        }
    }
}

/// A message travelling through the filter chain, together with what the
/// filters decided about it.
///
/// The text is expected to be decoded already (headers and body as readable text).
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
    headers: String,
    body: String,
    is_spam: Option<bool>,
    folder: Option<String>,
    stop_processing: bool,
    notes: Vec<String>,
}

impl MessageContext {
    pub fn new(headers: impl Into<String>, body: impl Into<String>) -> Self {
        MessageContext {
            headers: headers.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Splits a raw message at the first empty line into headers and body
    pub fn from_raw(raw: &str) -> Self {
        let split = raw
            .find("\r\n\r\n")
            .map(|pos| (pos, 4))
            .or_else(|| raw.find("\n\n").map(|pos| (pos, 2)));

        match split {
            Some((pos, sep)) => MessageContext::new(&raw[..pos], &raw[pos + sep..]),
            None => MessageContext::new(String::new(), raw),
        }
    }

    pub fn headers(&self) -> &str {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Headers and body joined the way the classifier sees them
    pub fn text(&self) -> String {
        if self.headers.is_empty() {
            return self.body.clone();
        }
        format!("{}\n\n{}", self.headers, self.body)
    }

    /// Size of the message text in bytes
    pub fn size(&self) -> usize {
        match self.headers.is_empty() {
            true => self.body.len(),
            false => self.headers.len() + 2 + self.body.len(),
        }
    }

    pub fn is_spam(&self) -> Option<bool> {
        self.is_spam
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn stop_processing(&self) -> bool {
        self.stop_processing
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

impl MessageContext {
    pub fn set_spam(&mut self, is_spam: bool) {
        self.is_spam = Some(is_spam);
    }

    pub fn set_folder(&mut self, folder: impl Into<String>) {
        self.folder = Some(folder.into());
    }

    pub fn set_stop_processing(&mut self, stop: bool) {
        self.stop_processing = stop;
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

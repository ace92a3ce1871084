//! Chat log and the view-model trait the controller drives.

/// Who a chat entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// What a chat entry displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// Plain text; the surface escapes it.
    Text(String),
    /// HTML produced by the renderer; already escaped.
    Markup(String),
    /// Typing indicator.
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: Role,
    pub body: EntryBody,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            body: EntryBody::Text(text.into()),
        }
    }

    pub fn bot_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            body: EntryBody::Text(text.into()),
        }
    }

    pub fn bot_markup(html: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            body: EntryBody::Markup(html.into()),
        }
    }

    pub fn loading() -> Self {
        Self {
            role: Role::Bot,
            body: EntryBody::Loading,
        }
    }

    /// The text or markup, `None` for the loading indicator.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            EntryBody::Text(s) | EntryBody::Markup(s) => Some(s),
            EntryBody::Loading => None,
        }
    }
}

/// Append-only list of turns plus at most one transient entry shown after them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
    transient: Option<ChatEntry>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    /// Replaces any existing transient entry.
    pub fn set_transient(&mut self, entry: ChatEntry) {
        self.transient = Some(entry);
    }

    /// Removes the transient entry; a no-op when there is none.
    pub fn remove_transient(&mut self) -> Option<ChatEntry> {
        self.transient.take()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn transient(&self) -> Option<&ChatEntry> {
        self.transient.as_ref()
    }

    /// Entries in display order, transient last.
    pub fn display(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter().chain(self.transient.as_ref())
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }
}

// ── View model ────────────────────────────────────────────────────────────────

/// The rendering surface the controller talks to.
pub trait View {
    fn set_open(&mut self, open: bool);
    fn set_input_enabled(&mut self, enabled: bool);
    fn focus_input(&mut self);
    fn input_value(&self) -> String;
    fn clear_input(&mut self);
    fn append_entry(&mut self, entry: ChatEntry);
    fn append_transient_entry(&mut self, entry: ChatEntry);
    fn remove_transient_entry(&mut self);
}

/// In-memory [`View`] over a [`ChatLog`].
#[derive(Debug, Clone)]
pub struct LogView {
    log: ChatLog,
    input: String,
    open: bool,
    input_enabled: bool,
    focused: bool,
}

impl Default for LogView {
    fn default() -> Self {
        Self {
            log: ChatLog::new(),
            input: String::new(),
            open: false,
            input_enabled: true,
            focused: false,
        }
    }
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the input box contents, as a user typing would.
    pub fn type_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

impl View for LogView {
    fn set_open(&mut self, open: bool) {
        self.open = open;
        if !open {
            self.focused = false;
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        if !enabled {
            self.focused = false;
        }
    }

    fn focus_input(&mut self) {
        if self.input_enabled {
            self.focused = true;
        }
    }

    fn input_value(&self) -> String {
        self.input.clone()
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn append_entry(&mut self, entry: ChatEntry) {
        self.log.push(entry);
    }

    fn append_transient_entry(&mut self, entry: ChatEntry) {
        self.log.set_transient(entry);
    }

    fn remove_transient_entry(&mut self) {
        self.log.remove_transient();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_displayed_last_and_replaced() {
        let mut log = ChatLog::new();
        log.push(ChatEntry::user("hi"));
        log.set_transient(ChatEntry::loading());
        log.set_transient(ChatEntry::bot_text("working"));
        log.push(ChatEntry::bot_text("later"));

        let shown: Vec<_> = log.display().filter_map(ChatEntry::content).collect();
        assert_eq!(shown, ["hi", "later", "working"]);
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn removing_missing_transient_is_a_no_op() {
        let mut log = ChatLog::new();
        log.push(ChatEntry::user("hi"));
        assert_eq!(log.remove_transient(), None);
        assert_eq!(log.entries(), [ChatEntry::user("hi")]);
    }

    #[test]
    fn disabled_input_cannot_hold_focus() {
        let mut view = LogView::new();
        view.set_input_enabled(false);
        view.focus_input();
        assert!(!view.is_focused());

        view.set_input_enabled(true);
        view.focus_input();
        assert!(view.is_focused());
    }
}

//! The interaction controller.
//!
//! A [`Session`] is a state machine over one editable request URL. It is
//! either idle or listing suggestions. Each host event is a method that
//! updates the state and returns the [`Command`]s the host has to execute;
//! the session itself never performs I/O.

use crate::domain::{SampleQuery, UrlMetadata};
use crate::filter::{narrow, SortOrder};
use crate::resolver::{CachedMetadata, Resolution, Resolver};
use crate::telemetry::{
    TelemetrySink, AUTOCOMPLETE_COMPONENT, COMPONENT_NAME, SELECTED_SUGGESTION, SELECTION_EVENT,
};
use crate::tokenizer::{
    compare_fragment, split_at_last_separator, tokenize, EditContext, PathSeparator,
    PARAMETER_MARKER, SEPARATORS,
};
use crate::{FetchError, FetchKey};
use scout_settings::SuggestSettings;
use std::sync::Arc;

/// Identifies one metadata request. Only the newest token a session handed
/// out is ever accepted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Metadata the host should fetch and hand back through
/// [`Session::on_metadata_loaded`] along with `token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Ties the response to this request.
    pub token: RequestToken,
    /// What to fetch.
    pub key: FetchKey,
}

/// Work for the host to carry out after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch metadata without blocking input.
    Fetch(FetchRequest),
    /// Show this text in the editor and treat it as the current query URL.
    ReplaceText(String),
    /// The editor lost focus with this text in it.
    ContentChanged(String),
    /// Run the query with this URL.
    RunQuery(String),
}

/// The state of the most recent metadata request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Nothing outstanding, and the last request succeeded.
    Idle,
    /// A request is in flight.
    Pending,
    /// The last request failed. No suggestions are available for it.
    Failed,
}

/// Keys the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum Key {
    Enter,
    Tab,
    ArrowUp,
    ArrowDown,
    Escape,
    Space,
    Period,
    /// Any key the session ignores.
    Other,
}

/// A key press, with the state of the Ctrl modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub key: Key,
    /// Whether Ctrl was held.
    pub ctrl: bool,
}

impl KeyEvent {
    /// A plain key press.
    pub fn new(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    /// A key press with Ctrl held.
    pub fn ctrl(key: Key) -> Self {
        Self { key, ctrl: true }
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// The request the session is waiting on.
#[derive(Debug)]
struct PendingFetch {
    /// The token handed to the host.
    token: RequestToken,
    /// What was requested.
    key: FetchKey,
    /// The text, up to and including the separator, that needed the metadata.
    prefix: String,
    /// The separator at the end of `prefix`.
    separator: PathSeparator,
    /// The order to list candidates in once they arrive.
    order: SortOrder,
}

/// One editing session over a request URL.
pub struct Session {
    /// Versions and defaults for building fetch keys.
    settings: SuggestSettings,
    /// The query selected in the host.
    query: SampleQuery,
    /// Where confirmed selections are reported.
    telemetry: Arc<dyn TelemetrySink>,

    /// The text being edited.
    text: String,
    /// The text typed since the last separator. Always a suffix of `text`.
    compare: String,
    /// The full candidate list for the current context.
    suggestions: Vec<String>,
    /// `suggestions` narrowed by `compare`.
    filtered: Vec<String>,
    /// The highlighted entry of `filtered`.
    active: usize,
    /// Whether suggestions are being listed.
    listing: bool,
    /// How `filtered` is ordered.
    order: SortOrder,

    /// The last metadata fetched successfully.
    cached: Option<CachedMetadata>,
    /// The request being waited on, if any.
    pending: Option<PendingFetch>,
    /// The last token handed out.
    last_token: u64,
    /// The state of the last request.
    status: FetchStatus,
}

impl Session {
    /// Start a session editing the sample URL of `query`.
    pub fn new(
        settings: &SuggestSettings,
        query: SampleQuery,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            settings: settings.clone(),
            text: query.sample_url.clone(),
            query,
            telemetry,
            compare: String::new(),
            suggestions: vec![],
            filtered: vec![],
            active: 0,
            listing: false,
            order: SortOrder::Source,
            cached: None,
            pending: None,
            last_token: 0,
            status: FetchStatus::Idle,
        }
    }

    /// The text being edited.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text typed since the last separator, used to narrow suggestions.
    pub fn compare_fragment(&self) -> &str {
        &self.compare
    }

    /// The completion context of the current text.
    pub fn context(&self) -> Option<EditContext> {
        tokenize(&self.text)
    }

    /// The query the session was given.
    pub fn query(&self) -> &SampleQuery {
        &self.query
    }

    /// Whether suggestions are visible.
    pub fn is_listing(&self) -> bool {
        self.listing && !self.filtered.is_empty()
    }

    /// The suggestions to show, in display order. Empty when idle.
    pub fn suggestions(&self) -> &[String] {
        if self.is_listing() {
            &self.filtered
        } else {
            &[]
        }
    }

    /// The full, unfiltered candidate list for the current context.
    pub fn completion_set(&self) -> &[String] {
        &self.suggestions
    }

    /// The index of the highlighted suggestion, if any are shown.
    pub fn active_suggestion(&self) -> Option<usize> {
        self.is_listing().then(|| self.active)
    }

    /// The state of the most recent metadata request.
    pub fn fetch_status(&self) -> FetchStatus {
        self.status
    }

    /// The text in the editor changed to `value`.
    pub fn on_input<S: Into<String>>(&mut self, value: S) -> Vec<Command> {
        self.text = value.into();
        self.compare = compare_fragment(&self.text).to_string();

        let mut commands = vec![];
        self.update_context(&mut commands);
        commands
    }

    /// A key was pressed in the editor.
    pub fn on_key(&mut self, event: KeyEvent) -> Vec<Command> {
        if event.ctrl && matches!(event.key, Key::Space | Key::Period) {
            return self.force_suggestions();
        }

        match event.key {
            Key::Enter | Key::Tab if self.is_listing() => self.confirm_active(),
            Key::Enter => vec![Command::RunQuery(self.text.clone())],
            Key::ArrowUp => {
                self.navigate(false);
                vec![]
            }
            Key::ArrowDown => {
                self.navigate(true);
                vec![]
            }
            Key::Escape => {
                if self.listing {
                    self.hide();
                }
                vec![]
            }
            _ => vec![],
        }
    }

    /// The suggestion at `index` of [`Session::suggestions`] was clicked.
    pub fn on_suggestion_clicked(&mut self, index: usize) -> Vec<Command> {
        match self.suggestions().get(index).cloned() {
            Some(selected) => self.confirm(selected),
            None => vec![],
        }
    }

    /// The editor lost focus. `inside_suggestions` is set when focus moved to
    /// the suggestion list itself.
    pub fn on_blur(&mut self, inside_suggestions: bool) -> Vec<Command> {
        if !inside_suggestions && self.listing {
            self.hide();
        }
        vec![Command::ContentChanged(self.text.clone())]
    }

    /// The host selected a different query, replacing the edited text.
    pub fn on_query_changed(&mut self, query: SampleQuery) -> Vec<Command> {
        self.text = query.sample_url.clone();
        self.query = query;
        self.compare.clear();
        self.order = SortOrder::Source;
        self.hide();

        if let Some(context @ EditContext::PathSegment(_)) = tokenize(&self.text) {
            let resolution = self.resolver().resolve(&context, &self.text);
            if let Resolution::Candidates(candidates) = resolution {
                self.show(candidates);
            }
        }
        vec![]
    }

    /// A metadata request finished.
    ///
    /// Responses to anything but the newest request are dropped. The newest
    /// response only applies while the text still belongs to the path it was
    /// requested for: it is listed if the text still ends in the segment that
    /// triggered it, and cached unless that would evict metadata for the path
    /// being edited now.
    pub fn on_metadata_loaded(
        &mut self,
        token: RequestToken,
        result: Result<UrlMetadata, FetchError>,
    ) -> Vec<Command> {
        let pending = match self.pending.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                self.pending = other;
                tracing::debug!(?token, "discarding stale metadata response");
                return vec![];
            }
        };

        let typed = self
            .text
            .strip_prefix(pending.prefix.as_str())
            .filter(|typed| !typed.contains(&SEPARATORS[..]))
            .map(ToString::to_string);
        let current_key = self.resolver().fetch_key(&self.text);
        let applies = typed.is_some() || current_key == pending.key;

        match result {
            Ok(metadata) => {
                self.status = FetchStatus::Idle;
                let covers_current = self
                    .cached
                    .as_ref()
                    .map_or(false, |cached| cached.key == current_key);
                if covers_current && !applies {
                    tracing::debug!(key = %pending.key, "keeping metadata for the path being edited");
                    return vec![];
                }

                let metadata = Arc::new(metadata);
                self.cached = Some(CachedMetadata {
                    key: pending.key.clone(),
                    metadata: metadata.clone(),
                });

                match typed {
                    Some(typed) => {
                        self.compare = typed;
                        self.order = pending.order;
                        let candidates = self.resolver().local_lookup(&metadata, pending.separator);
                        self.show(candidates);
                    }
                    None => {
                        tracing::debug!(key = %pending.key, "text moved on while metadata was loading")
                    }
                }
            }
            Err(error) if !applies => {
                tracing::debug!(%error, key = %pending.key, "ignoring failure for a path no longer edited");
                self.status = FetchStatus::Idle;
            }
            Err(error) => {
                tracing::warn!(%error, key = %pending.key, "could not fetch autocomplete metadata");
                self.status = FetchStatus::Failed;
                self.suggestions.clear();
                self.hide();
            }
        }
        vec![]
    }

    /// Recompute the context of the text and react to it.
    fn update_context(&mut self, commands: &mut Vec<Command>) {
        match tokenize(&self.text) {
            Some(context) => {
                tracing::debug!(?context, "edit context changed");
                self.compare.clear();
                self.order = SortOrder::Source;
                let prefix = self.text.clone();
                self.resolve(context, &prefix, commands);
            }
            None => self.refilter(),
        }
    }

    /// Resolve `context` for `prefix`, either listing candidates or asking for
    /// metadata.
    fn resolve(&mut self, context: EditContext, prefix: &str, commands: &mut Vec<Command>) {
        let resolution = self.resolver().resolve(&context, prefix);
        match (resolution, context) {
            (Resolution::Candidates(candidates), _) => self.show(candidates),
            (Resolution::Fetch(key), EditContext::PathSegment(separator)) => {
                self.hide();
                self.request(key, prefix, separator, commands);
            }
            (Resolution::Fetch(_), _) => self.hide(),
        }
    }

    /// Ask the host for metadata, unless the same key is already on its way.
    fn request(
        &mut self,
        key: FetchKey,
        prefix: &str,
        separator: PathSeparator,
        commands: &mut Vec<Command>,
    ) {
        if let Some(pending) = self.pending.as_mut().filter(|pending| pending.key == key) {
            tracing::debug!(%key, "metadata already requested");
            pending.prefix = prefix.to_string();
            pending.separator = separator;
            pending.order = self.order;
            return;
        }

        self.last_token += 1;
        let token = RequestToken(self.last_token);
        tracing::debug!(%key, ?token, "requesting autocomplete metadata");

        self.pending = Some(PendingFetch {
            token,
            key: key.clone(),
            prefix: prefix.to_string(),
            separator,
            order: self.order,
        });
        self.status = FetchStatus::Pending;
        commands.push(Command::Fetch(FetchRequest { token, key }));
    }

    /// The force-suggestions chord: list the candidates for the segment being
    /// typed, sorted, even though the text does not end in a separator.
    fn force_suggestions(&mut self) -> Vec<Command> {
        let (prefix, remainder) = match split_at_last_separator(&self.text) {
            Some((prefix, remainder)) => (prefix.to_string(), remainder.to_string()),
            None => return vec![],
        };

        self.compare = remainder;
        self.order = SortOrder::Ascending;

        let mut commands = vec![];
        match tokenize(&prefix) {
            Some(context) => self.resolve(context, &prefix, &mut commands),
            None => self.hide(),
        }
        commands
    }

    /// Confirm the highlighted suggestion.
    fn confirm_active(&mut self) -> Vec<Command> {
        match self.filtered.get(self.active).cloned() {
            Some(selected) => self.confirm(selected),
            None => vec![],
        }
    }

    /// Splice `selected` into the text in place of the compare fragment.
    fn confirm(&mut self, selected: String) -> Vec<Command> {
        if selected.is_empty() {
            return vec![];
        }

        let mut inserted = selected;
        if inserted.starts_with(PARAMETER_MARKER) {
            inserted.push('=');
        }

        let mut text = self
            .text
            .strip_suffix(self.compare.as_str())
            .unwrap_or(&self.text)
            .to_string();
        text.push_str(&inserted);
        self.text = text;
        self.compare.clear();
        self.order = SortOrder::Source;
        self.hide();

        tracing::debug!(suggestion = %inserted, text = %self.text, "suggestion confirmed");
        self.telemetry.record(
            SELECTION_EVENT,
            &[
                (COMPONENT_NAME, AUTOCOMPLETE_COMPONENT),
                (SELECTED_SUGGESTION, &inserted),
            ],
        );

        let mut commands = vec![Command::ReplaceText(self.text.clone())];
        self.update_context(&mut commands);
        commands
    }

    /// Move the highlight one step, wrapping at either end.
    fn navigate(&mut self, forward: bool) {
        if !self.is_listing() {
            return;
        }

        let last = self.filtered.len() - 1;
        if self.active > last {
            self.active = 0;
        }
        self.active = match (forward, self.active) {
            (true, active) if active == last => 0,
            (true, active) => active + 1,
            (false, 0) => last,
            (false, active) => active - 1,
        };
    }

    /// Replace the candidate list and start listing it.
    fn show(&mut self, candidates: Vec<String>) {
        self.suggestions = candidates;
        self.filtered = narrow(&self.suggestions, &self.compare, self.order);
        self.active = 0;
        self.listing = !self.suggestions.is_empty();
    }

    /// Stop listing. The candidate list is kept.
    fn hide(&mut self) {
        self.listing = false;
        self.filtered.clear();
        self.active = 0;
    }

    /// Narrow the listed candidates after the compare fragment changed.
    fn refilter(&mut self) {
        if !self.listing {
            return;
        }
        self.filtered = narrow(&self.suggestions, &self.compare, self.order);
        if self.active >= self.filtered.len() {
            self.active = 0;
        }
    }

    /// A resolver over the current state.
    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.settings, &self.query, self.cached.as_ref())
    }
}

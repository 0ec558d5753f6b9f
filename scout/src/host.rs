//! A line based host for a suggestion [`Session`].

use anyhow::{bail, Context, Result};
use http::Method;
use scout_suggest::{
    Command, FetchError, FetchRequest, FetchStatus, Key, KeyEvent, MetadataSource, RequestToken,
    SampleQuery, Session, UrlMetadata,
};
use std::{io::Write, str::FromStr, sync::Arc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// A finished fetch, on its way back to the session.
type FetchResult = (RequestToken, Result<UrlMetadata, FetchError>);

/// One line of input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Any line that is not a command replaces the editor content.
    Input(String),
    /// `:up`, `:down`, `:enter`, `:tab`, `:esc`, and `:force` for the
    /// force-suggestions chord.
    Key(KeyEvent),
    /// `:pick N` clicks the suggestion listed as `N`.
    Pick(usize),
    /// `:blur` moves focus away from the editor.
    Blur,
    /// `:verb GET` selects the HTTP verb of the query.
    Verb(Method),
    /// `:version beta` selects the API version of the query.
    Version(String),
    /// `:sample URL` selects a different sample query.
    Sample(String),
    /// `:quit` stops the host.
    Quit,
}

impl FromStr for HostEvent {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let command = match line.strip_prefix(':') {
            Some(command) => command.trim(),
            None => return Ok(Self::Input(line.to_string())),
        };
        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (command, ""),
        };

        let event = match (name, argument) {
            ("up", "") => Self::Key(KeyEvent::new(Key::ArrowUp)),
            ("down", "") => Self::Key(KeyEvent::new(Key::ArrowDown)),
            ("enter", "") => Self::Key(KeyEvent::new(Key::Enter)),
            ("tab", "") => Self::Key(KeyEvent::new(Key::Tab)),
            ("esc", "") => Self::Key(KeyEvent::new(Key::Escape)),
            ("force", "") => Self::Key(KeyEvent::ctrl(Key::Space)),
            ("blur", "") => Self::Blur,
            ("pick", index) => Self::Pick(
                index
                    .parse()
                    .with_context(|| format!("Invalid suggestion index {:?}", index))?,
            ),
            ("verb", verb) if !verb.is_empty() => Self::Verb(
                Method::from_bytes(verb.to_uppercase().as_bytes())
                    .with_context(|| format!("Invalid verb {:?}", verb))?,
            ),
            ("version", version) if !version.is_empty() => Self::Version(version.to_string()),
            ("sample", url) => Self::Sample(url.to_string()),
            ("quit", "") | ("q", "") => Self::Quit,
            _ => bail!("Unknown command {:?}", line),
        };
        Ok(event)
    }
}

/// Drives a session from lines of input, and renders it after every change.
pub struct Host<W> {
    /// The session being driven.
    session: Session,

    /// Where fetch commands are sent.
    source: Arc<dyn MetadataSource>,

    /// Fetches spawned but not yet handed back to the session.
    in_flight: usize,

    /// Where the editor is rendered.
    output: W,
}

impl<W: Write> Host<W> {
    /// Create a host for `session`, rendering to `output`.
    pub fn new(session: Session, source: Arc<dyn MetadataSource>, output: W) -> Self {
        Self {
            session,
            source,
            in_flight: 0,
            output,
        }
    }

    /// Read events from `input` until it ends or a `:quit` arrives. Fetches
    /// that are still running when input ends are waited for. Returns the
    /// output once done.
    ///
    /// # Errors
    /// If reading input or writing output fails.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> Result<W> {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<FetchResult>();
        let mut lines = input.lines();
        let mut input_open = true;

        self.render()?;
        while input_open || self.in_flight > 0 {
            let commands = tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line.context("Reading input")? {
                        None => {
                            input_open = false;
                            continue;
                        }
                        Some(line) => match line.parse::<HostEvent>() {
                            Ok(HostEvent::Quit) => break,
                            Ok(event) => self.handle(event),
                            Err(error) => {
                                writeln!(self.output, "{:#}", error)?;
                                continue;
                            }
                        },
                    }
                }
                Some((token, result)) = results_rx.recv() => {
                    self.in_flight -= 1;
                    self.session.on_metadata_loaded(token, result)
                }
            };

            self.execute(commands, &results_tx)?;
            self.render()?;
        }

        Ok(self.output)
    }

    /// Pass `event` to the session.
    fn handle(&mut self, event: HostEvent) -> Vec<Command> {
        let current = SampleQuery {
            sample_url: self.session.text().to_string(),
            ..self.session.query().clone()
        };

        match event {
            HostEvent::Input(text) => self.session.on_input(text),
            HostEvent::Key(key) => self.session.on_key(key),
            HostEvent::Pick(index) => self.session.on_suggestion_clicked(index),
            HostEvent::Blur => self.session.on_blur(false),
            HostEvent::Verb(selected_verb) => self.session.on_query_changed(SampleQuery {
                selected_verb,
                ..current
            }),
            HostEvent::Version(selected_version) => {
                self.session.on_query_changed(SampleQuery {
                    selected_version,
                    ..current
                })
            }
            HostEvent::Sample(sample_url) => self.session.on_query_changed(SampleQuery {
                sample_url,
                ..current
            }),
            HostEvent::Quit => vec![],
        }
    }

    /// Carry out the commands the session returned.
    fn execute(
        &mut self,
        commands: Vec<Command>,
        results: &mpsc::UnboundedSender<FetchResult>,
    ) -> Result<()> {
        for command in commands {
            match command {
                Command::Fetch(FetchRequest { token, key }) => {
                    self.in_flight += 1;
                    let source = Arc::clone(&self.source);
                    let results = results.clone();
                    let fetch = tokio::spawn(async move { source.fetch(key).await });
                    tokio::spawn(async move {
                        let result = match fetch.await {
                            Ok(result) => result,
                            Err(error) => {
                                tracing::error!(%error, "metadata fetch task failed");
                                Err(FetchError::Internal(error.into()))
                            }
                        };
                        results.send((token, result)).ok();
                    });
                }
                Command::ReplaceText(text) => tracing::debug!(%text, "editor text replaced"),
                Command::ContentChanged(text) => tracing::info!(%text, "query url changed"),
                Command::RunQuery(text) => {
                    writeln!(self.output, "run {} {}", self.session.query().selected_verb, text)?
                }
            }
        }
        Ok(())
    }

    /// Write the editor line and any visible suggestions.
    fn render(&mut self) -> Result<()> {
        let out = &mut self.output;
        writeln!(out, "{} {}", self.session.query().selected_verb, self.session.text())?;

        let active = self.session.active_suggestion();
        for (index, suggestion) in self.session.suggestions().iter().enumerate() {
            let marker = if active == Some(index) { '>' } else { ' ' };
            writeln!(out, "{} {:>2} {}", marker, index, suggestion)?;
        }

        match self.session.fetch_status() {
            FetchStatus::Pending => writeln!(out, "  loading suggestions...")?,
            FetchStatus::Failed => writeln!(out, "  no suggestions available")?,
            FetchStatus::Idle => {}
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Host, HostEvent};
    use async_trait::async_trait;
    use http::Method;
    use parameterized::parameterized;
    use pretty_assertions::assert_eq;
    use scout_settings::SuggestSettings;
    use scout_suggest::{
        FetchError, FetchKey, Key, KeyEvent, MetadataSource, NullTelemetry, SampleQuery, Session,
        UrlMetadata,
    };
    use std::sync::Arc;

    struct StaticSource;

    #[async_trait]
    impl MetadataSource for StaticSource {
        fn name(&self) -> String {
            "StaticSource".to_string()
        }

        async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
            Ok(UrlMetadata {
                url: format!("/{}", key.request_url),
                parameters: vec![],
                links: vec!["profile".to_string(), "messages".to_string()],
            })
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl MetadataSource for PanickingSource {
        fn name(&self) -> String {
            "PanickingSource".to_string()
        }

        async fn fetch(&self, _key: FetchKey) -> Result<UrlMetadata, FetchError> {
            panic!("metadata source blew up")
        }
    }

    async fn run(input: &str) -> anyhow::Result<String> {
        run_with(input, Arc::new(StaticSource)).await
    }

    async fn run_with(input: &str, source: Arc<dyn MetadataSource>) -> anyhow::Result<String> {
        let session = Session::new(
            &SuggestSettings::default(),
            SampleQuery::get(""),
            Arc::new(NullTelemetry),
        );
        let host = Host::new(session, source, Vec::new());
        let output = host.run(input.as_bytes()).await?;
        Ok(String::from_utf8(output)?)
    }

    #[parameterized(line = {
        ":up", ":down", ":enter", ":tab", ":esc", ":force",
    }, expected = {
        KeyEvent::new(Key::ArrowUp),
        KeyEvent::new(Key::ArrowDown),
        KeyEvent::new(Key::Enter),
        KeyEvent::new(Key::Tab),
        KeyEvent::new(Key::Escape),
        KeyEvent::ctrl(Key::Space),
    })]
    fn key_commands_parse(line: &str, expected: KeyEvent) {
        pretty_assertions::assert_eq!(line.parse::<HostEvent>().unwrap(), HostEvent::Key(expected));
    }

    #[test]
    fn other_commands_parse() {
        assert_eq!(":pick 2".parse::<HostEvent>().unwrap(), HostEvent::Pick(2));
        assert_eq!(":blur".parse::<HostEvent>().unwrap(), HostEvent::Blur);
        assert_eq!(
            ":verb post".parse::<HostEvent>().unwrap(),
            HostEvent::Verb(Method::POST)
        );
        assert_eq!(
            ":version beta".parse::<HostEvent>().unwrap(),
            HostEvent::Version("beta".to_string())
        );
        assert_eq!(
            ":sample /me/messages".parse::<HostEvent>().unwrap(),
            HostEvent::Sample("/me/messages".to_string())
        );
        assert_eq!(":quit".parse::<HostEvent>().unwrap(), HostEvent::Quit);
    }

    #[test]
    fn plain_lines_are_input() {
        assert_eq!(
            "/users?$select=mail".parse::<HostEvent>().unwrap(),
            HostEvent::Input("/users?$select=mail".to_string())
        );
        assert_eq!("".parse::<HostEvent>().unwrap(), HostEvent::Input(String::new()));
    }

    #[parameterized(line = { ":pick", ":pick two", ":verb", ":nope", ":up 3" })]
    fn bad_commands_are_rejected(line: &str) {
        assert!(line.parse::<HostEvent>().is_err());
    }

    #[tokio::test]
    async fn fetched_suggestions_are_listed() -> anyhow::Result<()> {
        let output = run("/users/\n").await?;
        assert!(output.contains("  loading suggestions...\n"));
        assert!(output.ends_with("GET /users/\n>  0 profile\n   1 messages\n"));
        Ok(())
    }

    #[tokio::test]
    async fn panicking_fetch_is_reported_as_failure() -> anyhow::Result<()> {
        let output = run_with("/users/\n", Arc::new(PanickingSource)).await?;
        assert!(output.ends_with("GET /users/\n  no suggestions available\n"));
        Ok(())
    }

    #[tokio::test]
    async fn enter_without_suggestions_runs_query() -> anyhow::Result<()> {
        let output = run("/me\n:verb delete\n:enter\n").await?;
        assert!(output.contains("run DELETE /me\n"));
        Ok(())
    }

    #[tokio::test]
    async fn bad_commands_are_reported() -> anyhow::Result<()> {
        let output = run(":bogus\n/me\n").await?;
        assert!(output.contains("Unknown command \":bogus\""));
        assert!(output.ends_with("GET /me\n"));
        Ok(())
    }

    #[tokio::test]
    async fn quit_stops_reading() -> anyhow::Result<()> {
        let output = run("/me\n:quit\n:enter\n").await?;
        assert!(!output.contains("run"));
        Ok(())
    }
}

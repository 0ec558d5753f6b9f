use anyhow::{bail, Context};
use serde::{de, ser::SerializeSeq, Deserialize, Serialize};
use std::{ops::AddAssign, str::FromStr};
use tracing_subscriber::{filter::Directive, EnvFilter};

/// How Scout logs. Logs always go to stderr, since stdout carries the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directives, most general first. `RUST_LOG` is appended after
    /// the configured entries, so it wins where both name the same target.
    ///
    /// ```yaml
    /// logging:
    ///   levels:
    ///     - WARN
    ///     - scout_suggest=DEBUG   # session transitions and fetch requests
    /// ```
    pub levels: DirectiveWrapper,

    /// See [`LogFormat`].
    pub format: LogFormat,
}

/// Output format for log events. Written in lowercase in config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line and colored. Suits a developer watching a second terminal.
    Pretty,

    /// One JSON object per event.
    Json,

    /// One short line per event.
    Compact,
}

/// Validated log filter directives.
///
/// `tracing_subscriber`'s `Directive` can't be cloned or serialized, so the
/// directives are kept as strings that have each been checked to parse. A
/// single comma separated string is accepted as well as a list of them, which
/// lets `SCOUT_LOGGING__LEVELS` and the YAML files share one field.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveWrapper(Vec<String>);

impl DirectiveWrapper {
    /// The directives, in the order they will be applied.
    pub fn directives(&self) -> &[String] {
        &self.0
    }
}

impl Serialize for DirectiveWrapper {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for directive in &self.0 {
            seq.serialize_element(&directive)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for DirectiveWrapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        /// Accepts a string or a sequence of strings.
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = DirectiveWrapper;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "directive or list of directives")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                s.parse().map_err(|_err| {
                    de::Error::invalid_value(de::Unexpected::Str(s), &"valid directive")
                })
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut rv = DirectiveWrapper(vec![]);

                while let Some(item) = seq.next_element::<String>()? {
                    let parsed: DirectiveWrapper = item.parse().map_err(|err: anyhow::Error| {
                        de::Error::invalid_value(
                            de::Unexpected::Str(&item),
                            &err.to_string().as_str(),
                        )
                    })?;
                    rv += parsed;
                }

                Ok(rv)
            }
        }

        let mut rv = deserializer.deserialize_any(Visitor)?;

        // RUST_LOG goes last so it overrides the config files.
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            let from_env: DirectiveWrapper = rust_log.parse().map_err(|_err| {
                de::Error::invalid_value(de::Unexpected::Str(&rust_log), &"valid directive")
            })?;
            rv += from_env;
        }

        Ok(rv)
    }
}

impl FromStr for DirectiveWrapper {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();

        if let Some(err) = parts.iter().find_map(|p| p.parse::<Directive>().err()) {
            return Err(err).context("valid syntax");
        }

        // Crate names are written with underscores in log targets, so a hyphen
        // is always a mistake.
        if parts.iter().any(|p| p.contains('-')) {
            bail!("log targets must not include hyphens");
        }

        Ok(Self(parts))
    }
}

impl AddAssign for DirectiveWrapper {
    fn add_assign(&mut self, rhs: Self) {
        self.0.extend(rhs.0)
    }
}

impl From<&DirectiveWrapper> for EnvFilter {
    fn from(val: &DirectiveWrapper) -> Self {
        val.0
            .iter()
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(EnvFilter::default(), EnvFilter::add_directive)
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectiveWrapper, LogFormat};
    use parameterized::parameterized;
    use pretty_assertions::assert_eq;

    #[parameterized(input = {
        "INFO",
        "scout_suggest=DEBUG",
        "WARN,scout_metadata=TRACE",
        "INFO, scout=DEBUG",
    })]
    fn directives_parse(input: &str) {
        assert!(input.parse::<DirectiveWrapper>().is_ok());
    }

    #[parameterized(input = { "scout-suggest=DEBUG", "scout=LOUD" })]
    fn bad_directives_are_rejected(input: &str) {
        assert!(input.parse::<DirectiveWrapper>().is_err());
    }

    #[test]
    fn directives_from_sequence_are_flattened() {
        let parsed: DirectiveWrapper =
            serde_json::from_value(serde_json::json!(["INFO", "scout=DEBUG,hyper=WARN"]))
                .expect("directives should deserialize");
        assert_eq!(
            &parsed.directives()[..3],
            &["INFO".to_string(), "scout=DEBUG".to_string(), "hyper=WARN".to_string()]
        );
    }

    #[test]
    fn log_format_is_lowercase() {
        let format: LogFormat =
            serde_json::from_value(serde_json::json!("compact")).expect("format should parse");
        assert_eq!(format, LogFormat::Compact);
    }
}

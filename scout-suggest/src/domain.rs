//! Datatypes describing the query being edited and the metadata that drives
//! completions.

use fake::{faker::lorem::en::Words, Fake};
use http::Method;
use serde::{Deserialize, Serialize};

/// Completion metadata for one request path, as returned by a
/// [`MetadataSource`](crate::MetadataSource).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMetadata {
    /// The path this metadata describes.
    #[serde(default)]
    pub url: String,

    /// Query parameters, grouped by the HTTP verb they apply to.
    #[serde(default)]
    pub parameters: Vec<ParameterSet>,

    /// Path segments that may follow the described path.
    #[serde(default)]
    pub links: Vec<String>,
}

impl UrlMetadata {
    /// The parameters available for `verb`, if the metadata lists any.
    pub fn parameters_for(&self, verb: &Method) -> Option<&ParameterSet> {
        self.parameters
            .iter()
            .find(|set| set.name.eq_ignore_ascii_case(verb.as_str()))
    }
}

impl<F> fake::Dummy<F> for UrlMetadata {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_config: &F, rng: &mut R) -> Self {
        let links: Vec<String> = Words(1..6).fake_with_rng(rng);
        Self {
            url: format!("/{}", Words(1..3).fake_with_rng::<Vec<String>, R>(rng).join("/")),
            parameters: vec![ParameterSet {
                name: "get".to_string(),
                values: Words(1..4)
                    .fake_with_rng::<Vec<String>, R>(rng)
                    .into_iter()
                    .map(|word| ParameterDefinition {
                        name: format!("${}", word),
                        items: Some(Words(0..5).fake_with_rng(rng)),
                    })
                    .collect(),
            }],
            links,
        }
    }
}

/// The query parameters accepted by one HTTP verb.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// The verb, in lower case, such as `get`.
    pub name: String,

    /// The parameters themselves.
    #[serde(default)]
    pub values: Vec<ParameterDefinition>,
}

impl ParameterSet {
    /// The names of every parameter, in source order.
    pub fn names(&self) -> Vec<String> {
        self.values.iter().map(|value| value.name.clone()).collect()
    }

    /// The enumerated values of the parameter called `name`. Empty if the
    /// parameter is unknown or is not enumerated.
    pub fn items_of(&self, name: &str) -> Vec<String> {
        self.values
            .iter()
            .find(|value| value.name == name)
            .and_then(|value| value.items.clone())
            .unwrap_or_default()
    }
}

/// A single query parameter, such as `$select`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// The parameter name, including the `$` marker.
    pub name: String,

    /// The closed list of values the parameter accepts, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

/// The query selected in the host, read by the session but never changed by
/// it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleQuery {
    /// The request URL shown in the editor.
    pub sample_url: String,

    /// The HTTP verb the query will be run with.
    pub selected_verb: Method,

    /// The API version picked in the host. May be empty.
    pub selected_version: String,
}

impl SampleQuery {
    /// A GET query for `sample_url` with no explicitly selected version.
    pub fn get<S: Into<String>>(sample_url: S) -> Self {
        Self {
            sample_url: sample_url.into(),
            selected_verb: Method::GET,
            selected_version: String::new(),
        }
    }
}

impl<F> fake::Dummy<F> for SampleQuery {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_config: &F, rng: &mut R) -> Self {
        let verbs = [Method::GET, Method::POST, Method::PATCH, Method::DELETE];
        let versions = ["v1.0", "beta"];
        let version = versions[rng.gen_range(0..versions.len())];
        Self {
            sample_url: format!(
                "https://graph.microsoft.com/{}/{}",
                version,
                Words(1..4).fake_with_rng::<Vec<String>, R>(rng).join("/")
            ),
            selected_verb: verbs[rng.gen_range(0..verbs.len())].clone(),
            selected_version: version.to_string(),
        }
    }
}

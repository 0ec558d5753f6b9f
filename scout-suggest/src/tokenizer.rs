//! Classification of the text being edited.
//!
//! Only the final character matters: it decides whether the user is waiting
//! for a path segment, a parameter name, or a parameter value.

/// Characters that end one token and start the next.
pub const SEPARATORS: [char; 5] = ['/', '?', ',', '&', '='];

/// The marker that starts a system query parameter name, like `$select`.
pub const PARAMETER_MARKER: char = '$';

/// The kind of completion the text is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditContext {
    /// A path segment may follow (`/`), or the query has just started (`?`).
    PathSegment(PathSeparator),

    /// A new query parameter has just started (`&`).
    ParameterName,

    /// A value for `parameter` is expected. `continuation` is set when the
    /// value extends a comma separated list.
    ParameterValue {
        /// The parameter name, including the `$` marker.
        parameter: String,
        /// Whether a `,` rather than a `=` introduced the value.
        continuation: bool,
    },
}

/// The separator that put the text in [`EditContext::PathSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSeparator {
    /// `/`: the next path segment.
    Slash,
    /// `?`: the first query parameter.
    QueryStart,
}

/// Classify `text` by its final character. `None` means no completion applies.
pub fn tokenize(text: &str) -> Option<EditContext> {
    let last = text.chars().last()?;
    let head = &text[..text.len() - last.len_utf8()];

    match last {
        '/' => Some(EditContext::PathSegment(PathSeparator::Slash)),
        '?' => Some(EditContext::PathSegment(PathSeparator::QueryStart)),
        '&' => Some(EditContext::ParameterName),
        '=' => {
            let token = query_token(head);
            if token.starts_with(PARAMETER_MARKER) {
                Some(EditContext::ParameterValue {
                    parameter: token.to_string(),
                    continuation: false,
                })
            } else {
                None
            }
        }
        ',' => Some(EditContext::ParameterValue {
            parameter: list_parameter(head),
            continuation: true,
        }),
        _ => None,
    }
}

/// The text typed since the last separator.
pub fn compare_fragment(text: &str) -> &str {
    match text.rfind(&SEPARATORS[..]) {
        Some(idx) => &text[idx + 1..],
        None => text,
    }
}

/// Split `text` just after its last separator. The first half ends with the
/// separator.
pub fn split_at_last_separator(text: &str) -> Option<(&str, &str)> {
    text.rfind(&SEPARATORS[..])
        .map(|idx| text.split_at(idx + 1))
}

/// The query token at the end of `head`, such as `$top` in `/users?$top`.
fn query_token(head: &str) -> &str {
    let start = head
        .rfind(|c: char| c == '?' || c == '&')
        .or_else(|| head.rfind('/'))
        .map_or(0, |idx| idx + 1);
    &head[start..]
}

/// The parameter whose value list is being continued at the end of `head`,
/// such as `$select` in `/users?$select=displayName`.
fn list_parameter(head: &str) -> String {
    let assignment = match head.rfind('=') {
        Some(idx) => &head[..idx],
        None => return String::new(),
    };
    let name = match assignment.rfind(PARAMETER_MARKER) {
        Some(idx) => &assignment[idx..],
        None => query_token(assignment),
    };
    name.to_string()
}

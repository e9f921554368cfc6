use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};

/// Structured error payload returned by the backend on 4xx responses.
///
/// Field errors come either as a list of messages or as a single string, so
/// both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub error: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub username: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub password: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub text: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub non_field_errors: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub detail: Vec<String>,
}

impl ErrorBody {
    /// Anything that isn't a JSON object (html error pages, empty bodies)
    /// yields an empty body.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// The message to surface, in fixed priority order: the generic `error`
    /// key, then field errors, then the framework `detail`.
    pub fn most_specific(&self) -> Option<&str> {
        [
            &self.error,
            &self.username,
            &self.password,
            &self.text,
            &self.non_field_errors,
            &self.detail,
        ]
        .into_iter()
        .flat_map(|messages| messages.iter())
        .map(|message| message.trim())
        .find(|message| !message.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(match value {
        Some(OneOrMany::One(message)) => vec![message],
        Some(OneOrMany::Many(messages)) => messages,
        None => vec![],
    })
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized(ErrorBody),

    #[error("Request rejected with status {status}")]
    Rejected { status: StatusCode, body: ErrorBody },

    #[error("Network error {0}")]
    Network(String),

    #[error("Unexpected response {0}")]
    Decode(String),

    #[error("Url error {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let body = ErrorBody::parse(body);
        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthorized(body)
        } else {
            Self::Rejected { status, body }
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Unauthorized(body) | Self::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// What the user was doing when a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Register,
    Profile,
    LoadMessages,
    SendMessage,
}

impl Action {
    fn fallback(self) -> &'static str {
        match self {
            Self::Login => "Something went wrong while logging in",
            Self::Register => "Something went wrong while registering",
            Self::Profile => "Could not load the profile",
            Self::LoadMessages => "Could not load messages",
            Self::SendMessage => "Could not send the message",
        }
    }
}

/// Turns a failed request into the text shown next to the form.
pub fn describe_failure(err: &ApiError, action: Action) -> String {
    if let Some(message) = err.body().and_then(ErrorBody::most_specific) {
        return message.to_string();
    }
    match (action, err.status()) {
        (Action::Login, Some(StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED)) => {
            "Invalid username or password".to_string()
        }
        _ => action.fallback().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_error_wins() {
        let body = ErrorBody::parse(r#"{"username": ["taken"], "error": "Username already exists"}"#);
        assert_eq!(body.most_specific(), Some("Username already exists"));
    }

    #[test]
    fn username_before_password() {
        let body = ErrorBody::parse(
            r#"{"password": ["Ensure this field has at least 6 characters."], "username": ["A user with that username already exists."]}"#,
        );
        assert_eq!(
            body.most_specific(),
            Some("A user with that username already exists.")
        );
    }

    #[test]
    fn single_strings_and_detail_are_accepted() {
        let body = ErrorBody::parse(r#"{"detail": "Invalid token."}"#);
        assert_eq!(body.detail, vec!["Invalid token.".to_string()]);
        assert_eq!(body.most_specific(), Some("Invalid token."));
    }

    #[test]
    fn blank_messages_are_skipped() {
        let body = ErrorBody::parse(r#"{"error": "  ", "text": ["Ensure this field has no more than 1000 characters."]}"#);
        assert_eq!(
            body.most_specific(),
            Some("Ensure this field has no more than 1000 characters.")
        );
    }

    #[test]
    fn non_json_bodies_are_empty() {
        assert_eq!(ErrorBody::parse("<html>oops</html>"), ErrorBody::default());
        assert_eq!(ErrorBody::parse(""), ErrorBody::default());
        assert_eq!(ErrorBody::parse("null"), ErrorBody::default());
        assert_eq!(ErrorBody::default().most_specific(), None);
    }

    #[test]
    fn status_classification() {
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

        let err = ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"error": "nope"}"#);
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.body().and_then(ErrorBody::most_specific), Some("nope"));

        assert_eq!(ApiError::Network("offline".into()).status(), None);
    }

    #[test]
    fn login_credentials_fallback() {
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, "");
        assert_eq!(
            describe_failure(&err, Action::Login),
            "Invalid username or password"
        );
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, "{}");
        assert_eq!(
            describe_failure(&err, Action::Login),
            "Invalid username or password"
        );
        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(
            describe_failure(&err, Action::Login),
            "Something went wrong while logging in"
        );
    }

    #[test]
    fn backend_message_is_preferred() {
        let err = ApiError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "Invalid username or password"}"#,
        );
        assert_eq!(
            describe_failure(&err, Action::Register),
            "Invalid username or password"
        );
    }

    #[test]
    fn network_errors_use_generic_text() {
        let err = ApiError::Network("connection refused".into());
        assert_eq!(
            describe_failure(&err, Action::SendMessage),
            "Could not send the message"
        );
        assert_eq!(
            describe_failure(&err, Action::LoadMessages),
            "Could not load messages"
        );
    }
}

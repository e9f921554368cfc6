use crate::state::Credentials;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Client-side checks that block a submission before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Username must be at least 3 characters long")]
    UsernameTooShort,

    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("A message is already being sent")]
    SendInFlight,
}

pub fn validate_login(username: &str, password: &str) -> Result<Credentials, ValidationError> {
    if username.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_registration(
    username: &str,
    password: &str,
) -> Result<Credentials, ValidationError> {
    let credentials = validate_login(username, password)?;
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(credentials)
}

/// Loading and error state shared by the single-shot forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub submitting: bool,
    pub error: Option<String>,
}

impl FormState {
    pub fn begin(&mut self) {
        self.submitting = true;
        self.error = None;
    }

    pub fn invalid(&mut self, err: ValidationError) {
        self.submitting = false;
        self.error = Some(err.to_string());
    }

    pub fn fail(&mut self, message: String) {
        self.submitting = false;
        self.error = Some(message);
    }

    pub fn finish(&mut self) {
        self.submitting = false;
        self.error = None;
    }
}

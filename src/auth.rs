use crate::error::ApiError;
use crate::http::{HttpClient, ReqwestTransport, Transport};
use crate::session::Session;
use crate::state::{AuthResponse, Credentials, User};

const REGISTER: &str = "api/register/";
const LOGIN: &str = "api/login/";
const PROFILE: &str = "api/profile/";

pub struct AuthClient<T = ReqwestTransport> {
    http: HttpClient<T>,
    session: Session,
}

impl<T> Clone for AuthClient<T> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            session: self.session.clone(),
        }
    }
}

impl<T: Transport> AuthClient<T> {
    pub fn new(http: HttpClient<T>, session: Session) -> Self {
        Self { http, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Creates the account. The token is stored when the backend hands one out.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.authenticate(REGISTER, username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.authenticate(LOGIN, username, password).await
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.http.get(PROFILE, &[]).await
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    async fn authenticate(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.http.post(path, &credentials).await?;
        if let Some(token) = response.token.as_deref().filter(|token| !token.is_empty()) {
            self.session.sign_in(token);
        }
        Ok(response)
    }
}

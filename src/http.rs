use crate::error::ApiError;
use crate::session::Session;
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;
use url::Url;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends a fully prepared request. Only network level failures are errors
/// here, any HTTP status comes back as a response.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Runs before every outgoing request.
pub trait RequestInterceptor {
    fn on_request(&self, request: &mut ApiRequest);
}

/// Observes every failed request before the error reaches the caller.
pub trait ResponseInterceptor {
    fn on_error(&self, request: &ApiRequest, error: &ApiError);
}

/// Adds `Authorization: Token <t>` whenever the session holds a token.
pub struct AttachToken {
    session: Session,
}

impl AttachToken {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for AttachToken {
    fn on_request(&self, request: &mut ApiRequest) {
        let Some(token) = self.session.token() else {
            return;
        };
        match HeaderValue::from_str(&format!("Token {token}")) {
            Ok(value) => {
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("Stored token is not a valid header value"),
        }
    }
}

pub trait Navigator {
    fn current_path(&self) -> String;
    /// Full page navigation.
    fn redirect(&self, path: &str);
}

pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn current_path(&self) -> String {
        leptos::window().location().pathname().unwrap_or_default()
    }

    fn redirect(&self, path: &str) {
        if let Err(err) = leptos::window().location().set_href(path) {
            warn!("Redirect to {path} failed {err:?}");
        }
    }
}

/// On a 401, drops the token and sends the browser to the login page. When the
/// login page is already showing nothing is navigated, so a failed login can't loop.
pub struct ExpireOnUnauthorized {
    session: Session,
    navigator: Rc<dyn Navigator>,
}

impl ExpireOnUnauthorized {
    pub fn new(session: Session, navigator: impl Navigator + 'static) -> Self {
        Self {
            session,
            navigator: Rc::new(navigator),
        }
    }
}

impl ResponseInterceptor for ExpireOnUnauthorized {
    fn on_error(&self, request: &ApiRequest, error: &ApiError) {
        if !error.is_unauthorized() {
            return;
        }
        info!("{} {} unauthorized, dropping session", request.method, request.url);
        self.session.clear();
        if self.navigator.current_path() != LOGIN_PATH {
            self.navigator.redirect(LOGIN_PATH);
        }
    }
}

/// JSON client bound to the api base url. Cheap to clone.
pub struct HttpClient<T = ReqwestTransport> {
    base: Url,
    transport: Rc<T>,
    request_interceptors: Rc<Vec<Box<dyn RequestInterceptor>>>,
    response_interceptors: Rc<Vec<Box<dyn ResponseInterceptor>>>,
}

impl<T> Clone for HttpClient<T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            transport: self.transport.clone(),
            request_interceptors: self.request_interceptors.clone(),
            response_interceptors: self.response_interceptors.clone(),
        }
    }
}

pub struct HttpClientBuilder<T> {
    base: Url,
    transport: T,
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
}

impl<T: Transport> HttpClientBuilder<T> {
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn response_interceptor(
        mut self,
        interceptor: impl ResponseInterceptor + 'static,
    ) -> Self {
        self.response_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn build(self) -> HttpClient<T> {
        HttpClient {
            base: self.base,
            transport: Rc::new(self.transport),
            request_interceptors: Rc::new(self.request_interceptors),
            response_interceptors: Rc::new(self.response_interceptors),
        }
    }
}

impl<T: Transport> HttpClient<T> {
    pub fn builder(base: Url, transport: T) -> HttpClientBuilder<T> {
        HttpClientBuilder {
            base,
            transport,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// `path` is relative to the base, e.g. `api/messages/`.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    pub async fn get<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        let body = self.execute(ApiRequest::new(Method::GET, url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn post<B, R>(&self, path: &str, payload: &B) -> Result<R, ApiError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let mut request = ApiRequest::new(Method::POST, self.endpoint(path)?);
        request.body = Some(serde_json::to_value(payload)?);
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute(&self, mut request: ApiRequest) -> Result<String, ApiError> {
        for interceptor in self.request_interceptors.iter() {
            interceptor.on_request(&mut request);
        }
        let result = match self.transport.send(request.clone()).await {
            Ok(response) if response.status.is_success() => Ok(response.body),
            Ok(response) => Err(ApiError::from_response(response.status, &response.body)),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!("{} {} failed: {err}", request.method, request.url);
            for interceptor in self.response_interceptors.iter() {
                interceptor.on_error(&request, err);
            }
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde::Deserialize;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub responses: RefCell<VecDeque<Result<RawResponse, ApiError>>>,
        pub sent: RefCell<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        pub fn reply(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push_back(Ok(RawResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.to_string(),
            }));
            self
        }

        pub fn fail(self, err: ApiError) -> Self {
            self.responses.borrow_mut().push_back(Err(err));
            self
        }
    }

    impl Transport for Rc<FakeTransport> {
        async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
            self.sent.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Network("no canned response".into())))
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeNavigator {
        pub path: RefCell<String>,
        pub redirects: RefCell<Vec<String>>,
    }

    impl Navigator for Rc<FakeNavigator> {
        fn current_path(&self) -> String {
            self.path.borrow().clone()
        }

        fn redirect(&self, path: &str) {
            self.redirects.borrow_mut().push(path.to_string());
            *self.path.borrow_mut() = path.to_string();
        }
    }

    pub(crate) fn base() -> Url {
        Url::parse("http://chat.test/").unwrap()
    }

    /// Client wired the same way the app wires it.
    pub(crate) fn client(
        session: &Session,
        transport: &Rc<FakeTransport>,
        navigator: &Rc<FakeNavigator>,
    ) -> HttpClient<Rc<FakeTransport>> {
        HttpClient::builder(base(), transport.clone())
            .request_interceptor(AttachToken::new(session.clone()))
            .response_interceptor(ExpireOnUnauthorized::new(
                session.clone(),
                navigator.clone(),
            ))
            .build()
    }

    fn navigator_at(path: &str) -> Rc<FakeNavigator> {
        let navigator = FakeNavigator::default();
        *navigator.path.borrow_mut() = path.to_string();
        Rc::new(navigator)
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        ok: bool,
    }

    #[test]
    fn token_header_is_attached() {
        let session = Session::in_memory();
        session.sign_in("abc123");
        let transport = Rc::new(FakeTransport::default().reply(200, r#"{"ok": true}"#));
        let http = client(&session, &transport, &navigator_at("/chat"));

        let pong: Pong = block_on(http.get("api/ping/", &[])).unwrap();
        assert_eq!(pong, Pong { ok: true });

        let sent = transport.sent.borrow();
        assert_eq!(sent[0].headers.get(AUTHORIZATION).unwrap(), "Token abc123");
        assert_eq!(sent[0].url.as_str(), "http://chat.test/api/ping/");
    }

    #[test]
    fn no_header_without_token() {
        let session = Session::in_memory();
        let transport = Rc::new(FakeTransport::default().reply(200, r#"{"ok": true}"#));
        let http = client(&session, &transport, &navigator_at("/login"));

        let _: Pong = block_on(http.post("api/ping/", &serde_json::json!({}))).unwrap();
        assert!(transport.sent.borrow()[0].headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn query_pairs_are_encoded() {
        let session = Session::in_memory();
        let transport = Rc::new(FakeTransport::default().reply(200, r#"{"ok": true}"#));
        let http = client(&session, &transport, &navigator_at("/chat"));

        let query = [("page", "2".to_string()), ("page_size", "50".to_string())];
        let _: Pong = block_on(http.get("api/messages/", &query)).unwrap();
        assert_eq!(
            transport.sent.borrow()[0].url.as_str(),
            "http://chat.test/api/messages/?page=2&page_size=50"
        );
    }

    #[test]
    fn unauthorized_clears_token_and_redirects() {
        let session = Session::in_memory();
        session.sign_in("stale");
        let transport = Rc::new(FakeTransport::default().reply(401, r#"{"detail": "Invalid token."}"#));
        let navigator = navigator_at("/chat");
        let http = client(&session, &transport, &navigator);

        let err = block_on(http.get::<Pong>("api/messages/", &[])).unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!session.is_authenticated());
        assert_eq!(*navigator.redirects.borrow(), vec![LOGIN_PATH.to_string()]);
    }

    #[test]
    fn unauthorized_on_login_page_does_not_loop() {
        let session = Session::in_memory();
        let transport = Rc::new(
            FakeTransport::default()
                .reply(401, r#"{"error": "Invalid username or password"}"#)
                .reply(401, r#"{"error": "Invalid username or password"}"#),
        );
        let navigator = navigator_at(LOGIN_PATH);
        let http = client(&session, &transport, &navigator);

        for _ in 0..2 {
            let err = block_on(http.post::<_, Pong>("api/login/", &serde_json::json!({})))
                .unwrap_err();
            assert!(err.is_unauthorized());
        }
        assert!(navigator.redirects.borrow().is_empty());
    }

    #[test]
    fn other_failures_keep_the_session() {
        let session = Session::in_memory();
        session.sign_in("abc");
        let transport = Rc::new(
            FakeTransport::default()
                .reply(400, r#"{"text": ["Ensure this field has no more than 1000 characters."]}"#)
                .fail(ApiError::Network("offline".into())),
        );
        let navigator = navigator_at("/chat");
        let http = client(&session, &transport, &navigator);

        let err = block_on(http.post::<_, Pong>("api/messages/", &serde_json::json!({}))).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        let err = block_on(http.get::<Pong>("api/messages/", &[])).unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));

        assert!(session.is_authenticated());
        assert!(navigator.redirects.borrow().is_empty());
    }

    #[test]
    fn undecodable_body_is_a_decode_error() {
        let session = Session::in_memory();
        let transport = Rc::new(FakeTransport::default().reply(200, "<html></html>"));
        let http = client(&session, &transport, &navigator_at("/chat"));

        let err = block_on(http.get::<Pong>("api/ping/", &[])).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn payload_is_sent_as_json() {
        let session = Session::in_memory();
        let transport = Rc::new(FakeTransport::default().reply(201, r#"{"ok": true}"#));
        let http = client(&session, &transport, &navigator_at("/chat"));

        let _: Pong = block_on(http.post("api/messages/", &serde_json::json!({"text": "hi"}))).unwrap();
        let sent = transport.sent.borrow();
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].body, Some(serde_json::json!({"text": "hi"})));
    }
}

use crate::auth::AuthClient;
use crate::chat::Chat;
use crate::config::Config;
use crate::http::{AttachToken, BrowserNavigator, ExpireOnUnauthorized, HttpClient, ReqwestTransport};
use crate::login::Login;
use crate::messages::MessageClient;
use crate::profile::Profile;
use crate::register::Register;
use crate::routes::Page;
use crate::session::{BrowserStorage, Session, SessionEvent};
use leptos::*;
use leptos_router::{Redirect, Route, Router, Routes};
use log::warn;

/// Whether a token is stored, kept current by a session subscription.
#[derive(Debug, Clone, Copy)]
pub struct SignedIn(pub RwSignal<bool>);

/// Renders `children` unless the routing rules send this page elsewhere.
#[component]
fn Guarded(page: Page, #[prop(optional)] children: Option<ChildrenFn>) -> impl IntoView {
    let SignedIn(signed_in) = expect_context::<SignedIn>();
    move || match page.redirect(signed_in.get()) {
        Some(target) => view! { <Redirect path=target.path() /> }.into_view(),
        None => children
            .as_ref()
            .map(|children| children().into_view())
            .into_view(),
    }
}

#[component]
pub fn App(config: Config) -> impl IntoView {
    let session = if BrowserStorage::is_available() {
        Session::new(BrowserStorage::new(config.token_key.clone()))
    } else {
        warn!("Local storage unavailable, the session will not survive a reload");
        Session::in_memory()
    };
    let http = HttpClient::builder(config.api_base.clone(), ReqwestTransport::default())
        .request_interceptor(AttachToken::new(session.clone()))
        .response_interceptor(ExpireOnUnauthorized::new(session.clone(), BrowserNavigator))
        .build();

    let signed_in = create_rw_signal(session.is_authenticated());
    let subscription = session.subscribe(move |event| {
        signed_in.set(event == SessionEvent::SignedIn);
    });
    on_cleanup({
        let session = session.clone();
        move || session.unsubscribe(subscription)
    });

    provide_context(config);
    provide_context(SignedIn(signed_in));
    provide_context(AuthClient::new(http.clone(), session.clone()));
    provide_context(MessageClient::new(http));
    provide_context(session);

    view! {
        <Router>
            <Routes>
                <Route path=Page::Root.path() view=|| view! { <Guarded page=Page::Root /> } />
                <Route
                    path=Page::Login.path()
                    view=|| view! { <Guarded page=Page::Login><Login /></Guarded> }
                />
                <Route
                    path=Page::Register.path()
                    view=|| view! { <Guarded page=Page::Register><Register /></Guarded> }
                />
                <Route
                    path=Page::Chat.path()
                    view=|| view! { <Guarded page=Page::Chat><Chat /></Guarded> }
                />
                <Route
                    path=Page::Profile.path()
                    view=|| view! { <Guarded page=Page::Profile><Profile /></Guarded> }
                />
                <Route path="/*any" view=|| view! { <Redirect path=Page::Root.path() /> } />
            </Routes>
        </Router>
    }
}

use crate::auth::AuthClient;
use crate::error::{describe_failure, Action, ApiError};
use crate::forms::{validate_registration, FormState};
use crate::login::{CredentialsForm, MISSING_TOKEN};
use crate::routes::Page;
use crate::scope::ViewScope;
use leptos::*;
use leptos_router::{use_navigate, NavigateOptions, A};
use log::warn;

#[component]
pub fn Register() -> impl IntoView {
    let auth = expect_context::<AuthClient>();
    let navigate = use_navigate();
    let username = create_rw_signal(String::new());
    let password = create_rw_signal(String::new());
    let form = create_rw_signal(FormState::default());
    let scope = ViewScope::new();
    on_cleanup({
        let scope = scope.clone();
        move || scope.close()
    });

    let on_submit = Callback::new(move |()| {
        let credentials =
            match validate_registration(&username.get_untracked(), &password.get_untracked()) {
                Ok(credentials) => credentials,
                Err(err) => {
                    form.update(|form| form.invalid(err));
                    return;
                }
            };
        form.update(FormState::begin);
        let auth = auth.clone();
        let scope = scope.clone();
        let navigate = navigate.clone();
        spawn_local(async move {
            let signup = async {
                auth.register(&credentials.username, &credentials.password)
                    .await?;
                // Some servers create the account without handing out a token.
                if !auth.session().is_authenticated() {
                    auth.login(&credentials.username, &credentials.password)
                        .await?;
                }
                Ok::<_, ApiError>(())
            };
            let Some(result) = scope.run(signup).await else {
                return;
            };
            match result {
                Ok(()) if auth.session().is_authenticated() => {
                    form.update(FormState::finish);
                    navigate(Page::Chat.path(), NavigateOptions::default());
                }
                Ok(()) => form.update(|form| form.fail(MISSING_TOKEN.to_string())),
                Err(err) => {
                    warn!("Registration failed: {err}");
                    form.update(|form| form.fail(describe_failure(&err, Action::Register)));
                }
            }
        });
    });

    view! {
        <CredentialsForm
            title="Create an account"
            subtitle="Pick a username and password to join the chat"
            submit_label="Register"
            busy_label="Creating account..."
            password_autocomplete="new-password"
            username=username
            password=password
            form=form
            on_submit=on_submit
        >
            "Already have an account? "
            <A href=Page::Login.path() class="text-blue-700 hover:underline dark:text-blue-500">
                "Log in"
            </A>
        </CredentialsForm>
    }
}

use crate::auth::AuthClient;
use crate::error::{describe_failure, Action};
use crate::forms::{validate_login, FormState};
use crate::routes::Page;
use crate::scope::ViewScope;
use leptos::ev::SubmitEvent;
use leptos::*;
use leptos_router::{use_navigate, NavigateOptions, A};
use log::warn;

pub const MISSING_TOKEN: &str = "The server did not return a session token";

/// Username/password card shared by the login and register pages.
#[component]
pub fn CredentialsForm(
    title: &'static str,
    subtitle: &'static str,
    submit_label: &'static str,
    busy_label: &'static str,
    password_autocomplete: &'static str,
    username: RwSignal<String>,
    password: RwSignal<String>,
    form: RwSignal<FormState>,
    on_submit: Callback<()>,
    children: Children,
) -> impl IntoView {
    let submitting = move || form.with(|form| form.submitting);
    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        on_submit.call(());
    };
    view! {
        <div class="flex items-center justify-center w-full min-h-screen bg-gray-50 dark:bg-gray-800">
            <div class="w-full max-w-sm p-6 bg-white border border-gray-200 rounded-lg shadow dark:bg-gray-900 dark:border-gray-700">
                <h1 class="text-xl font-bold text-gray-900 dark:text-white">{title}</h1>
                <p class="mb-4 text-sm text-gray-500 dark:text-gray-400">{subtitle}</p>
                <form class="space-y-4" on:submit=submit>
                    {move || {
                        form.with(|form| form.error.clone())
                            .map(|error| {
                                view! {
                                    <div class="p-3 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400">
                                        {error}
                                    </div>
                                }
                            })
                    }}
                    <div>
                        <label for="username" class="block mb-2 text-sm font-medium text-gray-900 dark:text-white">
                            "Username"
                        </label>
                        <input
                            type="text"
                            id="username"
                            autocomplete="username"
                            class="bg-gray-50 border border-gray-300 text-gray-900 text-sm rounded-lg focus:ring-blue-500 focus:border-blue-500 block w-full p-2.5 dark:bg-gray-700 dark:border-gray-600 dark:text-white"
                            placeholder="Enter your username"
                            prop:value=move || username.get()
                            on:input=move |ev| username.set(event_target_value(&ev))
                            disabled=submitting
                        />
                    </div>
                    <div>
                        <label for="password" class="block mb-2 text-sm font-medium text-gray-900 dark:text-white">
                            "Password"
                        </label>
                        <input
                            type="password"
                            id="password"
                            autocomplete=password_autocomplete
                            class="bg-gray-50 border border-gray-300 text-gray-900 text-sm rounded-lg focus:ring-blue-500 focus:border-blue-500 block w-full p-2.5 dark:bg-gray-700 dark:border-gray-600 dark:text-white"
                            placeholder="Enter your password"
                            prop:value=move || password.get()
                            on:input=move |ev| password.set(event_target_value(&ev))
                            disabled=submitting
                        />
                    </div>
                    <button
                        type="submit"
                        class="w-full text-white bg-blue-700 hover:bg-blue-800 focus:ring-4 focus:outline-none focus:ring-blue-300 font-medium rounded-lg text-sm px-5 py-2.5 text-center dark:bg-blue-600 dark:hover:bg-blue-700 dark:focus:ring-blue-800 disabled:cursor-not-allowed"
                        disabled=submitting
                    >
                        {move || if submitting() { busy_label } else { submit_label }}
                    </button>
                </form>
                <div class="mt-4 text-sm text-gray-500 dark:text-gray-400">{children()}</div>
            </div>
        </div>
    }
}

#[component]
pub fn Login() -> impl IntoView {
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
            match validate_login(&username.get_untracked(), &password.get_untracked()) {
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
            let login = auth.login(&credentials.username, &credentials.password);
            let Some(result) = scope.run(login).await else {
                return;
            };
            match result {
                Ok(_) if auth.session().is_authenticated() => {
                    form.update(FormState::finish);
                    navigate(Page::Chat.path(), NavigateOptions::default());
                }
                Ok(_) => form.update(|form| form.fail(MISSING_TOKEN.to_string())),
                Err(err) => {
                    warn!("Login failed: {err}");
                    form.update(|form| form.fail(describe_failure(&err, Action::Login)));
                }
            }
        });
    });

    view! {
        <CredentialsForm
            title="Log in"
            subtitle="Sign in to your account"
            submit_label="Log in"
            busy_label="Logging in..."
            password_autocomplete="current-password"
            username=username
            password=password
            form=form
            on_submit=on_submit
        >
            "No account yet? "
            <A href=Page::Register.path() class="text-blue-700 hover:underline dark:text-blue-500">
                "Register"
            </A>
        </CredentialsForm>
    }
}

use crate::auth::AuthClient;
use crate::error::{describe_failure, Action};
use crate::loading::Loading;
use crate::routes::Page;
use crate::scope::ViewScope;
use crate::state::User;
use chrono::{Local, TimeZone};
use leptos::*;
use leptos_router::{use_navigate, NavigateOptions};
use log::warn;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
    Loading,
    Loaded(User),
    Failed(String),
}

fn joined<Tz>(user: &User, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    user.created_at
        .map(|created| created.with_timezone(tz).format("%B %-d, %Y").to_string())
}

#[component]
pub fn Profile() -> impl IntoView {
    let auth = expect_context::<AuthClient>();
    let navigate = use_navigate();
    let state = create_rw_signal(ProfileState::Loading);
    let scope = ViewScope::new();
    on_cleanup({
        let scope = scope.clone();
        move || scope.close()
    });

    if auth.session().is_authenticated() {
        let auth = auth.clone();
        spawn_local(async move {
            match scope.run(auth.profile()).await {
                Some(Ok(user)) => state.set(ProfileState::Loaded(user)),
                Some(Err(err)) => {
                    warn!("Loading profile failed: {err}");
                    state.set(ProfileState::Failed(describe_failure(&err, Action::Profile)));
                }
                None => {}
            }
        });
    } else {
        state.set(ProfileState::Failed("You are not logged in".to_string()));
    }

    let back = {
        let navigate = navigate.clone();
        move |_| navigate(Page::Chat.path(), NavigateOptions::default())
    };
    let logout = move |_| {
        auth.logout();
        navigate(Page::Login.path(), NavigateOptions::default());
    };

    view! {
        <div class="flex items-center justify-center w-full min-h-screen bg-gray-50 dark:bg-gray-800">
            <div class="w-full max-w-sm p-6 bg-white border border-gray-200 rounded-lg shadow dark:bg-gray-900 dark:border-gray-700">
                <h1 class="mb-4 text-xl font-bold text-gray-900 dark:text-white">"Profile"</h1>
                {move || match state.get() {
                    ProfileState::Loading => view! { <Loading /> }.into_view(),
                    ProfileState::Failed(error) => {
                        view! {
                            <div class="p-3 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400">
                                {error}
                            </div>
                        }
                            .into_view()
                    }
                    ProfileState::Loaded(user) => {
                        let since = joined(&user, &Local);
                        view! {
                            <dl class="text-sm text-gray-900 dark:text-white divide-y divide-gray-200 dark:divide-gray-700">
                                <div class="flex justify-between py-2">
                                    <dt class="text-gray-500 dark:text-gray-400">"Username"</dt>
                                    <dd class="font-semibold">{user.username}</dd>
                                </div>
                                <div class="flex justify-between py-2">
                                    <dt class="text-gray-500 dark:text-gray-400">"User ID"</dt>
                                    <dd>{user.id}</dd>
                                </div>
                                {since
                                    .map(|since| {
                                        view! {
                                            <div class="flex justify-between py-2">
                                                <dt class="text-gray-500 dark:text-gray-400">"Joined"</dt>
                                                <dd>{since}</dd>
                                            </div>
                                        }
                                    })}
                            </dl>
                        }
                            .into_view()
                    }
                }}
                <div class="flex gap-2 mt-6">
                    <button
                        class="grow text-white bg-blue-700 hover:bg-blue-800 font-medium rounded-lg text-sm px-5 py-2.5 dark:bg-blue-600 dark:hover:bg-blue-700"
                        on:click=back
                    >
                        "Back to chat"
                    </button>
                    <button
                        class="grow text-gray-900 bg-white border border-gray-300 hover:bg-gray-100 font-medium rounded-lg text-sm px-5 py-2.5 dark:bg-gray-800 dark:text-white dark:border-gray-600 dark:hover:bg-gray-700"
                        on:click=logout
                    >
                        "Log out"
                    </button>
                </div>
            </div>
        </div>
    }
}

use crate::auth::AuthClient;
use crate::routes::Page;
use leptos::*;
use leptos_router::{use_navigate, NavigateOptions};

/// Header of the chat view with the profile and logout actions.
#[component]
pub fn Nav() -> impl IntoView {
    let auth = expect_context::<AuthClient>();
    let navigate = use_navigate();

    let open_profile = {
        let navigate = navigate.clone();
        move |_| navigate(Page::Profile.path(), NavigateOptions::default())
    };
    let logout = move |_| {
        auth.logout();
        navigate(Page::Login.path(), NavigateOptions::default());
    };

    view! {
        <header class="flex flex-row items-center border-b-2 dark:border-gray-800 dark:text-white">
            <h5 class="text-base py-2.5 px-4 font-semibold text-gray-500 uppercase dark:text-gray-400 w-full">
                "Group chat"
            </h5>
            <button
                type="button"
                class="text-white bg-gray-800 hover:bg-gray-900 focus:outline-none focus:ring-4 focus:ring-gray-300 font-medium rounded-lg text-sm px-5 py-2.5 me-2 my-2 dark:bg-gray-800 dark:hover:bg-gray-700 dark:focus:ring-gray-700 dark:border-gray-700"
                on:click=open_profile
            >
                "Profile"
            </button>
            <button
                type="button"
                class="text-white bg-blue-700 hover:bg-blue-800 focus:ring-4 focus:ring-blue-300 font-medium rounded-lg text-sm px-5 py-2.5 me-2 my-2 dark:bg-blue-600 dark:hover:bg-blue-700 focus:outline-none dark:focus:ring-blue-800"
                on:click=logout
            >
                "Log out"
            </button>
        </header>
    }
}

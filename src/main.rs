mod app;
mod auth;
mod chat;
mod config;
mod error;
mod forms;
mod http;
mod loading;
mod login;
mod message;
mod messages;
mod nav;
mod profile;
mod register;
mod routes;
mod scope;
mod session;
mod state;

use app::*;
use config::Config;
use leptos::*;

fn main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Cannot start: {err}");
            return;
        }
    };
    log::info!("Using api at {}", config.api_base);
    mount_to_body(move || {
        view! { <App config /> }
    })
}

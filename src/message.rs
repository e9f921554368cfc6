use crate::state::Message;
use chrono::{DateTime, Local, TimeZone, Utc};
use leptos::*;
use pulldown_cmark::{CowStr, Event, Parser, Tag};
use std::fmt::Display;

/// Renders message text as markdown. Raw html is shown as text and script-ish
/// link targets are replaced, since the text comes from other users.
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new(text).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        event => event,
    });
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|prefix| scheme.starts_with(prefix))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// `HH:MM` in the given timezone.
pub fn clock<Tz>(timestamp: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.with_timezone(tz).format("%H:%M").to_string()
}

fn initial(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

#[component]
pub fn MessageItem(message: Message) -> impl IntoView {
    let parsed = render_markdown(&message.text);
    let datemsg = clock(&message.timestamp, &Local);
    let avatar = initial(&message.username);
    view! {
        <div class="flex items-start m-5 gap-2.5">
            <div class="flex items-center justify-center w-8 h-8 shrink-0 rounded-full bg-blue-600 text-sm font-semibold text-white">
                {avatar}
            </div>
            <div class="flex flex-col gap-1 max-w-[90%]">
                <div class="flex items-center space-x-2 rtl:space-x-reverse">
                    <span class="text-sm font-semibold text-gray-900 dark:text-white">
                        {message.username}
                    </span>
                    <span class="text-sm font-normal text-gray-500 dark:text-gray-400">
                        {datemsg}
                    </span>
                </div>
                <div class="flex flex-col leading-1.5 p-4 border-gray-200 bg-gray-100 rounded-e-xl rounded-es-xl dark:bg-gray-700">
                    <div
                        class="text-sm font-normal text-gray-900 dark:text-white break-words"
                        inner_html=parsed
                    />
                </div>
            </div>
        </div>
    }
}

use crate::config::Config;
use crate::error::{describe_failure, Action, ApiError};
use crate::forms::ValidationError;
use crate::loading::Loading;
use crate::message::MessageItem;
use crate::messages::{MessageClient, MAX_MESSAGE_LEN};
use crate::nav::Nav;
use crate::routes::Page;
use crate::scope::{poll_every, ViewScope};
use crate::session::Session;
use crate::state::{Message, MessagePage};
use gloo_timers::future::IntervalStream;
use leptos::ev::{KeyboardEvent, SubmitEvent};
use leptos::*;
use leptos_router::Redirect;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Loading,
    Ready,
    Sending,
}

/// How a message reload presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Blocks the list behind the loading indicator and reports failures.
    Initial,
    /// Background reload: no indicator, failures only logged.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Recoverable,
    /// The token was rejected; the session has to go.
    Expired,
}

impl Outcome {
    fn of(err: &ApiError) -> Self {
        if err.is_unauthorized() {
            Self::Expired
        } else {
            Self::Recoverable
        }
    }
}

/// State of the chat view, kept free of any browser types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatModel {
    pub messages: Vec<Message>,
    pub draft: String,
    pub error: Option<String>,
    /// Bumped whenever `messages` changes.
    pub revision: u64,
    loading: bool,
    sending: bool,
}

impl Default for ChatModel {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            draft: String::new(),
            error: None,
            revision: 0,
            loading: true,
            sending: false,
        }
    }
}

impl ChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ChatPhase {
        if self.loading {
            ChatPhase::Loading
        } else if self.sending {
            ChatPhase::Sending
        } else {
            ChatPhase::Ready
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == ChatPhase::Loading
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn can_send(&self) -> bool {
        !self.sending && !self.draft.trim().is_empty()
    }

    pub fn begin_refresh(&mut self, mode: Refresh) {
        if mode == Refresh::Initial {
            self.loading = true;
        }
    }

    /// Whether applying `page` would change anything visible.
    pub fn would_change(&self, page: &MessagePage) -> bool {
        self.loading || self.error.is_some() || self.messages != page.results
    }

    /// Replaces the list with the server's. The server order is kept as is.
    pub fn apply(&mut self, page: MessagePage) {
        self.loading = false;
        self.error = None;
        if self.messages != page.results {
            self.messages = page.results;
            self.revision += 1;
        }
    }

    pub fn fail_refresh(&mut self, mode: Refresh, err: &ApiError) -> Outcome {
        self.loading = false;
        if mode == Refresh::Initial {
            self.error = Some(describe_failure(err, Action::LoadMessages));
        }
        Outcome::of(err)
    }

    /// Validates the draft and marks a send as in flight. Returns the trimmed text.
    pub fn begin_send(&mut self) -> Result<String, ValidationError> {
        if self.sending {
            return Err(ValidationError::SendInFlight);
        }
        let text = self.draft.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let text = text.to_string();
        self.sending = true;
        self.error = None;
        Ok(text)
    }

    pub fn finish_send(&mut self) {
        self.sending = false;
        self.draft.clear();
    }

    pub fn fail_send(&mut self, err: &ApiError) -> Outcome {
        self.sending = false;
        self.error = Some(describe_failure(err, Action::SendMessage));
        Outcome::of(err)
    }
}

/// Derived slices of the model. Each one only notifies when its own value
/// changes, so typing in the draft or a poll that returns the same list
/// leaves the message subtree and the scroll effect alone.
#[derive(Clone, Copy)]
struct ChatSignals {
    revision: Memo<u64>,
    loading: Memo<bool>,
    empty: Memo<bool>,
    error: Memo<Option<String>>,
    messages: Memo<Vec<Message>>,
    draft: Memo<String>,
    sending: Memo<bool>,
    can_send: Memo<bool>,
}

impl ChatSignals {
    fn new(model: RwSignal<ChatModel>) -> Self {
        let messages = create_memo(move |_| model.with(|model| model.messages.clone()));
        Self {
            revision: create_memo(move |_| model.with(|model| model.revision)),
            loading: create_memo(move |_| model.with(ChatModel::is_loading)),
            empty: create_memo(move |_| messages.with(Vec::is_empty)),
            error: create_memo(move |_| model.with(|model| model.error.clone())),
            messages,
            draft: create_memo(move |_| model.with(|model| model.draft.clone())),
            sending: create_memo(move |_| model.with(ChatModel::is_sending)),
            can_send: create_memo(move |_| model.with(ChatModel::can_send)),
        }
    }
}

/// Silent refreshes don't touch the model until a response arrives.
fn start_refresh(model: RwSignal<ChatModel>, mode: Refresh) {
    if mode == Refresh::Initial {
        model.update(|model| model.begin_refresh(mode));
    }
}

fn interval_millis(config: &Config) -> u32 {
    u32::try_from(config.poll_interval.as_millis()).unwrap_or(u32::MAX)
}

#[component]
pub fn Chat() -> impl IntoView {
    let session = expect_context::<Session>();
    let api = expect_context::<MessageClient>();
    let config = expect_context::<Config>();

    if !session.is_authenticated() {
        return view! { <Redirect path=Page::Login.path() /> }.into_view();
    }

    let model = create_rw_signal(ChatModel::new());
    let chat = ChatSignals::new(model);
    let end_ref = create_node_ref::<html::Div>();
    let scope = ViewScope::new();
    on_cleanup({
        let scope = scope.clone();
        move || scope.close()
    });

    let page_size = config.page_size;
    let refresh = {
        let api = api.clone();
        let scope = scope.clone();
        let session = session.clone();
        move |mode: Refresh| {
            let api = api.clone();
            let scope = scope.clone();
            let session = session.clone();
            async move {
                start_refresh(model, mode);
                let Some(result) = scope.run(api.messages(1, page_size)).await else {
                    return;
                };
                match result {
                    Ok(page) => {
                        if model.with_untracked(|model| model.would_change(&page)) {
                            model.update(|model| model.apply(page));
                        }
                    }
                    Err(err) => {
                        warn!("Loading messages failed: {err}");
                        let outcome = model.try_update(|model| model.fail_refresh(mode, &err));
                        if outcome == Some(Outcome::Expired) {
                            session.clear();
                        }
                    }
                }
            }
        }
    };

    spawn_local({
        let refresh = refresh.clone();
        let scope = scope.clone();
        let every = interval_millis(&config);
        async move {
            refresh(Refresh::Initial).await;
            scope
                .run(poll_every(IntervalStream::new(every), move || {
                    refresh(Refresh::Silent)
                }))
                .await;
        }
    });

    let send = move || {
        let text = match model.try_update(ChatModel::begin_send) {
            Some(Ok(text)) => text,
            Some(Err(err)) => {
                debug!("Send skipped: {err}");
                return;
            }
            None => return,
        };
        let api = api.clone();
        let scope = scope.clone();
        let session = session.clone();
        let refresh = refresh.clone();
        spawn_local(async move {
            match scope.run(api.send(&text)).await {
                Some(Ok(_)) => {
                    model.update(ChatModel::finish_send);
                    refresh(Refresh::Silent).await;
                }
                Some(Err(err)) => {
                    warn!("Sending message failed: {err}");
                    if model.try_update(|model| model.fail_send(&err)) == Some(Outcome::Expired) {
                        session.clear();
                    }
                }
                None => {}
            }
        });
    };

    create_effect(move |_| {
        chat.revision.track();
        if let Some(end) = end_ref.get() {
            end.scroll_into_view();
        }
    });

    let on_submit = {
        let send = send.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();
            send();
        }
    };
    let on_keydown = move |ev: KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="h-dvh max-h-dvh flex flex-col w-screen max-w-screen dark:bg-gray-900">
            <Nav />
            <main class="grow flex flex-col overflow-auto">
                {move || {
                    chat.error
                        .get()
                        .map(|error| {
                            view! {
                                <div class="m-4 p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400">
                                    {error}
                                </div>
                            }
                        })
                }}
                {move || {
                    if chat.loading.get() {
                        view! { <Loading /> }.into_view()
                    } else if chat.empty.get() {
                        view! {
                            <p class="m-auto text-sm text-gray-500 dark:text-gray-400">
                                "No messages yet. Start the conversation!"
                            </p>
                        }
                            .into_view()
                    } else {
                        view! {
                            <For
                                each=move || chat.messages.get()
                                key=|message| message.id
                                children=move |message| view! { <MessageItem message /> }
                            />
                        }
                            .into_view()
                    }
                }}
                <div node_ref=end_ref></div>
            </main>
            <form class="w-full" on:submit=on_submit>
                <label for="chat" class="sr-only">
                    "Your message"
                </label>
                <div class="flex items-center px-3 py-2 bg-gray-50 dark:bg-gray-700">
                    <textarea
                        id="chat"
                        rows="1"
                        maxlength=MAX_MESSAGE_LEN.to_string()
                        class="block mx-4 p-2.5 w-full text-sm text-gray-900 bg-white rounded-lg border border-gray-300 focus:ring-blue-500 focus:border-blue-500 dark:bg-gray-800 dark:border-gray-600 dark:placeholder-gray-400 dark:text-white resize-none"
                        placeholder="Your message..."
                        prop:value=move || chat.draft.get()
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            model.update(|model| model.draft = value);
                        }
                        on:keydown=on_keydown
                        disabled=move || chat.sending.get()
                    ></textarea>
                    <button
                        type="submit"
                        class="inline-flex justify-center p-2 text-blue-600 rounded-full cursor-pointer hover:bg-blue-100 dark:text-blue-500 dark:hover:bg-gray-600 disabled:cursor-not-allowed disabled:opacity-50"
                        disabled=move || !chat.can_send.get()
                    >
                        {move || if chat.sending.get() { "Sending..." } else { "Send" }}
                    </button>
                </div>
            </form>
        </div>
    }
    .into_view()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;
    use std::cell::Cell;
    use std::rc::Rc;

    fn message(id: u64, text: &str) -> Message {
        Message {
            id,
            username: "alice".to_string(),
            text: text.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        }
    }

    fn page(messages: Vec<Message>) -> MessagePage {
        MessagePage {
            count: messages.len() as u64,
            results: messages,
            ..MessagePage::default()
        }
    }

    #[test]
    fn starts_loading_then_ready() {
        let mut model = ChatModel::new();
        assert_eq!(model.phase(), ChatPhase::Loading);
        model.apply(page(vec![message(1, "hi")]));
        assert_eq!(model.phase(), ChatPhase::Ready);
        assert_eq!(model.revision, 1);
    }

    #[test]
    fn identical_poll_changes_nothing() {
        let mut model = ChatModel::new();
        let first = page(vec![message(1, "hi"), message(2, "there")]);
        model.apply(first.clone());
        let before = model.clone();

        assert!(!model.would_change(&first));
        model.apply(first);
        assert_eq!(model, before);
        assert_eq!(model.messages.len(), 2);
    }

    #[test]
    fn list_is_replaced_not_merged() {
        let mut model = ChatModel::new();
        model.apply(page(vec![message(1, "a"), message(2, "b")]));
        model.apply(page(vec![message(2, "b"), message(3, "c")]));
        let ids: Vec<u64> = model.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(model.revision, 2);
    }

    #[test]
    fn silent_refresh_keeps_indicator_off() {
        let mut model = ChatModel::new();
        model.apply(page(vec![]));
        model.begin_refresh(Refresh::Silent);
        assert_eq!(model.phase(), ChatPhase::Ready);
        model.begin_refresh(Refresh::Initial);
        assert_eq!(model.phase(), ChatPhase::Loading);
    }

    #[test]
    fn failures_only_surface_on_initial_load() {
        let err = ApiError::Network("offline".into());

        let mut model = ChatModel::new();
        assert_eq!(
            model.fail_refresh(Refresh::Initial, &err),
            Outcome::Recoverable
        );
        assert_eq!(model.error.as_deref(), Some("Could not load messages"));
        assert_eq!(model.phase(), ChatPhase::Ready);

        let mut model = ChatModel::new();
        model.apply(page(vec![]));
        model.fail_refresh(Refresh::Silent, &err);
        assert_eq!(model.error, None);
    }

    #[test]
    fn error_clears_on_next_success() {
        let mut model = ChatModel::new();
        model.fail_refresh(Refresh::Initial, &ApiError::Network("offline".into()));
        let empty = page(vec![]);
        assert!(model.would_change(&empty));
        model.apply(empty);
        assert_eq!(model.error, None);
    }

    #[test]
    fn unauthorized_expires() {
        let mut model = ChatModel::new();
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, "");
        assert_eq!(model.fail_refresh(Refresh::Silent, &err), Outcome::Expired);
        model.draft = "hi".to_string();
        model.begin_send().unwrap();
        assert_eq!(model.fail_send(&err), Outcome::Expired);
    }

    #[test]
    fn blank_draft_is_not_sent() {
        let mut model = ChatModel::new();
        model.draft = "   \n\t".to_string();
        assert!(!model.can_send());
        assert_eq!(model.begin_send(), Err(ValidationError::EmptyMessage));
        assert!(!model.is_sending());
    }

    #[test]
    fn send_cycle() {
        let mut model = ChatModel::new();
        model.apply(page(vec![]));
        model.draft = "  hello  ".to_string();
        assert_eq!(model.begin_send().as_deref(), Ok("hello"));
        assert_eq!(model.phase(), ChatPhase::Sending);
        assert!(!model.can_send());
        assert_eq!(model.begin_send(), Err(ValidationError::SendInFlight));

        model.finish_send();
        assert_eq!(model.phase(), ChatPhase::Ready);
        assert!(model.draft.is_empty());
    }

    #[test]
    fn single_and_max_length_drafts_are_sendable() {
        let mut model = ChatModel::new();
        model.draft = "x".to_string();
        assert_eq!(model.begin_send().map(|t| t.len()), Ok(1));
        model.finish_send();

        model.draft = "y".repeat(MAX_MESSAGE_LEN);
        assert_eq!(model.begin_send().map(|t| t.len()), Ok(MAX_MESSAGE_LEN));
    }

    #[test]
    fn rejected_send_keeps_draft() {
        let mut model = ChatModel::new();
        model.apply(page(vec![]));
        model.draft = "z".repeat(MAX_MESSAGE_LEN + 1);
        model.begin_send().unwrap();
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"text": ["Ensure this field has no more than 1000 characters."]}"#,
        );
        assert_eq!(model.fail_send(&err), Outcome::Recoverable);
        assert_eq!(
            model.error.as_deref(),
            Some("Ensure this field has no more than 1000 characters.")
        );
        assert_eq!(model.draft.len(), MAX_MESSAGE_LEN + 1);
        assert_eq!(model.phase(), ChatPhase::Ready);
    }

    #[test]
    fn quiet_updates_do_not_rerun_list_effects() {
        let runtime = create_runtime();
        let model = create_rw_signal(ChatModel::new());
        model.update(|model| model.apply(page(vec![message(1, "hi")])));
        let chat = ChatSignals::new(model);

        let scrolls = Rc::new(Cell::new(0));
        let renders = Rc::new(Cell::new(0));
        create_effect({
            let scrolls = scrolls.clone();
            move |_| {
                chat.revision.track();
                scrolls.set(scrolls.get() + 1);
            }
        });
        create_effect({
            let renders = renders.clone();
            move |_| {
                chat.messages.track();
                chat.loading.track();
                chat.empty.track();
                renders.set(renders.get() + 1);
            }
        });
        assert_eq!((scrolls.get(), renders.get()), (1, 1));

        start_refresh(model, Refresh::Silent);
        model.update(|model| model.draft = "h".to_string());
        model.update(|model| model.draft = "hey".to_string());
        model.update(|model| {
            model.begin_send().unwrap();
        });
        model.update(ChatModel::finish_send);
        let same = page(vec![message(1, "hi")]);
        if model.with_untracked(|model| model.would_change(&same)) {
            model.update(|model| model.apply(same));
        }
        model.update(|model| {
            model.fail_refresh(Refresh::Silent, &ApiError::Network("offline".into()));
        });
        assert_eq!((scrolls.get(), renders.get()), (1, 1));
        assert_eq!(chat.draft.get_untracked(), "");

        model.update(|model| model.apply(page(vec![message(1, "hi"), message(2, "yo")])));
        assert_eq!(scrolls.get(), 2);
        assert_eq!(renders.get(), 2);

        runtime.dispose();
    }

    #[test]
    fn only_initial_refresh_shows_the_indicator() {
        let runtime = create_runtime();
        let model = create_rw_signal(ChatModel::new());
        model.update(|model| model.apply(page(vec![])));
        let notified = Rc::new(Cell::new(0));
        create_effect({
            let notified = notified.clone();
            move |_| {
                model.track();
                notified.set(notified.get() + 1);
            }
        });

        start_refresh(model, Refresh::Silent);
        assert_eq!(notified.get(), 1);
        start_refresh(model, Refresh::Initial);
        assert_eq!(notified.get(), 2);
        assert!(model.with_untracked(ChatModel::is_loading));

        runtime.dispose();
    }

    #[test]
    fn interval_conversion() {
        let config = Config::with_base("http://localhost/").unwrap();
        assert_eq!(interval_millis(&config), 3000);
    }
}

use crate::error::ApiError;
use crate::http::{HttpClient, ReqwestTransport, Transport};
use crate::state::{Message, MessageListing, MessagePage, NewMessage};

const MESSAGES: &str = "api/messages/";

/// Longest message the backend accepts, in characters.
pub const MAX_MESSAGE_LEN: usize = 1000;

pub struct MessageClient<T = ReqwestTransport> {
    http: HttpClient<T>,
}

impl<T> Clone for MessageClient<T> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
        }
    }
}

impl<T: Transport> MessageClient<T> {
    pub fn new(http: HttpClient<T>) -> Self {
        Self { http }
    }

    /// Fetches one page. Both listing shapes come back as a `MessagePage`.
    pub async fn messages(&self, page: u32, page_size: u32) -> Result<MessagePage, ApiError> {
        let query = [
            ("page", page.max(1).to_string()),
            ("page_size", page_size.to_string()),
        ];
        let listing: MessageListing = self.http.get(MESSAGES, &query).await?;
        Ok(listing.into_page())
    }

    pub async fn send(&self, text: &str) -> Result<Message, ApiError> {
        let payload = NewMessage {
            text: text.to_string(),
        };
        self.http.post(MESSAGES, &payload).await
    }
}

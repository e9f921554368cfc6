use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    pub id: u64,
    #[serde(alias = "author", deserialize_with = "author_name")]
    pub username: String,
    pub text: String,
    #[serde(alias = "created_at", deserialize_with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Accepts ISO 8601 with or without an offset. Servers running without
/// timezone support send naive times, which are taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match raw.parse::<DateTime<FixedOffset>>() {
        Ok(stamp) => Ok(stamp.with_timezone(&Utc)),
        Err(err) => raw
            .parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|_| err),
    }
}

fn utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

// Some backend revisions send the author as a bare username, others nest the
// whole member record.
#[derive(Deserialize)]
#[serde(untagged)]
enum Author {
    Name(String),
    Member { username: String },
}

fn author_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Author::deserialize(deserializer)? {
        Author::Name(name) | Author::Member { username: name } => name,
    })
}

/// One page of messages, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessagePage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Message>,
}

/// Wire shape of the message listing: older backends return a bare array,
/// newer ones a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageListing {
    Plain(Vec<Message>),
    Page(MessagePage),
}

impl MessageListing {
    pub fn into_page(self) -> MessagePage {
        match self {
            Self::Plain(results) => MessagePage {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
            Self::Page(page) => page,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewMessage {
    pub text: String,
}

/// Body of a login or register response. Register may omit the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

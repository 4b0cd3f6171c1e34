use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// Identifier assigned to a book by the store.
pub type BookId = u32;

/// A catalogue entry.
///
/// Decoding is lenient: absent or `null` fields fall back to their zero value
/// and unknown fields are ignored. No semantic validation happens here, so an
/// empty title or a non-numeric publication year is stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct Book {
    #[serde(deserialize_with = "lenient::id")]
    pub id: BookId,
    #[serde(deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub author: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub isbn: String,
    /// Kept as text; values such as "c. 1850" are legal.
    #[serde(deserialize_with = "lenient::or_default")]
    pub publication_year: String,
    pub genre: Option<String>,
    pub price: Option<f64>,
    #[serde(with = "lenient::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "lenient::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Default for Book {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            author: String::new(),
            isbn: String::new(),
            publication_year: String::new(),
            genre: None,
            price: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// Request body could not be read as a book.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed book payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("empty book payload")]
    Empty,
}

impl Book {
    /// Decode a book from the first JSON value in `payload`.
    ///
    /// Bytes after that value are ignored, a repeated key keeps its last
    /// value and a bare `null` yields the default book.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let value = serde_json::Deserializer::from_slice(payload)
            .into_iter::<Value>()
            .next()
            .ok_or(DecodeError::Empty)??;

        match value {
            Value::Null => Ok(Book::default()),
            value => Ok(serde_json::from_value(value)?),
        }
    }
}

/// Body returned after a successful delete
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedBook {
    pub message: String,
    pub book: Book,
}

mod lenient {
    use serde::{Deserialize, Deserializer};

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Any unsigned integer is accepted; ids outside `u32` read as 0 since
    /// the store assigns ids anyway.
    pub fn id<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<u64>::deserialize(deserializer)?.unwrap_or_default();
        Ok(u32::try_from(raw).unwrap_or_default())
    }

    /// RFC 3339 on the wire; `null` decodes to the epoch.
    pub mod timestamp {
        use serde::{Deserializer, Serializer};
        use time::OffsetDateTime;

        pub fn serialize<S: Serializer>(
            value: &OffsetDateTime,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            time::serde::rfc3339::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<OffsetDateTime, D::Error> {
            Ok(time::serde::rfc3339::option::deserialize(deserializer)?
                .unwrap_or(OffsetDateTime::UNIX_EPOCH))
        }
    }
}

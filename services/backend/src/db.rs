use std::collections::HashMap;
use std::sync::Arc;

use futures_util::TryStreamExt;
use mongodb::Client;
use mongodb::bson::{self, Bson, Document, oid::ObjectId};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::secrets::{DATABASE_NAME, DATABASE_URL, SecretManager};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not available. Check DATABASE_URL and DATABASE_NAME environment variables")]
    NotInitialized,

    #[error("unsupported database scheme: {0}")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("could not serialize document: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Query tree understood by every backend.
///
/// Top-level fields are compared with BSON equality; `Matches` is a
/// case-insensitive regular expression applied to string fields only.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Bson),
    Matches { field: String, pattern: String },
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn matches(field: &str, pattern: &str) -> Self {
        Filter::Matches {
            field: field.to_string(),
            pattern: pattern.to_string(),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        match self {
            Filter::Eq(field, value) => {
                document.insert(field.clone(), value.clone());
            }
            Filter::Matches { field, pattern } => {
                let mut regex = Document::new();
                regex.insert("$regex", pattern.clone());
                regex.insert("$options", "i");
                document.insert(field.clone(), regex);
            }
            // mongo rejects empty $and/$or arrays
            Filter::Or(filters) if !filters.is_empty() => {
                document.insert("$or", to_documents(filters));
            }
            Filter::And(filters) if !filters.is_empty() => {
                document.insert("$and", to_documents(filters));
            }
            Filter::Or(_) | Filter::And(_) => {}
        }
        document
    }

    fn compile(&self) -> Result<Matcher, DbError> {
        Ok(match self {
            Filter::Eq(field, value) => Matcher::Eq(field.clone(), value.clone()),
            Filter::Matches { field, pattern } => Matcher::Regex(
                field.clone(),
                RegexBuilder::new(pattern).case_insensitive(true).build()?,
            ),
            Filter::Or(filters) => Matcher::Or(compile_all(filters)?),
            Filter::And(filters) => Matcher::And(compile_all(filters)?),
        })
    }
}

fn to_documents(filters: &[Filter]) -> Vec<Document> {
    filters.iter().map(Filter::to_document).collect()
}

fn compile_all(filters: &[Filter]) -> Result<Vec<Matcher>, DbError> {
    filters.iter().map(Filter::compile).collect()
}

enum Matcher {
    Eq(String, Bson),
    Regex(String, Regex),
    Or(Vec<Matcher>),
    And(Vec<Matcher>),
}

impl Matcher {
    fn accepts(&self, document: &Document) -> bool {
        match self {
            Matcher::Eq(field, value) => document.get(field).unwrap_or(&Bson::Null) == value,
            Matcher::Regex(field, regex) => match document.get(field) {
                Some(Bson::String(text)) => regex.is_match(text),
                _ => false,
            },
            // an empty $or matches nothing, an empty $and everything
            Matcher::Or(matchers) => matchers.iter().any(|m| m.accepts(document)),
            Matcher::And(matchers) => matchers.iter().all(|m| m.accepts(document)),
        }
    }
}

/// Process-local document store selected with a `memory://` URL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

#[derive(Clone)]
enum Backend {
    Mongo(mongodb::Database),
    Memory(MemoryStore),
}

#[derive(Clone)]
pub struct Database {
    name: String,
    backend: Backend,
}

impl Database {
    /// Opens the store named by `DATABASE_URL` / `DATABASE_NAME`.
    ///
    /// The MongoDB driver connects lazily, so an unreachable server only
    /// shows up on the first query.
    pub async fn new(secrets: &SecretManager) -> Result<Self, DbError> {
        let (Some(url), Some(name)) = (secrets.get(DATABASE_URL), secrets.get(DATABASE_NAME))
        else {
            return Err(DbError::NotInitialized);
        };
        Self::connect(url, name).await
    }

    pub async fn connect(url: &str, name: &str) -> Result<Self, DbError> {
        let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or("");
        match scheme {
            "mongodb" | "mongodb+srv" => {
                let client = Client::with_uri_str(url).await?;
                Ok(Self {
                    name: name.to_string(),
                    backend: Backend::Mongo(client.database(name)),
                })
            }
            "memory" => Ok(Self::in_memory(name)),
            other => Err(DbError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn in_memory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            backend: Backend::Memory(MemoryStore::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts `model` stamped with `created_at`/`updated_at` and returns
    /// the assigned id as a string.
    pub async fn create_document<T: Serialize>(
        &self,
        collection: &str,
        model: &T,
    ) -> Result<String, DbError> {
        let mut document = bson::to_document(model)?;
        let now = bson::DateTime::now();
        document.insert("created_at", now);
        document.insert("updated_at", now);

        let id = match &self.backend {
            Backend::Mongo(db) => {
                let result = db
                    .collection::<Document>(collection)
                    .insert_one(document)
                    .await?;
                match result.inserted_id {
                    Bson::ObjectId(oid) => oid.to_hex(),
                    Bson::String(id) => id,
                    other => other.to_string(),
                }
            }
            Backend::Memory(store) => {
                let oid = ObjectId::new();
                document.insert("_id", oid);
                let mut collections = store.collections.write().await;
                collections
                    .entry(collection.to_string())
                    .or_default()
                    .push(document);
                oid.to_hex()
            }
        };
        debug!("inserted {} into {}", id, collection);
        Ok(id)
    }

    /// Returns documents matching `filter` in store order. A limit of zero
    /// means no limit.
    pub async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<Document>, DbError> {
        let limit = limit.filter(|limit| *limit > 0);
        match &self.backend {
            Backend::Mongo(db) => {
                let coll = db.collection::<Document>(collection);
                let mut find = coll.find(filter.to_document());
                if let Some(limit) = limit {
                    find = find.limit(i64::from(limit));
                }
                let cursor = find.await?;
                Ok(cursor.try_collect().await?)
            }
            Backend::Memory(store) => {
                let matcher = filter.compile()?;
                let collections = store.collections.read().await;
                let documents = collections
                    .get(collection)
                    .map(|documents| documents.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .filter(|document| matcher.accepts(document))
                    .take(limit.map_or(usize::MAX, |limit| limit as usize))
                    .cloned()
                    .collect();
                Ok(documents)
            }
        }
    }

    pub async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        match &self.backend {
            Backend::Mongo(db) => Ok(db.list_collection_names().await?),
            Backend::Memory(store) => {
                let mut names: Vec<String> = store.collections.read().await.keys().cloned().collect();
                names.sort();
                Ok(names)
            }
        }
    }
}

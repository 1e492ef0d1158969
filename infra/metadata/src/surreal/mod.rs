//! [`MetadataStore`] on [SurrealDB](https://surrealdb.com).
//!
//! Supports `mem://`, `rocksdb://`, `ws://` and `http://` through the `any` engine.
//! Entries live in the `entry` table (unique index on `eid`, secondary index on
//! `parent_id`); the index is the single row of `ns_index`.

mod records;
mod schema;

use crate::error::{MetadataError, MetadataErrorExt};
use crate::store::MetadataStore;
use loft_domain::constants::INDEX_ID;
use loft_domain::{Entry, Index};
use records::{EntryRecord, IndexRecord, encode_entries, to_i64};
use schema::CONFLICT_MARKER;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tracing::{debug, info, instrument, warn};

const HEALTH_ATTEMPTS: u32 = 3;

#[derive(Debug)]
struct SurrealInner {
    db: Surreal<Any>,
    ns: String,
    database: String,
}

impl Drop for SurrealInner {
    fn drop(&mut self) {
        info!(ns = %self.ns, db = %self.database, "SurrealDB metadata session dropped");
    }
}

/// `SurrealDB`-backed metadata store. Cheap to clone.
///
/// ```rust
/// use loft_metadata::{MetadataError, MetadataStore, SurrealMetadataStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), MetadataError> {
///     let store = SurrealMetadataStore::builder()
///         .url("mem://")
///         .session("loft", "namespace")
///         .connect()
///         .await?;
///
///     assert!(store.get_index().await.unwrap_err().is_not_found());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SurrealMetadataStore {
    inner: Arc<SurrealInner>,
}

impl SurrealMetadataStore {
    pub fn builder() -> SurrealMetadataStoreBuilder {
        SurrealMetadataStoreBuilder::new()
    }

    async fn run(&self, query: &str, bindings: Bindings, what: &'static str) -> Result<(), MetadataError> {
        let mut request = self.inner.db.query(query);
        for (name, value) in bindings.0 {
            request = match value {
                Binding::Str(v) => request.bind((name, v)),
                Binding::Int(v) => request.bind((name, v)),
                Binding::OptInt(v) => request.bind((name, v)),
                Binding::List(v) => request.bind((name, v)),
                Binding::Entry(v) => request.bind((name, *v)),
            };
        }

        request.await.context(what)?.check().map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Turns a failed transaction into [`MetadataError::VersionConflict`] when a guard
    /// fired or the guarded revision moved; otherwise returns the original error.
    async fn classify(
        &self,
        err: MetadataError,
        expected_index: Option<u64>,
        entry: Option<(&str, Option<u64>)>,
    ) -> MetadataError {
        if err.to_string().contains(CONFLICT_MARKER) {
            return MetadataError::conflict(err.to_string());
        }

        if let Some(expected) = expected_index
            && let Ok(index) = self.get_index().await
            && index.version != expected
        {
            return MetadataError::conflict(format!(
                "index is at version {}, commit expected {expected}",
                index.version
            ));
        }

        if let Some((id, expected)) = entry {
            let stored = match self.get_entry(id).await {
                Ok(e) => Some(e.version),
                Err(e) if e.is_not_found() => None,
                Err(_) => return err,
            };
            if stored != expected {
                return MetadataError::conflict(format!("entry {id} moved to {stored:?}"));
            }
        }

        err
    }

    async fn commit_entry(&self, entry: &Entry, index: &Index, what: &'static str) -> Result<(), MetadataError> {
        let expected = index.version.saturating_sub(1);
        let entry_expected = (entry.version > 1).then(|| entry.version - 1);

        let bindings = Bindings::default()
            .str("singleton", INDEX_ID)
            .int("expected", to_i64(expected, "index version")?)
            .int("next", to_i64(index.version, "index version")?)
            .str("entries", encode_entries(index)?)
            .str("eid", entry.id.clone())
            .opt_int("entry_expected", entry_expected.map(|v| to_i64(v, "version")).transpose()?)
            .entry("entry", EntryRecord::try_from(entry)?);

        match self.run(schema::COMMIT_ENTRY_AND_INDEX, bindings, what).await {
            Ok(()) => {
                debug!(id = %entry.id, version = index.version, "{what}");
                Ok(())
            },
            Err(err) => Err(self.classify(err, Some(expected), Some((&entry.id, entry_expected))).await),
        }
    }
}

impl MetadataStore for SurrealMetadataStore {
    async fn get_index(&self) -> Result<Index, MetadataError> {
        let records = self
            .inner
            .db
            .query(schema::SELECT_INDEX)
            .bind(("singleton", INDEX_ID))
            .await
            .context("Loading index")?
            .take::<Vec<IndexRecord>>(0)
            .context("Parsing index")?;

        records
            .into_iter()
            .next()
            .ok_or_else(|| MetadataError::not_found("index"))
            .and_then(Index::try_from)
    }

    async fn get_entry(&self, id: &str) -> Result<Entry, MetadataError> {
        let records = self
            .inner
            .db
            .query(schema::SELECT_ENTRY)
            .bind(("eid", id.to_owned()))
            .await
            .context("Loading entry")?
            .take::<Vec<EntryRecord>>(0)
            .context("Parsing entry")?;

        records
            .into_iter()
            .next()
            .ok_or_else(|| MetadataError::not_found(format!("entry {id}")))
            .and_then(Entry::try_from)
    }

    async fn list_entries_by_parent(&self, parent_id: &str) -> Result<Vec<Entry>, MetadataError> {
        self.inner
            .db
            .query(schema::SELECT_CHILDREN)
            .bind(("parent_id", parent_id.to_owned()))
            .await
            .context("Listing children")?
            .take::<Vec<EntryRecord>>(0)
            .context("Parsing children")?
            .into_iter()
            .map(Entry::try_from)
            .collect()
    }

    #[instrument(skip_all, fields(id = %entry.id, version = index.version))]
    async fn commit_entry_and_index(&self, entry: &Entry, index: &Index) -> Result<(), MetadataError> {
        self.commit_entry(entry, index, "Committed entry and index").await
    }

    #[instrument(skip_all, fields(id = %entry.id, version = index.version))]
    async fn commit_entry_rename(&self, entry: &Entry, index: &Index) -> Result<(), MetadataError> {
        if entry.version <= 1 {
            return Err(MetadataError::Validation {
                message: "a renamed entry must carry a bumped version".into(),
                context: Some(entry.id.clone().into()),
            });
        }
        self.commit_entry(entry, index, "Committed rename").await
    }

    #[instrument(skip_all, fields(removed = ids.len(), version = index.version))]
    async fn delete_entries_and_index(&self, ids: &[String], index: &Index) -> Result<(), MetadataError> {
        let expected = index.version.saturating_sub(1);
        let bindings = Bindings::default()
            .str("singleton", INDEX_ID)
            .int("expected", to_i64(expected, "index version")?)
            .int("next", to_i64(index.version, "index version")?)
            .str("entries", encode_entries(index)?)
            .list("ids", ids.to_vec());

        match self.run(schema::DELETE_ENTRIES_AND_INDEX, bindings, "Deleting entries").await {
            Ok(()) => {
                debug!("Committed deletion");
                Ok(())
            },
            Err(err) => Err(self.classify(err, Some(expected), None).await),
        }
    }

    async fn update_entry(&self, entry: &Entry) -> Result<(), MetadataError> {
        let entry_expected = entry.version.saturating_sub(1);
        let bindings = Bindings::default()
            .str("eid", entry.id.clone())
            .opt_int("entry_expected", Some(to_i64(entry_expected, "version")?))
            .entry("entry", EntryRecord::try_from(entry)?);

        match self.run(schema::UPDATE_ENTRY, bindings, "Updating entry").await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.classify(err, None, Some((&entry.id, Some(entry_expected)))).await),
        }
    }

    #[instrument(skip_all, fields(root = %root.id))]
    async fn initialize(&self, root: &Entry, index: &Index) -> Result<bool, MetadataError> {
        let bindings = Bindings::default()
            .str("singleton", INDEX_ID)
            .int("next", to_i64(index.version, "index version")?)
            .str("entries", encode_entries(index)?)
            .entry("entry", EntryRecord::try_from(root)?);

        match self.run(schema::INITIALIZE, bindings, "Bootstrapping namespace").await {
            Ok(()) => {
                info!("Namespace bootstrapped");
                Ok(true)
            },
            Err(err) => match self.get_index().await {
                Ok(_) => Ok(false),
                Err(_) => Err(err),
            },
        }
    }
}

enum Binding {
    Str(String),
    Int(i64),
    OptInt(Option<i64>),
    List(Vec<String>),
    Entry(Box<EntryRecord>),
}

#[derive(Default)]
struct Bindings(Vec<(&'static str, Binding)>);

impl Bindings {
    fn str(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.0.push((name, Binding::Str(value.into())));
        self
    }

    fn int(mut self, name: &'static str, value: i64) -> Self {
        self.0.push((name, Binding::Int(value)));
        self
    }

    fn opt_int(mut self, name: &'static str, value: Option<i64>) -> Self {
        self.0.push((name, Binding::OptInt(value)));
        self
    }

    fn list(mut self, name: &'static str, value: Vec<String>) -> Self {
        self.0.push((name, Binding::List(value)));
        self
    }

    fn entry(mut self, name: &'static str, value: EntryRecord) -> Self {
        self.0.push((name, Binding::Entry(Box::new(value))));
        self
    }
}

/// A fluent builder for connecting a [`SurrealMetadataStore`].
#[must_use = "builders do nothing unless you call .connect()"]
#[derive(Debug, Default)]
pub struct SurrealMetadataStoreBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
}

impl SurrealMetadataStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name.
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Add root credentials to the connection.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Connects, waits for the engine to report healthy, signs in, selects the
    /// session and defines the schema.
    ///
    /// Health checks are retried with exponential backoff starting at 500ms.
    ///
    /// # Errors
    /// * [`MetadataError::Validation`] if URL, namespace or database are missing.
    /// * [`MetadataError::Unavailable`] if the engine fails to start, stays unhealthy
    ///   or rejects the credentials.
    /// * [`MetadataError::Surreal`] if session activation or schema definition fails.
    #[instrument(skip(self), fields(url = self.url, ns = self.ns, db = self.db))]
    pub async fn connect(self) -> Result<SurrealMetadataStore, MetadataError> {
        let url = self.url.ok_or(MetadataError::Validation { message: "URL is required".into(), context: None })?;
        let ns = self
            .ns
            .ok_or(MetadataError::Validation { message: "Namespace is required".into(), context: None })?;
        let database = self
            .db
            .ok_or(MetadataError::Validation { message: "Database is required".into(), context: None })?;

        let db = connect(&url).await.map_err(|e| MetadataError::Unavailable {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=HEALTH_ATTEMPTS {
            if db.health().await.is_ok() {
                break;
            }
            if attempt == HEALTH_ATTEMPTS {
                return Err(MetadataError::Unavailable {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.into()),
                });
            }
            warn!(attempt, ?delay, "Metadata backend not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        if let Some((username, password)) = self.auth {
            db.signin(Root { username, password }).await.map_err(|e| MetadataError::Unavailable {
                message: e.to_string().into(),
                context: Some(format!("Signing in to {url}").into()),
            })?;
        }

        db.use_ns(&ns).use_db(&database).await.context("Activating session")?;
        db.query(schema::DEFINE_SCHEMA)
            .await
            .context("Defining schema")?
            .check()
            .map_err(surrealdb::Error::from)?;

        let version = db.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(namespace = %ns, database = %database, %version, "SurrealDB metadata store connected");

        Ok(SurrealMetadataStore { inner: Arc::new(SurrealInner { db, ns, database }) })
    }
}

use crate::error::MetadataError;
use loft_domain::{Entry, Index};

/// Transactional persistence of the index record and entry records.
///
/// Every method that takes an [`Index`] is conditional: it applies only if the
/// stored index version equals `index.version - 1`, and it is all-or-nothing.
/// Entry writes carry their own guard: the stored entry version must equal
/// `entry.version - 1`, and an entry at version 1 must not exist yet.
///
/// Guard failures are reported as [`MetadataError::VersionConflict`] and are
/// never retried by the store.
pub trait MetadataStore: Send + Sync + 'static {
    /// Strongly consistent read of the index.
    ///
    /// # Errors
    /// [`MetadataError::NotFound`] before [`initialize`](Self::initialize) ran.
    fn get_index(&self) -> impl Future<Output = Result<Index, MetadataError>> + Send;

    fn get_entry(&self, id: &str) -> impl Future<Output = Result<Entry, MetadataError>> + Send;

    /// Children of `parent_id`, in an order that is stable between calls.
    fn list_entries_by_parent(
        &self,
        parent_id: &str,
    ) -> impl Future<Output = Result<Vec<Entry>, MetadataError>> + Send;

    /// Upserts `entry` and replaces the index.
    fn commit_entry_and_index(
        &self,
        entry: &Entry,
        index: &Index,
    ) -> impl Future<Output = Result<(), MetadataError>> + Send;

    /// Rewrites the name and parent of an existing entry and replaces the index.
    fn commit_entry_rename(
        &self,
        entry: &Entry,
        index: &Index,
    ) -> impl Future<Output = Result<(), MetadataError>> + Send;

    /// Deletes every entry in `ids` and replaces the index.
    fn delete_entries_and_index(
        &self,
        ids: &[String],
        index: &Index,
    ) -> impl Future<Output = Result<(), MetadataError>> + Send;

    /// Conditional update of a single existing entry. The index is untouched.
    fn update_entry(&self, entry: &Entry) -> impl Future<Output = Result<(), MetadataError>> + Send;

    /// Creates the root entry and the first index together when no index exists.
    /// Returns `false` if the namespace was already initialized.
    fn initialize(
        &self,
        root: &Entry,
        index: &Index,
    ) -> impl Future<Output = Result<bool, MetadataError>> + Send;
}

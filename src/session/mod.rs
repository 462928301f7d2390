//! Sessions as the store sees them: an identifier plus its bins.

mod value;
pub use value::{Bins, Value};

/// What a [`SessionStore::set`](crate::store::SessionStore::set) call should do
/// with a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intent<'a> {
    /// Persist the full field mapping, replacing whatever is stored.
    Write(&'a Bins),
    /// Remove the stored record.
    Delete,
}

/// A server-side session: an opaque identifier and its named fields.
///
/// A session with no fields, or one that has been [destroyed](Session::destroy),
/// is deleted from the store on the next `set` rather than persisted empty.
///
/// # Example
///
/// ```rust
/// use kvsession::{Intent, Session};
///
/// let mut session = Session::empty("f3a9c1");
/// session.insert("user_id", 42);
/// session.insert("theme", "dark");
/// assert!(matches!(session.intent(), Intent::Write(bins) if bins.len() == 2));
///
/// session.destroy();
/// assert_eq!(session.intent(), Intent::Delete);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    id: String,
    bins: Bins,
    destroyed: bool,
}

impl Session {
    /// Creates a session from its identifier and stored bins.
    pub fn new(id: impl Into<String>, bins: Bins) -> Self {
        Self {
            id: id.into(),
            bins,
            destroyed: false,
        }
    }

    /// Creates a session with no fields.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Bins::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bins(&self) -> &Bins {
        &self.bins
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bins.get(name)
    }

    /// Sets a field, returning its previous value.
    ///
    /// Writing to a destroyed session revives it.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.destroyed = false;
        self.bins.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bins.remove(name)
    }

    pub fn clear(&mut self) {
        self.bins.clear();
    }

    /// Marks the session for deletion regardless of its fields.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns the field mapping to persist, or `None` if the session should
    /// be removed from the store.
    pub fn data(&self) -> Option<&Bins> {
        match self.intent() {
            Intent::Write(bins) => Some(bins),
            Intent::Delete => None,
        }
    }

    pub fn intent(&self) -> Intent<'_> {
        // A record with no bins cannot exist in the database.
        if self.destroyed || self.bins.is_empty() {
            Intent::Delete
        } else {
            Intent::Write(&self.bins)
        }
    }

    pub fn into_bins(self) -> Bins {
        self.bins
    }
}

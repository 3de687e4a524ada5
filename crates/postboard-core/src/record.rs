//! Record lifecycle shared by every entity kept in a sharded store

use chrono::{DateTime, Utc};
use postboard_types::{Comment, Post, User};

/// Bookkeeping the store needs from a value: its key, creation time and
/// soft-delete stamp. Business fields are never inspected.
pub trait Record: Clone + Send + Sync + 'static {
    fn key(&self) -> &str;

    /// Stamp id and creation time. Called once, on insert.
    fn assign(&mut self, id: String, created_at: DateTime<Utc>);

    fn created_at(&self) -> DateTime<Utc>;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

/// Outcome of a point lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// The record exists but is soft-deleted. Callers treat this as a
    /// retrieval failure.
    Deleted(T),
    NotFound,
}

impl<T: Record> Lookup<T> {
    pub fn from_stored(stored: Option<T>) -> Self {
        match stored {
            Some(record) if record.is_live() => Lookup::Found(record),
            Some(record) => Lookup::Deleted(record),
            None => Lookup::NotFound,
        }
    }
}

impl<T> Lookup<T> {
    /// The live record, if any
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(record) => Some(record),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(record) => Lookup::Found(f(record)),
            Lookup::Deleted(record) => Lookup::Deleted(f(record)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

macro_rules! impl_record {
    ($ty:ty) => {
        impl Record for $ty {
            fn key(&self) -> &str {
                &self.id
            }

            fn assign(&mut self, id: String, created_at: DateTime<Utc>) {
                self.id = id;
                self.created_at = created_at;
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
                self.deleted_at = at;
            }
        }
    };
}

impl_record!(User);
impl_record!(Post);
impl_record!(Comment);

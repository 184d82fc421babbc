//! Persistence: bounded in-memory history and the optional Postgres archive.

pub mod history {
    pub use crate::history::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}

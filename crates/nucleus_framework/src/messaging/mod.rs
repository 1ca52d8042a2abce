//! Chat output helpers built on top of [`Messenger`](crate::host::Messenger).

mod paginator;

pub use paginator::{ChatPaginator, PaginatorEntry};

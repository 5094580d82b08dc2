//! Request orchestration for the learning-record store client.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Turns validated calls from [`protocol`] into exchanges
//! through a [`protocol::Transport`], follows statement continuations, and
//! delivers outcomes either as futures or to completion handlers. The
//! transport itself is injected; this crate never opens a connection.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`dispatcher`] | [`RequestDispatcher`]: one descriptor, one round trip |
//! | [`walker`] | [`PaginationWalker`]: sequential continuation following |
//! | [`completion`] | [`CompletionHandler`] and [`Pending`] |
//! | [`client`] | [`XapiClient`]: the operation surface |

pub mod client;
pub mod completion;
pub mod dispatcher;
pub mod walker;

pub use client::{ReplyFuture, XapiClient};
pub use completion::{CompletionHandler, Pending};
pub use dispatcher::{RequestDispatcher, VERSION_HEADER};
pub use walker::{PaginationWalker, StatementCollection};

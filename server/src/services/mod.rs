//! Request-independent operations. Handlers extract and render; everything
//! that decides something lives here and talks to a [`crate::store::Store`].

pub mod concerts;
pub mod feed;
pub mod friends;
pub mod notifications;

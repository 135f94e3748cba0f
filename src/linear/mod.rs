//! Read-side Linear queries shared by the web views and the CLI.
//!
//! Every function takes an optional caller token; `None` authenticates with
//! the client's API key.

pub mod comments;
pub mod issues;
pub mod projects;
pub mod states;
pub mod teams;
pub mod viewer;

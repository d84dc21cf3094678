//! Ambient runtime configuration: the handful of options that tune the
//! registry, bus, and worker crates without being part of any one agent's
//! state.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub mod sops {
    //! Secret management integrations (e.g., SOPS). Reserved: no runtime
    //! option introduced so far needs a secret value.
}

pub use loader::load_from_env;
pub use schema::RuntimeConfig;

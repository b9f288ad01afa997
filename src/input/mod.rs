//! Run inputs: profile definitions and the raw event stream.

pub mod loader;

pub use loader::{load_profiles, EventReader, InputError};

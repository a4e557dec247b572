//! Service integrations used by workflows

pub mod nso;

pub use nso::{Datastore, NsoClient, NsoError};

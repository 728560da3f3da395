mod local;

pub use local::{GitRepository, LocalRepository};

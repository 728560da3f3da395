use crate::config::RemoteConfig;

/// Everything one helper session works against, passed explicitly to each
/// command instead of living in shared state.
pub struct Session<'a, L, R> {
    /// The client's own repository.
    pub local: &'a L,
    /// The store being synchronized with.
    pub remote: &'a R,
    pub config: &'a RemoteConfig,
}

impl<L, R> Clone for Session<'_, L, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, R> Copy for Session<'_, L, R> {}

impl<'a, L, R> Session<'a, L, R> {
    pub fn new(local: &'a L, remote: &'a R, config: &'a RemoteConfig) -> Self {
        Session {
            local,
            remote,
            config,
        }
    }
}

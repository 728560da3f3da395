use anyhow::Result;
use std::io::Write;

use crate::session::Session;
use crate::storage::RemoteStore;

/// Handle the list command
/// Output every remote ref as `<id> <name>`, then the HEAD pointer if the
/// configured default branch exists
pub fn handle<L, R: RemoteStore, W: Write>(session: Session<'_, L, R>, output: &mut W) -> Result<()> {
    let refs = session.remote.get_refs()?;
    tracing::debug!("listing {} ref(s)", refs.len());

    for (refname, id) in refs.iter() {
        writeln!(output, "{} {}", id, refname)?;
    }

    if let Some(default_branch) = session.config.default_branch.as_deref() {
        if refs.contains(default_branch) {
            writeln!(output, "@{} HEAD", default_branch)?;
        }
    }

    // Empty line signals completion
    writeln!(output)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::object::ObjectId;
    use crate::storage::{MemoryStore, RefStore};

    fn list(remote: &MemoryStore, config: &RemoteConfig) -> String {
        let local = MemoryStore::new();
        let mut out = Vec::new();
        handle(Session::new(&local, remote, config), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_list_with_head() {
        let remote = MemoryStore::new();
        let a = ObjectId::from_raw(&[0xaa; 20]).unwrap();
        let b = ObjectId::from_raw(&[0xbb; 20]).unwrap();
        remote.set_ref("refs/heads/master", Some(&a)).unwrap();
        remote.set_ref("refs/heads/branch", Some(&b)).unwrap();

        let out = list(&remote, &RemoteConfig::default());
        assert_eq!(
            out,
            format!("{b} refs/heads/branch\n{a} refs/heads/master\n@refs/heads/master HEAD\n\n")
        );
    }

    #[test]
    fn test_list_without_default_branch() {
        let remote = MemoryStore::new();
        let a = ObjectId::from_raw(&[0xaa; 20]).unwrap();
        remote.set_ref("refs/heads/main", Some(&a)).unwrap();

        let out = list(&remote, &RemoteConfig::default());
        assert_eq!(out, format!("{a} refs/heads/main\n\n"));

        let config = RemoteConfig {
            default_branch: Some("refs/heads/main".to_string()),
            ..RemoteConfig::default()
        };
        assert!(list(&remote, &config).ends_with("@refs/heads/main HEAD\n\n"));
    }

    #[test]
    fn test_list_empty() {
        assert_eq!(list(&MemoryStore::new(), &RemoteConfig::default()), "\n");
    }
}

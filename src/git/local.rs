//! Adapter onto the host's own object database, driven through the `git` binary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use crate::error::{Error, Result};
use crate::object::{encode, kind_name, parse_kind, split_header, ObjectId};
use crate::storage::ObjectStore;

/// The client's own repository.
///
/// `get`/`put`/`has` come from [`ObjectStore`] and exchange framed
/// object bytes, the same encoding the remote store keeps on disk.
pub trait LocalRepository: ObjectStore {
    /// Resolve a ref or revision name to the object it points at.
    fn resolve(&self, refname: &str) -> Result<ObjectId>;
}

/// [`LocalRepository`] backed by `git` subprocesses.
///
/// The host runs remote helpers with `GIT_DIR` set, so by default commands
/// run in the inherited environment and working directory.
#[derive(Debug, Default)]
pub struct GitRepository {
    work_dir: Option<PathBuf>,
}

impl GitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git commands inside `dir` instead of the current directory.
    #[cfg(test)]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        GitRepository {
            work_dir: Some(dir.into()),
        }
    }

    fn output(&self, args: &[&str], input: Option<&[u8]>) -> Result<Output> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }

        tracing::trace!("running git {}", args.join(" "));
        let spawn_err = |e: std::io::Error| Error::Git(format!("failed to run git: {e}"));

        let Some(input) = input else {
            return command.stdin(Stdio::null()).output().map_err(spawn_err);
        };

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| Error::Git(format!("failed to write to git {}: {e}", args[0])))?;
        }
        child.wait_with_output().map_err(spawn_err)
    }

    /// Run a command and return its stdout, failing on nonzero exit.
    fn run(&self, args: &[&str], input: Option<&[u8]>) -> Result<Vec<u8>> {
        let output = self.output(args, input)?;
        if !output.status.success() {
            return Err(Error::Git(format!(
                "git {} failed ({}): {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    fn parse_id(stdout: &[u8]) -> Result<ObjectId> {
        let text = String::from_utf8_lossy(stdout);
        ObjectId::from_hex(text.trim())
            .ok_or_else(|| Error::Git(format!("unexpected object id {:?}", text.trim())))
    }
}

impl ObjectStore for GitRepository {
    fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let output = self.output(&["cat-file", "-t", id.as_str()], None)?;
        if !output.status.success() {
            return Err(Error::ObjectNotFound(id.to_string()));
        }

        let kind_text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let kind = parse_kind(&kind_text).ok_or_else(|| Error::UnknownKind(kind_text.clone()))?;
        let content = self.run(&["cat-file", kind_name(kind), id.as_str()], None)?;
        Ok(encode(kind, &content))
    }

    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        if self.has(id)? {
            return Ok(());
        }

        let (kind, content) = split_header(data)?;
        let stdout = self.run(
            &["hash-object", "-w", "-t", kind_name(kind), "--stdin"],
            Some(content),
        )?;
        let written = Self::parse_id(&stdout)?;
        if written != *id {
            return Err(Error::HashMismatch {
                expected: id.to_string(),
                actual: written.to_string(),
            });
        }
        Ok(())
    }

    fn has(&self, id: &ObjectId) -> Result<bool> {
        Ok(self
            .output(&["cat-file", "-e", id.as_str()], None)?
            .status
            .success())
    }
}

impl LocalRepository for GitRepository {
    fn resolve(&self, refname: &str) -> Result<ObjectId> {
        let stdout = self.run(&["rev-parse", "--verify", "--quiet", refname], None)?;
        Self::parse_id(&stdout)
    }
}

//! Handle push command: copy the objects a local ref needs into the remote
//! store, then move the remote ref.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;

use crate::error::{self, Error};
use crate::git::LocalRepository;
use crate::object::{self, ObjectId};
use crate::session::Session;
use crate::storage::RemoteStore;
use crate::walk::reachable;

/// A parsed `<src>:<dst>` refspec with an optional leading `+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSpec {
    /// Local source ref; empty means delete `dst`.
    pub src: String,
    pub dst: String,
    pub force: bool,
}

impl PushSpec {
    pub fn parse(spec: &str) -> error::Result<Self> {
        let (src, dst) = spec
            .split_once(':')
            .ok_or_else(|| Error::Protocol(format!("push refspec without ':': {spec:?}")))?;
        if dst.is_empty() {
            return Err(Error::Protocol(format!("push refspec without destination: {spec:?}")));
        }

        let (src, force) = match src.strip_prefix('+') {
            Some(src) => (src, true),
            None => (src, false),
        };

        Ok(PushSpec {
            src: src.to_string(),
            dst: dst.to_string(),
            force,
        })
    }
}

/// What a successful push did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushReport {
    /// Objects written to the remote store.
    pub transferred: Vec<ObjectId>,
    /// `dst` did not exist before.
    pub created: bool,
    pub deleted: bool,
}

/// Push `spec.src` into the remote ref `spec.dst`.
///
/// The ref is moved only after every object is stored, so a failure leaves
/// the remote at its pre-push state (already written objects stay behind and
/// are harmless to rewrite).
pub fn push<L, R>(session: Session<'_, L, R>, spec: &PushSpec) -> error::Result<PushReport>
where
    L: LocalRepository,
    R: RemoteStore,
{
    let Session {
        local,
        remote,
        config,
    } = session;

    if spec.src.is_empty() {
        // Objects stay in the store; there is no garbage collection.
        remote.set_ref(&spec.dst, None)?;
        tracing::info!("deleted remote ref {}", spec.dst);
        return Ok(PushReport {
            deleted: true,
            ..PushReport::default()
        });
    }

    let want = local.resolve(&spec.src)?;
    let current = remote.get_refs()?.get(&spec.dst).cloned();
    let have = if spec.force { None } else { current.clone() };
    tracing::debug!(
        "push {} ({}) -> {} (have {:?}, force {})",
        spec.src,
        want,
        spec.dst,
        have,
        spec.force
    );

    // Everything reachable from `have` is already in the remote, because a
    // ref only ever moves after its whole closure was stored, and objects
    // are written dependencies first.
    let mut framed: HashMap<ObjectId, Vec<u8>> = HashMap::new();
    let ids = reachable(
        &want,
        |id| Ok(have.as_ref() == Some(id) || remote.has(id)?),
        |id| {
            let data = local.get(id)?;
            if config.verify_object_ids {
                object::verify(id, &data)?;
            }
            let object = object::decode(id, &data)?;
            framed.insert(id.clone(), data);
            Ok(object)
        },
        config.max_walk_depth,
    )?;

    for id in &ids {
        let data = framed
            .remove(id)
            .ok_or_else(|| Error::ObjectNotFound(id.to_string()))?;
        remote.put(id, &data)?;
        tracing::debug!("pushed {}", id);
    }

    remote.set_ref(&spec.dst, Some(&want))?;
    tracing::info!(
        "pushed {} object(s), {} -> {}",
        ids.len(),
        spec.dst,
        want
    );

    Ok(PushReport {
        transferred: ids,
        created: current.is_none(),
        deleted: false,
    })
}

/// Run one push and report it as `ok <dst>` or `error <dst> <message>`.
/// Returns whether the push succeeded.
pub fn handle<L, R, W>(session: Session<'_, L, R>, output: &mut W, spec: &PushSpec) -> Result<bool>
where
    L: LocalRepository,
    R: RemoteStore,
    W: Write,
{
    match push(session, spec) {
        Ok(report) => {
            tracing::debug!(
                "push {}: {} object(s), created {}, deleted {}",
                spec.dst,
                report.transferred.len(),
                report.created,
                report.deleted
            );
            writeln!(output, "ok {}", spec.dst)?;
            Ok(true)
        }
        Err(e) => {
            tracing::error!("push {}:{} failed: {}", spec.src, spec.dst, e);
            writeln!(output, "error {} {}", spec.dst, e)?;
            Ok(false)
        }
    }
}

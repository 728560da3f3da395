//! Handle fetch command: copy everything an advertised id needs from the
//! remote store into the local repository.

use std::collections::HashMap;

use anyhow::Result;

use crate::error::{self, Error};
use crate::git::LocalRepository;
use crate::object::{self, ObjectId};
use crate::session::Session;
use crate::storage::RemoteStore;
use crate::walk::reachable;

/// A `fetch <id> <name>` request. The name is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: ObjectId,
    pub name: String,
}

impl FetchRequest {
    /// Parse the arguments following `fetch`.
    pub fn parse(args: &[&str]) -> error::Result<Self> {
        let [id, name] = args else {
            return Err(Error::Protocol(format!(
                "fetch expects <id> <name>, got {:?}",
                args.join(" ")
            )));
        };
        let id = ObjectId::from_hex(id)
            .ok_or_else(|| Error::Protocol(format!("fetch of invalid object id {id:?}")))?;

        Ok(FetchRequest {
            id,
            name: name.to_string(),
        })
    }
}

/// Copy the closure of `request.id` that the local repository lacks.
/// Refs are left alone; the host updates its own refs afterwards.
pub fn fetch<L, R>(session: Session<'_, L, R>, request: &FetchRequest) -> error::Result<Vec<ObjectId>>
where
    L: LocalRepository,
    R: RemoteStore,
{
    let Session {
        local,
        remote,
        config,
    } = session;

    // Dependencies are written before their dependents, so anything the
    // local side already has is complete and can bound the walk.
    let mut framed: HashMap<ObjectId, Vec<u8>> = HashMap::new();
    let ids = reachable(
        &request.id,
        |id| local.has(id),
        |id| {
            let data = remote.get(id)?;
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
        local.put(id, &data)?;
        tracing::debug!("fetched {}", id);
    }

    tracing::info!(
        "fetched {} object(s) for {} ({})",
        ids.len(),
        request.name,
        request.id
    );
    Ok(ids)
}

/// Run one fetch. Fetch commands produce no output of their own; the batch
/// is acknowledged as a whole once it closes.
pub fn handle<L, R>(session: Session<'_, L, R>, request: &FetchRequest) -> Result<()>
where
    L: LocalRepository,
    R: RemoteStore,
{
    fetch(session, request)?;
    Ok(())
}

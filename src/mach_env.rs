//! Process group abstraction.
//!
//! `MachEnv` wraps an MPI communicator plus the handful of derived
//! facts (rank, size, master rank, membership) that every other
//! component needs but none of them should recompute. Environments are
//! named and kept in a process-wide registry, the same shape as a
//! global `AllEnvs` map; a "Default" environment must be created once
//! at startup via [`MachEnv::init`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use mpi::topology::{Communicator, SimpleCommunicator};
use mpi::Rank;
use once_cell::sync::OnceCell;

use crate::error::{CoreError, CoreResult};

static REGISTRY: OnceCell<RwLock<HashMap<String, Arc<MachEnv>>>> = OnceCell::new();

fn registry() -> &'static RwLock<HashMap<String, Arc<MachEnv>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// A named process group: a communicator plus its derived identity.
///
/// Non-member environments (the result of a strided or list subset
/// that excludes this rank) carry `comm = None` and report sentinel
/// values from every query rather than erroring — every group query is
/// safe to call on a non-member.
pub struct MachEnv {
    name: String,
    comm: Option<SimpleCommunicator>,
    my_task: Rank,
    num_tasks: Rank,
    master_task: Rank,
    is_member: bool,
}

const SENTINEL: Rank = -999;

impl MachEnv {
    /// Initialize the "Default" environment from an existing
    /// communicator (typically `mpi::initialize()`'s world). Installs
    /// rank-tagged logging as a side effect, matching the original
    /// tying log setup to `MachEnv::init`.
    pub fn init(world: &SimpleCommunicator) -> CoreResult<()> {
        let my_task = world.rank();
        let env = MachEnv {
            name: "Default".to_string(),
            comm: Some(world.duplicate()),
            my_task,
            num_tasks: world.size(),
            master_task: 0,
            is_member: true,
        };
        crate::logging::init(my_task);
        Self::register("Default".to_string(), env)
    }

    fn register(name: String, env: MachEnv) -> CoreResult<()> {
        let mut reg = registry().write().unwrap();
        if reg.contains_key(&name) {
            return Err(CoreError::AlreadyRegistered {
                registry: "MachEnv".to_string(),
                name,
            });
        }
        reg.insert(name, Arc::new(env));
        Ok(())
    }

    /// Fetch a previously created environment by name.
    pub fn get(name: &str) -> Option<Arc<MachEnv>> {
        registry().read().unwrap().get(name).cloned()
    }

    /// Fetch the "Default" environment, panicking if `init` was never
    /// called — every other component assumes this invariant.
    pub fn default_env() -> Arc<MachEnv> {
        Self::get("Default").expect("MachEnv::init was never called")
    }

    /// Subset of `self` spanning the contiguous range `[0, new_size)`.
    pub fn subset_contiguous(&self, name: &str, new_size: i32) -> CoreResult<()> {
        let ranks: Vec<Rank> = (0..new_size).collect();
        self.subset_list(name, &ranks)
    }

    /// Subset of `self` containing every `stride`-th rank starting at
    /// `start`.
    pub fn subset_stride(&self, name: &str, start: i32, stride: i32, count: i32) -> CoreResult<()> {
        let ranks: Vec<Rank> = (0..count).map(|i| start + i * stride).collect();
        self.subset_list(name, &ranks)
    }

    /// Subset of `self` containing exactly the listed ranks, in order.
    pub fn subset_list(&self, name: &str, ranks: &[Rank]) -> CoreResult<()> {
        let comm = self.comm.as_ref().ok_or_else(|| CoreError::InvalidArgument {
            message: "subset requested on a non-member MachEnv".to_string(),
        })?;
        if ranks.iter().any(|&r| r < 0 || r >= self.num_tasks) {
            return Err(CoreError::InvalidArgument {
                message: format!(
                    "subset ranks {ranks:?} lie outside parent group of size {}",
                    self.num_tasks
                ),
            });
        }
        let group = comm.group();
        let sub_group = group.include(ranks);
        let is_member = ranks.contains(&self.my_task);
        let new_comm = comm.create(&sub_group);

        let env = if is_member {
            let new_comm = new_comm.expect("member rank must receive a subset communicator");
            MachEnv {
                name: name.to_string(),
                my_task: new_comm.rank(),
                num_tasks: new_comm.size(),
                master_task: 0,
                is_member: true,
                comm: Some(new_comm),
            }
        } else {
            MachEnv {
                name: name.to_string(),
                my_task: SENTINEL,
                num_tasks: SENTINEL,
                master_task: SENTINEL,
                is_member: false,
                comm: None,
            }
        };
        Self::register(name.to_string(), env)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_member(&self) -> bool {
        self.is_member
    }

    pub fn rank(&self) -> i32 {
        self.my_task
    }

    pub fn size(&self) -> i32 {
        self.num_tasks
    }

    pub fn master_task(&self) -> i32 {
        self.master_task
    }

    pub fn is_master(&self) -> bool {
        self.is_member && self.my_task == self.master_task
    }

    /// The underlying communicator, or `None` on a non-member
    /// environment — callers must check membership before using it for
    /// anything collective.
    pub fn comm(&self) -> Option<&SimpleCommunicator> {
        self.comm.as_ref()
    }

    /// Abort the entire group immediately. Never returns.
    pub fn abort(&self, code: i32) -> ! {
        if let Some(comm) = &self.comm {
            comm.abort(code);
        }
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_rank_is_distinguishable() {
        assert!(SENTINEL < 0);
    }
}

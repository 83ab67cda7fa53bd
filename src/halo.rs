//! Non-blocking ghost-cell exchange built from a [`Decomp`].
//!
//! Exchanged arrays are element-major: axis 0 matches one of
//! `NCellsSize`/`NEdgesSize`/`NVerticesSize`, and everything past it is
//! the per-element payload. This is the layout every other component
//! in this crate already produces its per-element arrays in.

use std::collections::HashMap;

use mpi::request::WaitGuard;
use mpi::topology::Communicator;
use mpi::traits::{Destination, Equivalence, Source};

use crate::array::MirroredArray;
use crate::decomp::{Decomp, ElementSpace};
use crate::error::{CoreError, CoreResult};
use crate::mach_env::MachEnv;

/// Local indices exchanged with one remote rank.
#[derive(Debug, Clone)]
pub struct HaloExchangeList {
    pub rank: i32,
    pub local_indices: Vec<usize>,
}

/// Send/receive lists for one element kind, grouped by remote rank.
#[derive(Debug, Clone, Default)]
pub struct ElementHalo {
    pub recv: Vec<HaloExchangeList>,
    pub send: Vec<HaloExchangeList>,
}

pub struct Halo {
    pub cells: ElementHalo,
    pub edges: ElementHalo,
    pub vertices: ElementHalo,
}

impl Halo {
    /// Construct send/receive lists for every element kind from a
    /// Decomp's location tables, via one all-to-all "who needs what"
    /// exchange per kind.
    pub fn build(env: &MachEnv, decomp: &Decomp) -> Halo {
        Halo {
            cells: build_element_halo(env, &decomp.cells),
            edges: build_element_halo(env, &decomp.edges),
            vertices: build_element_halo(env, &decomp.vertices),
        }
    }
}

fn build_element_halo(env: &MachEnv, space: &ElementSpace) -> ElementHalo {
    let size = env.size().max(1) as usize;
    let my_rank = env.rank();

    let mut recv_map: HashMap<i32, Vec<usize>> = HashMap::new();
    let mut requests_per_rank: Vec<Vec<i64>> = vec![Vec::new(); size];
    for i in space.n_owned..space.n_all {
        let (owner, owner_local) = space.loc[i];
        recv_map.entry(owner).or_default().push(i);
        requests_per_rank[owner as usize].push(owner_local as i64);
    }
    let mut recv: Vec<HaloExchangeList> = recv_map
        .into_iter()
        .map(|(rank, local_indices)| HaloExchangeList { rank, local_indices })
        .collect();
    recv.sort_by_key(|l| l.rank);

    let received = all_to_all_requests(env, &requests_per_rank);
    let mut send: Vec<HaloExchangeList> = received
        .into_iter()
        .enumerate()
        .filter(|(r, indices)| !indices.is_empty() && *r as i32 != my_rank)
        .map(|(r, indices)| HaloExchangeList {
            rank: r as i32,
            local_indices: indices.into_iter().map(|x| x as usize).collect(),
        })
        .collect();
    send.sort_by_key(|l| l.rank);

    ElementHalo { recv, send }
}

/// Every rank tells every other rank which of the other's local
/// indices it needs; `requests_per_rank[r]` is what this rank wants
/// from rank `r`. Returns, for each `r`, what rank `r` wants from us.
fn all_to_all_requests(env: &MachEnv, requests_per_rank: &[Vec<i64>]) -> Vec<Vec<i64>> {
    let size = requests_per_rank.len();
    let Some(comm) = env.comm() else { return vec![Vec::new(); size] };
    let my_rank = env.rank();
    let mut received: Vec<Vec<i64>> = vec![Vec::new(); size];

    mpi::request::scope(|scope| {
        let mut guards = Vec::new();
        for r in 0..size {
            if r as i32 == my_rank {
                continue;
            }
            guards.push(WaitGuard::from(
                comm.process_at_rank(r as i32).immediate_send(scope, &requests_per_rank[r]),
            ));
        }
        for r in 0..size {
            if r as i32 == my_rank {
                received[r] = requests_per_rank[r].clone();
                continue;
            }
            let (data, _status) = comm.process_at_rank(r as i32).receive_vec::<i64>();
            received[r] = data;
        }
    });
    received
}

/// Exchange one array: post non-blocking receives, pack and post
/// non-blocking sends, wait for all of them, then unpack.
pub fn exchange<T: Equivalence + Copy + Default>(
    env: &MachEnv,
    halo: &ElementHalo,
    array: &mut MirroredArray<T>,
    n_size: usize,
) -> CoreResult<()> {
    if array.axis_len(0) != n_size {
        return Err(CoreError::InvalidArgument {
            message: format!(
                "halo exchange: element axis has length {}, expected {n_size} for this element kind",
                array.axis_len(0)
            ),
        });
    }
    let Some(comm) = env.comm() else { return Ok(()) };
    let payload = array.stride_excluding(0);

    let mut send_bufs: Vec<Vec<T>> = Vec::with_capacity(halo.send.len());
    for list in &halo.send {
        let mut buf = Vec::with_capacity(list.local_indices.len() * payload);
        for &idx in &list.local_indices {
            buf.extend_from_slice(&array.host()[idx * payload..(idx + 1) * payload]);
        }
        send_bufs.push(buf);
    }

    let mut recv_bufs: Vec<Vec<T>> = halo
        .recv
        .iter()
        .map(|list| vec![T::default(); list.local_indices.len() * payload])
        .collect();

    mpi::request::scope(|scope| {
        let mut guards = Vec::new();
        for (list, buf) in halo.recv.iter().zip(recv_bufs.iter_mut()) {
            guards.push(WaitGuard::from(
                comm.process_at_rank(list.rank).immediate_receive_into(scope, buf.as_mut_slice()),
            ));
        }
        for (list, buf) in halo.send.iter().zip(send_bufs.iter()) {
            guards.push(WaitGuard::from(
                comm.process_at_rank(list.rank).immediate_send(scope, buf.as_slice()),
            ));
        }
    });

    let host = array.host_mut();
    for (list, buf) in halo.recv.iter().zip(recv_bufs.iter()) {
        for (k, &idx) in list.local_indices.iter().enumerate() {
            host[idx * payload..(idx + 1) * payload].copy_from_slice(&buf[k * payload..(k + 1) * payload]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(n_owned: usize, n_all: usize, loc: Vec<(i32, usize)>) -> ElementSpace {
        ElementSpace {
            n_owned,
            n_halo: vec![n_all],
            n_all,
            n_size: n_all + 1,
            n_global: n_all,
            global_id: (0..=n_all).map(|i| i as i64).collect(),
            loc,
        }
    }

    #[test]
    fn recv_list_groups_halo_rows_by_owner() {
        // owned = {0}, halo rows 1,2 owned by rank 1 and 2 respectively.
        let s = space(1, 3, vec![(0, 0), (1, 4), (2, 7), (0, 3)]);
        let mut recv_map: HashMap<i32, Vec<usize>> = HashMap::new();
        for i in s.n_owned..s.n_all {
            recv_map.entry(s.loc[i].0).or_default().push(i);
        }
        assert_eq!(recv_map.get(&1), Some(&vec![1]));
        assert_eq!(recv_map.get(&2), Some(&vec![2]));
    }
}

//! Cell-to-rank assignment strategies bound into [`super::Decomp`] step 2.

use crate::config::DecompMethod;
use crate::mach_env::MachEnv;

/// Compressed-row cell adjacency built from a broadcast `CellsOnCell`
/// table. `adjncy` entries are 0-based global cell indices; a sentinel
/// neighbor (boundary) is simply omitted from the row.
pub struct Adjacency {
    pub xadj: Vec<i32>,
    pub adjncy: Vec<i32>,
}

impl Adjacency {
    /// `cells_on_cell` is row-major `[n_cells_global, max_edges]`,
    /// 1-based global cell IDs with `0` marking a missing neighbor.
    pub fn from_cells_on_cell(cells_on_cell: &[i64], n_cells_global: usize, max_edges: usize) -> Adjacency {
        let mut xadj = Vec::with_capacity(n_cells_global + 1);
        let mut adjncy = Vec::new();
        xadj.push(0);
        for c in 0..n_cells_global {
            for e in 0..max_edges {
                let neighbor = cells_on_cell[c * max_edges + e];
                if neighbor > 0 {
                    adjncy.push((neighbor - 1) as i32);
                }
            }
            xadj.push(adjncy.len() as i32);
        }
        Adjacency { xadj, adjncy }
    }
}

/// Assign every global cell to an owning rank. Single-rank runs bypass
/// both partitioners, since METIS divides by `nparts - 1` internally
/// and a parallel exchange across one rank is a no-op anyway.
pub fn partition(method: DecompMethod, env: &MachEnv, adjacency: &Adjacency, n_cells: usize) -> Vec<i32> {
    if env.size() <= 1 {
        return vec![0; n_cells];
    }
    match method {
        DecompMethod::MetisKway => serial_kway(env, adjacency, n_cells),
        DecompMethod::ParmetisKway => parallel_kway(env, adjacency, n_cells),
    }
}

/// Every rank calls METIS identically against the full broadcast
/// adjacency and arrives at the same `CellTask` table without further
/// communication.
fn serial_kway(env: &MachEnv, adjacency: &Adjacency, n_cells: usize) -> Vec<i32> {
    let nparts = env.size();
    let mut xadj = adjacency.xadj.clone();
    let mut adjncy = adjacency.adjncy.clone();
    let mut part = vec![0i32; n_cells];
    if let Err(e) = metis::Graph::new(1, nparts, &mut xadj, &mut adjncy).part_kway(&mut part) {
        crate::fatal!(env, "metis k-way partition failed: {e:?}");
    }
    part
}

/// No parmetis binding exists in the pack, so the "parallel" partitioner
/// is a documented greedy approximation: cells are streamed in global
/// order, each assigned to whichever under-loaded rank already owns the
/// most of its partitioned neighbors, converging toward adjacency
/// locality without a real distributed-memory partitioner. This is an
/// intentional substitution, not a ParMETIS port (see DESIGN.md).
fn parallel_kway(env: &MachEnv, adjacency: &Adjacency, n_cells: usize) -> Vec<i32> {
    let size = env.size() as usize;
    let target_load = n_cells.div_ceil(size);
    let mut assigned = vec![-1i32; n_cells];
    let mut load = vec![0usize; size];

    for c in 0..n_cells {
        let start = adjacency.xadj[c] as usize;
        let end = adjacency.xadj[c + 1] as usize;
        let mut neighbor_votes = vec![0usize; size];
        for &nbr in &adjacency.adjncy[start..end] {
            let nbr = nbr as usize;
            if assigned[nbr] >= 0 {
                neighbor_votes[assigned[nbr] as usize] += 1;
            }
        }
        let rank = neighbor_votes
            .iter()
            .enumerate()
            .filter(|(r, _)| load[*r] < target_load)
            .max_by_key(|(_, votes)| **votes)
            .map(|(r, _)| r)
            .unwrap_or_else(|| {
                load.iter()
                    .enumerate()
                    .min_by_key(|(_, l)| **l)
                    .map(|(r, _)| r)
                    .unwrap_or(0)
            });
        assigned[c] = rank as i32;
        load[rank] += 1;
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_omits_sentinel_neighbors() {
        // 2 cells, max_edges=2: cell 0 neighbors {2, 0(missing)}, cell 1 neighbors {1, 0}
        let cells_on_cell = vec![2, 0, 1, 0];
        let adj = Adjacency::from_cells_on_cell(&cells_on_cell, 2, 2);
        assert_eq!(adj.xadj, vec![0, 1, 2]);
        assert_eq!(adj.adjncy, vec![1, 0]);
    }
}

//! Graph partitioning, halo ring construction, and connectivity remap.
//!
//! Builds the local index space and connectivity tables described by
//! the data model: for each of cells, edges, and vertices, an owned
//! prefix followed by `HaloWidth` halo rings, plus the remapped
//! connectivity tables that only ever reference local indices or the
//! trailing sentinel slot.
//!
//! Every rank in this standalone crate opens the mesh file
//! independently (see `parallel_io`'s documented substitution), so the
//! "linear pre-read, then broadcast" steps below reconstruct the full
//! global tables by chunking a whole-file read rather than by a true
//! partial dataset read — the broadcast step itself still runs for
//! real, over the `MachEnv` communicator, exactly as the algorithm
//! describes it.

pub mod partition;

use std::collections::{HashMap, HashSet};

use crate::broadcast;
use crate::config::DecompConfig;
use crate::error::CoreResult;
use crate::mach_env::MachEnv;
use crate::parallel_io::{FileId, ParallelIo};
use partition::Adjacency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Cell,
    Edge,
    Vertex,
}

/// A slot in the `EdgesOnEdge` table: either a remapped local edge
/// index, or a named sentinel standing in for a bare-zero convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOnEdgeSlot {
    Valid(usize),
    Sentinel,
}

/// The local index space for one element kind: owned prefix, halo
/// rings, global identity, and location table.
#[derive(Debug, Clone)]
pub struct ElementSpace {
    pub n_owned: usize,
    /// Cumulative local count through halo ring `h`, length `HaloWidth`.
    pub n_halo: Vec<usize>,
    pub n_all: usize,
    pub n_size: usize,
    pub n_global: usize,
    /// 1-based global ID per local slot; the trailing sentinel slot is 0.
    pub global_id: Vec<i64>,
    /// `(owning rank, local index on that rank)` per local slot.
    pub loc: Vec<(i32, usize)>,
}

impl ElementSpace {
    /// Remap a 1-based global ID to a local index, falling back to the
    /// sentinel slot `NAll` for zero, negative, or off-rank IDs absent
    /// from this rank's halo.
    pub fn local_of(&self, map: &HashMap<i64, usize>, global_id: i64) -> usize {
        if global_id <= 0 {
            return self.n_all;
        }
        *map.get(&global_id).unwrap_or(&self.n_all)
    }
}

pub struct Decomp {
    pub halo_width: usize,
    pub max_edges: usize,
    pub vertex_degree: usize,

    pub cells: ElementSpace,
    pub edges: ElementSpace,
    pub vertices: ElementSpace,

    pub cells_on_cell: Vec<usize>,
    pub edges_on_cell: Vec<usize>,
    pub vertices_on_cell: Vec<usize>,
    pub n_edges_on_cell: Vec<u32>,

    pub cells_on_edge: Vec<usize>,
    pub edges_on_edge: Vec<EdgeOnEdgeSlot>,
    pub vertices_on_edge: Vec<usize>,
    pub n_edges_on_edge: Vec<u32>,

    pub cells_on_vertex: Vec<usize>,
    pub edges_on_vertex: Vec<usize>,
}

impl Decomp {
    pub fn build(env: &MachEnv, io: &ParallelIo, file: FileId, config: &DecompConfig) -> CoreResult<Decomp> {
        let my_rank = env.rank();
        let size = env.size().max(1) as usize;
        let halo_width = config.halo_width as usize;

        let n_cells_global = io.read_dimension_named(&["NCells", "nCells"], file)?;
        let n_edges_global = io.read_dimension_named(&["NEdges", "nEdges"], file)?;
        let n_vertices_global = io.read_dimension_named(&["NVertices", "nVertices"], file)?;
        let max_edges = io.read_dimension_named(&["MaxEdges", "maxEdges"], file)?;
        let vertex_degree = io.read_dimension_named(&["VertexDegree", "vertexDegree"], file)?;

        // Step 1: linear pre-read, broadcast-reconstructed into full tables.
        let cells_on_cell_g = gather_linear_table(env, io, file, &["CellsOnCell", "cellsOnCell"], max_edges, n_cells_global)?;
        let edges_on_cell_g = gather_linear_table(env, io, file, &["EdgesOnCell", "edgesOnCell"], max_edges, n_cells_global)?;
        let vertices_on_cell_g = gather_linear_table(env, io, file, &["VerticesOnCell", "verticesOnCell"], max_edges, n_cells_global)?;
        let n_edges_on_cell_g = gather_linear_table(env, io, file, &["NEdgesOnCell", "nEdgesOnCell"], 1, n_cells_global)?;

        let cells_on_edge_g = gather_linear_table(env, io, file, &["CellsOnEdge", "cellsOnEdge"], 2, n_edges_global)?;
        let edges_on_edge_g = gather_linear_table(env, io, file, &["EdgesOnEdge", "edgesOnEdge"], 2 * max_edges, n_edges_global)?;
        let vertices_on_edge_g = gather_linear_table(env, io, file, &["VerticesOnEdge", "verticesOnEdge"], 2, n_edges_global)?;
        let n_edges_on_edge_g = gather_linear_table(env, io, file, &["NEdgesOnEdge", "nEdgesOnEdge"], 1, n_edges_global)?;

        let cells_on_vertex_g = gather_linear_table(env, io, file, &["CellsOnVertex", "cellsOnVertex"], vertex_degree, n_vertices_global)?;
        let edges_on_vertex_g = gather_linear_table(env, io, file, &["EdgesOnVertex", "edgesOnVertex"], vertex_degree, n_vertices_global)?;

        // Step 2: cell partition.
        let adjacency = Adjacency::from_cells_on_cell(&cells_on_cell_g, n_cells_global, max_edges);
        let cell_task = partition::partition(config.decomp_method, env, &adjacency, n_cells_global);
        let owner_local_index_cell = owner_local_index(&cell_task, size);

        // Step 3: cell halo rings.
        let (cells, cell_groups) = build_cell_space(
            &cell_task,
            &owner_local_index_cell,
            &adjacency,
            my_rank,
            halo_width,
            n_cells_global,
        );

        // Step 4: redistribute per-cell connectivity onto the local cell set.
        let (cells_on_cell_rows, edges_on_cell_rows, vertices_on_cell_rows, n_edges_on_cell_rows) = extract_cell_rows(
            &cells,
            &cells_on_cell_g,
            &edges_on_cell_g,
            &vertices_on_cell_g,
            &n_edges_on_cell_g,
            max_edges,
        );

        // Step 5: edge partition — ownership from CellsOnEdge's first valid cell.
        let edge_owner = first_valid_owner(&cells_on_edge_g, 2, n_edges_global, &cell_task);
        let owner_local_index_edge = owner_local_index(&edge_owner, size);
        let edges = build_secondary_space(
            &cell_groups,
            &edges_on_cell_g,
            max_edges,
            &edge_owner,
            my_rank,
            halo_width,
            n_edges_global,
            &owner_local_index_edge,
        );

        // Step 6: vertex partition — ownership from CellsOnVertex's first valid cell.
        let vertex_owner = first_valid_owner(&cells_on_vertex_g, vertex_degree, n_vertices_global, &cell_task);
        let owner_local_index_vertex = owner_local_index(&vertex_owner, size);
        let vertices = build_secondary_space(
            &cell_groups,
            &vertices_on_cell_g,
            max_edges,
            &vertex_owner,
            my_rank,
            halo_width,
            n_vertices_global,
            &owner_local_index_vertex,
        );

        // Step 7: redistribute per-edge / per-vertex connectivity.
        let (cells_on_edge_rows, edges_on_edge_rows, vertices_on_edge_rows, n_edges_on_edge_rows) = extract_edge_rows(
            &edges,
            &cells_on_edge_g,
            &edges_on_edge_g,
            &vertices_on_edge_g,
            &n_edges_on_edge_g,
            max_edges,
        );
        let (cells_on_vertex_rows, edges_on_vertex_rows) =
            extract_vertex_rows(&vertices, &cells_on_vertex_g, &edges_on_vertex_g, vertex_degree);

        // Step 8: global -> local remap.
        let cell_map = build_global_to_local(&cells);
        let edge_map = build_global_to_local(&edges);
        let vertex_map = build_global_to_local(&vertices);

        let cells_on_cell = cells_on_cell_rows.iter().map(|&g| cells.local_of(&cell_map, g)).collect();
        let edges_on_cell = edges_on_cell_rows.iter().map(|&g| edges.local_of(&edge_map, g)).collect();
        let vertices_on_cell = vertices_on_cell_rows.iter().map(|&g| vertices.local_of(&vertex_map, g)).collect();
        let n_edges_on_cell = n_edges_on_cell_rows.iter().map(|&c| c as u32).collect();

        let cells_on_edge = cells_on_edge_rows.iter().map(|&g| cells.local_of(&cell_map, g)).collect();
        let edges_on_edge = edges_on_edge_rows
            .iter()
            .map(|&g| {
                if g == 0 {
                    EdgeOnEdgeSlot::Sentinel
                } else {
                    EdgeOnEdgeSlot::Valid(edges.local_of(&edge_map, g))
                }
            })
            .collect();
        let vertices_on_edge = vertices_on_edge_rows.iter().map(|&g| vertices.local_of(&vertex_map, g)).collect();
        let n_edges_on_edge = n_edges_on_edge_rows.iter().map(|&c| c as u32).collect();

        let cells_on_vertex = cells_on_vertex_rows.iter().map(|&g| cells.local_of(&cell_map, g)).collect();
        let edges_on_vertex = edges_on_vertex_rows.iter().map(|&g| edges.local_of(&edge_map, g)).collect();

        Ok(Decomp {
            halo_width,
            max_edges,
            vertex_degree,
            cells,
            edges,
            vertices,
            cells_on_cell,
            edges_on_cell,
            vertices_on_cell,
            n_edges_on_cell,
            cells_on_edge,
            edges_on_edge,
            vertices_on_edge,
            n_edges_on_edge,
            cells_on_vertex,
            edges_on_vertex,
        })
    }
}

fn linear_chunk(n_global: usize, rank: i32, size: usize) -> (usize, usize) {
    let rank = rank.max(0) as usize;
    let nominal = n_global / size;
    let remainder = n_global % size;
    let start = rank * nominal;
    let len = if rank == size - 1 { nominal + remainder } else { nominal };
    (start, len)
}

fn gather_linear_table(
    env: &MachEnv,
    io: &ParallelIo,
    file: FileId,
    candidates: &[&str],
    row_width: usize,
    n_global: usize,
) -> CoreResult<Vec<i64>> {
    let (data, _shape, _name) = io.read_whole_i64_named(candidates, file)?;
    let size = env.size().max(1) as usize;
    let (start, len) = linear_chunk(n_global, env.rank(), size);
    let local_chunk = data[start * row_width..(start + len) * row_width].to_vec();

    let mut full = Vec::with_capacity(n_global * row_width);
    for root in 0..size as i32 {
        let mut buf = if env.rank() == root { local_chunk.clone() } else { Vec::new() };
        broadcast::broadcast_vec(env, &mut buf, root);
        full.extend(buf);
    }
    Ok(full)
}

fn owner_local_index(owner_of: &[i32], size: usize) -> Vec<usize> {
    let mut counters = vec![0usize; size.max(1)];
    let mut result = vec![0usize; owner_of.len()];
    for (i, &r) in owner_of.iter().enumerate() {
        let r = r.max(0) as usize;
        result[i] = counters[r];
        counters[r] += 1;
    }
    result
}

/// Ownership of an edge/vertex is the owner of the first valid cell in
/// its `CellsOnXxx` row.
fn first_valid_owner(on_cell_table: &[i64], width: usize, n_global: usize, cell_task: &[i32]) -> Vec<i32> {
    let mut owner = vec![0i32; n_global];
    for i in 0..n_global {
        let row = &on_cell_table[i * width..(i + 1) * width];
        let first = row.iter().find(|&&c| c > 0).copied().unwrap_or(0);
        owner[i] = if first > 0 { cell_task[(first - 1) as usize] } else { 0 };
    }
    owner
}

fn finalize_space(
    mut global_ids: Vec<i64>,
    n_owned: usize,
    n_halo: Vec<usize>,
    my_rank: i32,
    n_global: usize,
    owner_of: &[i32],
    owner_local_index_table: &[usize],
) -> ElementSpace {
    let n_all = *n_halo.last().unwrap_or(&n_owned);
    global_ids.push(0);
    let n_size = n_all + 1;
    let mut loc = Vec::with_capacity(n_size);
    for &g in global_ids.iter().take(n_all) {
        if g <= 0 {
            loc.push((my_rank, n_all));
        } else {
            let g0 = (g - 1) as usize;
            loc.push((owner_of[g0], owner_local_index_table[g0]));
        }
    }
    loc.push((my_rank, n_all));

    ElementSpace {
        n_owned,
        n_halo,
        n_all,
        n_size,
        n_global,
        global_id: global_ids,
        loc,
    }
}

fn build_cell_space(
    cell_task: &[i32],
    owner_local_index_cell: &[usize],
    adjacency: &Adjacency,
    my_rank: i32,
    halo_width: usize,
    n_cells_global: usize,
) -> (ElementSpace, Vec<Vec<usize>>) {
    let owned: Vec<usize> = (0..n_cells_global).filter(|&c| cell_task[c] == my_rank).collect();
    let n_owned = owned.len();
    let mut seen: HashSet<usize> = owned.iter().copied().collect();
    let mut groups: Vec<Vec<usize>> = vec![owned.clone()];
    let mut global_ids: Vec<i64> = owned.iter().map(|&c| (c + 1) as i64).collect();
    let mut frontier = owned;
    let mut n_halo = Vec::with_capacity(halo_width);

    for _ in 0..halo_width {
        let mut next_ring: Vec<usize> = Vec::new();
        for &c in &frontier {
            let start = adjacency.xadj[c] as usize;
            let end = adjacency.xadj[c + 1] as usize;
            for &nbr in &adjacency.adjncy[start..end] {
                let nbr = nbr as usize;
                if seen.insert(nbr) {
                    next_ring.push(nbr);
                }
            }
        }
        next_ring.sort_unstable();
        for &c in &next_ring {
            global_ids.push((c + 1) as i64);
        }
        n_halo.push(global_ids.len());
        groups.push(next_ring.clone());
        frontier = next_ring;
    }

    let space = finalize_space(global_ids, n_owned, n_halo, my_rank, n_cells_global, cell_task, owner_local_index_cell);
    (space, groups)
}

/// Shared construction for edges and vertices: ring 0 is the owned
/// subset of elements incident to this rank's owned cells; ring 1 is
/// stored in reverse order (the legacy halo-ring-0 contract); rings
/// 2..HaloWidth are sourced from the matching cell halo ring, ascending.
fn build_secondary_space(
    cell_groups: &[Vec<usize>],
    on_cell_table_global: &[i64],
    max_per_cell: usize,
    owner_of: &[i32],
    my_rank: i32,
    halo_width: usize,
    n_global: usize,
    owner_local_index_table: &[usize],
) -> ElementSpace {
    let collect_unique = |group: &[usize]| -> Vec<i64> {
        let mut set: HashSet<i64> = HashSet::new();
        for &c in group {
            let row = &on_cell_table_global[c * max_per_cell..(c + 1) * max_per_cell];
            for &g in row {
                if g > 0 {
                    set.insert(g);
                }
            }
        }
        let mut v: Vec<i64> = set.into_iter().collect();
        v.sort_unstable();
        v
    };

    let owned: Vec<i64> = collect_unique(&cell_groups[0])
        .into_iter()
        .filter(|&g| owner_of[(g - 1) as usize] == my_rank)
        .collect();
    let n_owned = owned.len();
    let mut seen: HashSet<i64> = owned.iter().copied().collect();
    let mut global_ids: Vec<i64> = owned;
    let mut n_halo = Vec::with_capacity(halo_width);

    for h in 0..halo_width {
        if h >= cell_groups.len() {
            n_halo.push(global_ids.len());
            continue;
        }
        let mut ring: Vec<i64> = collect_unique(&cell_groups[h])
            .into_iter()
            .filter(|g| !seen.contains(g))
            .collect();
        ring.sort_unstable();
        if h == 0 {
            ring.reverse();
        }
        for &g in &ring {
            seen.insert(g);
        }
        global_ids.extend(&ring);
        n_halo.push(global_ids.len());
    }

    finalize_space(global_ids, n_owned, n_halo, my_rank, n_global, owner_of, owner_local_index_table)
}

fn extract_cell_rows(
    cells: &ElementSpace,
    cells_on_cell_g: &[i64],
    edges_on_cell_g: &[i64],
    vertices_on_cell_g: &[i64],
    n_edges_on_cell_g: &[i64],
    max_edges: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>) {
    let n_size = cells.n_size;
    let mut cells_on_cell = vec![0i64; n_size * max_edges];
    let mut edges_on_cell = vec![0i64; n_size * max_edges];
    let mut vertices_on_cell = vec![0i64; n_size * max_edges];
    let mut n_edges_on_cell = vec![0i64; n_size];

    for i in 0..n_size {
        let g = cells.global_id[i];
        if g <= 0 {
            continue;
        }
        let row = (g - 1) as usize;
        cells_on_cell[i * max_edges..(i + 1) * max_edges]
            .copy_from_slice(&cells_on_cell_g[row * max_edges..(row + 1) * max_edges]);
        edges_on_cell[i * max_edges..(i + 1) * max_edges]
            .copy_from_slice(&edges_on_cell_g[row * max_edges..(row + 1) * max_edges]);
        vertices_on_cell[i * max_edges..(i + 1) * max_edges]
            .copy_from_slice(&vertices_on_cell_g[row * max_edges..(row + 1) * max_edges]);
        n_edges_on_cell[i] = n_edges_on_cell_g[row];
    }
    (cells_on_cell, edges_on_cell, vertices_on_cell, n_edges_on_cell)
}

fn extract_edge_rows(
    edges: &ElementSpace,
    cells_on_edge_g: &[i64],
    edges_on_edge_g: &[i64],
    vertices_on_edge_g: &[i64],
    n_edges_on_edge_g: &[i64],
    max_edges: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>) {
    let n_size = edges.n_size;
    let eoe_width = 2 * max_edges;
    let mut cells_on_edge = vec![0i64; n_size * 2];
    let mut edges_on_edge = vec![0i64; n_size * eoe_width];
    let mut vertices_on_edge = vec![0i64; n_size * 2];
    let mut n_edges_on_edge = vec![0i64; n_size];

    for i in 0..n_size {
        let g = edges.global_id[i];
        if g <= 0 {
            continue;
        }
        let row = (g - 1) as usize;
        cells_on_edge[i * 2..(i + 1) * 2].copy_from_slice(&cells_on_edge_g[row * 2..(row + 1) * 2]);
        edges_on_edge[i * eoe_width..(i + 1) * eoe_width]
            .copy_from_slice(&edges_on_edge_g[row * eoe_width..(row + 1) * eoe_width]);
        vertices_on_edge[i * 2..(i + 1) * 2].copy_from_slice(&vertices_on_edge_g[row * 2..(row + 1) * 2]);
        n_edges_on_edge[i] = n_edges_on_edge_g[row];
    }
    (cells_on_edge, edges_on_edge, vertices_on_edge, n_edges_on_edge)
}

fn extract_vertex_rows(
    vertices: &ElementSpace,
    cells_on_vertex_g: &[i64],
    edges_on_vertex_g: &[i64],
    vertex_degree: usize,
) -> (Vec<i64>, Vec<i64>) {
    let n_size = vertices.n_size;
    let mut cells_on_vertex = vec![0i64; n_size * vertex_degree];
    let mut edges_on_vertex = vec![0i64; n_size * vertex_degree];
    for i in 0..n_size {
        let g = vertices.global_id[i];
        if g <= 0 {
            continue;
        }
        let row = (g - 1) as usize;
        cells_on_vertex[i * vertex_degree..(i + 1) * vertex_degree]
            .copy_from_slice(&cells_on_vertex_g[row * vertex_degree..(row + 1) * vertex_degree]);
        edges_on_vertex[i * vertex_degree..(i + 1) * vertex_degree]
            .copy_from_slice(&edges_on_vertex_g[row * vertex_degree..(row + 1) * vertex_degree]);
    }
    (cells_on_vertex, edges_on_vertex)
}

fn build_global_to_local(space: &ElementSpace) -> HashMap<i64, usize> {
    let mut map = HashMap::with_capacity(space.n_all);
    for i in 0..space.n_all {
        let g = space.global_id[i];
        if g > 0 {
            map.insert(g, i);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chunk_gives_remainder_to_last_rank() {
        assert_eq!(linear_chunk(10, 0, 3), (0, 3));
        assert_eq!(linear_chunk(10, 1, 3), (3, 3));
        assert_eq!(linear_chunk(10, 2, 3), (6, 4));
    }

    #[test]
    fn owner_local_index_is_per_rank_sequence() {
        let owner_of = vec![0, 1, 0, 1, 0];
        let idx = owner_local_index(&owner_of, 2);
        assert_eq!(idx, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn first_halo_ring_of_edges_is_stored_in_descending_order() {
        // One owned cell (global index 0) incident to 4 global edges;
        // edge 1 is owned by this rank, edges 2-4 belong to the halo.
        let cell_groups = vec![vec![0usize]];
        let edges_on_cell_g = vec![1i64, 2, 3, 4];
        let owner_of = vec![0i32, 1, 1, 1];
        let owner_local_index_table = owner_local_index(&owner_of, 2);

        let edges = build_secondary_space(&cell_groups, &edges_on_cell_g, 4, &owner_of, 0, 1, 4, &owner_local_index_table);

        assert_eq!(edges.n_owned, 1);
        assert_eq!(edges.global_id, vec![1, 4, 3, 2, 0]);
    }
}

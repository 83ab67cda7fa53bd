//! Horizontal mesh geometry: fields read from the mesh file, remapped
//! to local order by [`Decomp`], and carried through one halo exchange
//! so every halo ring holds real geometric data.

use crate::array::MirroredArray;
use crate::config::Rearranger;
use crate::decomp::Decomp;
use crate::error::CoreResult;
use crate::halo::{self, Halo};
use crate::mach_env::MachEnv;
use crate::parallel_io::{DecompHandle, FileId, IoType, ParallelIo};

pub struct HorzMesh {
    pub x_cell: MirroredArray<f64>,
    pub y_cell: MirroredArray<f64>,
    pub z_cell: MirroredArray<f64>,
    pub lon_cell: MirroredArray<f64>,
    pub lat_cell: MirroredArray<f64>,

    pub x_edge: MirroredArray<f64>,
    pub y_edge: MirroredArray<f64>,
    pub z_edge: MirroredArray<f64>,
    pub lon_edge: MirroredArray<f64>,
    pub lat_edge: MirroredArray<f64>,

    pub x_vertex: MirroredArray<f64>,
    pub y_vertex: MirroredArray<f64>,
    pub z_vertex: MirroredArray<f64>,
    pub lon_vertex: MirroredArray<f64>,
    pub lat_vertex: MirroredArray<f64>,

    pub dv_edge: MirroredArray<f64>,
    pub dc_edge: MirroredArray<f64>,
    pub area_cell: MirroredArray<f64>,
    pub area_triangle: MirroredArray<f64>,
    /// `[NVerticesSize, VertexDegree]`.
    pub kite_areas_on_vertex: MirroredArray<f64>,
    pub angle_edge: MirroredArray<f64>,
    /// `[NEdgesSize, 2·MaxEdges]`.
    pub weights_on_edge: MirroredArray<f64>,
    /// `[NCellsSize, MaxEdges]`, computed locally, not read from file.
    pub edge_sign_on_cell: MirroredArray<f64>,
    /// `[NVerticesSize, VertexDegree]`, computed locally.
    pub edge_sign_on_vertex: MirroredArray<f64>,
    pub f_vertex: MirroredArray<f64>,
    pub bottom_depth: MirroredArray<f64>,
}

impl HorzMesh {
    pub fn build(env: &MachEnv, io: &ParallelIo, file: FileId, decomp: &Decomp, halo: &Halo) -> CoreResult<HorzMesh> {
        let cells = &decomp.cells;
        let edges = &decomp.edges;
        let vertices = &decomp.vertices;
        let max_edges = decomp.max_edges;
        let vertex_degree = decomp.vertex_degree;

        let cell_decomp = row_decomp(io, cells, 1, cells.n_global)?;
        let edge_decomp = row_decomp(io, edges, 1, edges.n_global)?;
        let vertex_decomp = row_decomp(io, vertices, 1, vertices.n_global)?;
        let vertex_row_decomp = row_decomp(io, vertices, vertex_degree, vertices.n_global)?;
        let weights_decomp = row_decomp(io, edges, 2 * max_edges, edges.n_global)?;

        let mut x_cell = read_field(io, file, cell_decomp, &["XCell", "xCell"], cells.n_size, 1)?;
        let mut y_cell = read_field(io, file, cell_decomp, &["YCell", "yCell"], cells.n_size, 1)?;
        let mut z_cell = read_field(io, file, cell_decomp, &["ZCell", "zCell"], cells.n_size, 1)?;
        let mut lon_cell = read_field(io, file, cell_decomp, &["LonCell", "lonCell"], cells.n_size, 1)?;
        let mut lat_cell = read_field(io, file, cell_decomp, &["LatCell", "latCell"], cells.n_size, 1)?;
        let mut area_cell = read_field(io, file, cell_decomp, &["AreaCell", "areaCell"], cells.n_size, 1)?;
        let mut bottom_depth = read_field(io, file, cell_decomp, &["BottomDepth", "bottomDepth"], cells.n_size, 1)?;

        let mut x_edge = read_field(io, file, edge_decomp, &["XEdge", "xEdge"], edges.n_size, 1)?;
        let mut y_edge = read_field(io, file, edge_decomp, &["YEdge", "yEdge"], edges.n_size, 1)?;
        let mut z_edge = read_field(io, file, edge_decomp, &["ZEdge", "zEdge"], edges.n_size, 1)?;
        let mut lon_edge = read_field(io, file, edge_decomp, &["LonEdge", "lonEdge"], edges.n_size, 1)?;
        let mut lat_edge = read_field(io, file, edge_decomp, &["LatEdge", "latEdge"], edges.n_size, 1)?;
        let mut dv_edge = read_field(io, file, edge_decomp, &["DvEdge", "dvEdge"], edges.n_size, 1)?;
        let mut dc_edge = read_field(io, file, edge_decomp, &["DcEdge", "dcEdge"], edges.n_size, 1)?;
        let mut angle_edge = read_field(io, file, edge_decomp, &["AngleEdge", "angleEdge"], edges.n_size, 1)?;
        let mut weights_on_edge = read_field(
            io,
            file,
            weights_decomp,
            &["WeightsOnEdge", "weightsOnEdge"],
            edges.n_size,
            2 * max_edges,
        )?;

        let mut x_vertex = read_field(io, file, vertex_decomp, &["XVertex", "xVertex"], vertices.n_size, 1)?;
        let mut y_vertex = read_field(io, file, vertex_decomp, &["YVertex", "yVertex"], vertices.n_size, 1)?;
        let mut z_vertex = read_field(io, file, vertex_decomp, &["ZVertex", "zVertex"], vertices.n_size, 1)?;
        let mut lon_vertex = read_field(io, file, vertex_decomp, &["LonVertex", "lonVertex"], vertices.n_size, 1)?;
        let mut lat_vertex = read_field(io, file, vertex_decomp, &["LatVertex", "latVertex"], vertices.n_size, 1)?;
        let mut area_triangle = read_field(
            io,
            file,
            vertex_decomp,
            &["AreaTriangle", "areaTriangle"],
            vertices.n_size,
            1,
        )?;
        let mut f_vertex = read_field(io, file, vertex_decomp, &["FVertex", "fVertex"], vertices.n_size, 1)?;
        let mut kite_areas_on_vertex = read_field(
            io,
            file,
            vertex_row_decomp,
            &["KiteAreasOnVertex", "kiteAreasOnVertex"],
            vertices.n_size,
            vertex_degree,
        )?;

        for field in [
            &mut x_cell, &mut y_cell, &mut z_cell, &mut lon_cell, &mut lat_cell, &mut area_cell, &mut bottom_depth,
        ] {
            halo::exchange(env, &halo.cells, field, cells.n_size)?;
        }
        for field in [
            &mut x_edge,
            &mut y_edge,
            &mut z_edge,
            &mut lon_edge,
            &mut lat_edge,
            &mut dv_edge,
            &mut dc_edge,
            &mut angle_edge,
            &mut weights_on_edge,
        ] {
            halo::exchange(env, &halo.edges, field, edges.n_size)?;
        }
        for field in [
            &mut x_vertex,
            &mut y_vertex,
            &mut z_vertex,
            &mut lon_vertex,
            &mut lat_vertex,
            &mut area_triangle,
            &mut f_vertex,
            &mut kite_areas_on_vertex,
        ] {
            halo::exchange(env, &halo.vertices, field, vertices.n_size)?;
        }

        io.destroy_decomp(cell_decomp);
        io.destroy_decomp(edge_decomp);
        io.destroy_decomp(vertex_decomp);
        io.destroy_decomp(vertex_row_decomp);
        io.destroy_decomp(weights_decomp);

        let edge_sign_on_cell = compute_edge_sign_on_cell(decomp);
        let edge_sign_on_vertex = compute_edge_sign_on_vertex(decomp);

        Ok(HorzMesh {
            x_cell,
            y_cell,
            z_cell,
            lon_cell,
            lat_cell,
            x_edge,
            y_edge,
            z_edge,
            lon_edge,
            lat_edge,
            x_vertex,
            y_vertex,
            z_vertex,
            lon_vertex,
            lat_vertex,
            dv_edge,
            dc_edge,
            area_cell,
            area_triangle,
            kite_areas_on_vertex,
            angle_edge,
            weights_on_edge,
            edge_sign_on_cell,
            edge_sign_on_vertex,
            f_vertex,
            bottom_depth,
        })
    }
}

/// A decomposition descriptor mapping one element kind's local slots
/// (each `row_width` wide) onto their row-major position in the
/// global file variable.
fn row_decomp(io: &ParallelIo, space: &crate::decomp::ElementSpace, row_width: usize, n_global: usize) -> CoreResult<DecompHandle> {
    let mut offsets = Vec::with_capacity(space.n_size * row_width);
    for &g in &space.global_id {
        if g <= 0 {
            offsets.extend(std::iter::repeat(-1i64).take(row_width));
        } else {
            let base = (g - 1) * row_width as i64;
            offsets.extend((0..row_width as i64).map(|k| base + k));
        }
    }
    let dims = if row_width == 1 {
        vec![n_global]
    } else {
        vec![n_global, row_width]
    };
    io.create_decomp(IoType::R8, &dims, space.n_size * row_width, &offsets, Rearranger::Box)
}

fn read_field(
    io: &ParallelIo,
    file: FileId,
    decomp: DecompHandle,
    candidates: &[&str],
    n_size: usize,
    row_width: usize,
) -> CoreResult<MirroredArray<f64>> {
    let mut buf = vec![0.0f64; n_size * row_width];
    io.read_array_named(&mut buf, candidates, file, decomp)?;
    let shape = if row_width == 1 { vec![n_size] } else { vec![n_size, row_width] };
    Ok(MirroredArray::from_host(&shape, buf))
}

/// `EdgeSignOnCell[c,i] = +1` if cell `c` is `CellsOnEdge[e,0]` for the
/// edge in slot `i`, else `-1`; `0` where the slot is unused.
fn compute_edge_sign_on_cell(decomp: &Decomp) -> MirroredArray<f64> {
    let n_size = decomp.cells.n_size;
    let max_edges = decomp.max_edges;
    let mut out = vec![0.0f64; n_size * max_edges];
    for c in 0..n_size {
        for i in 0..max_edges {
            let e = decomp.edges_on_cell[c * max_edges + i];
            if e == decomp.edges.n_all {
                continue;
            }
            let first_cell = decomp.cells_on_edge[e * 2];
            out[c * max_edges + i] = if first_cell == c { 1.0 } else { -1.0 };
        }
    }
    MirroredArray::from_host(&[n_size, max_edges], out)
}

/// `EdgeSignOnVertex[v,i] = +1` if vertex `v` is `VerticesOnEdge[e,0]`
/// for the edge in slot `i`, else `-1`.
fn compute_edge_sign_on_vertex(decomp: &Decomp) -> MirroredArray<f64> {
    let n_size = decomp.vertices.n_size;
    let degree = decomp.vertex_degree;
    let mut out = vec![0.0f64; n_size * degree];
    for v in 0..n_size {
        for i in 0..degree {
            let e = decomp.edges_on_vertex[v * degree + i];
            if e == decomp.edges.n_all {
                continue;
            }
            let first_vertex = decomp.vertices_on_edge[e * 2];
            out[v * degree + i] = if first_vertex == v { 1.0 } else { -1.0 };
        }
    }
    MirroredArray::from_host(&[n_size, degree], out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomp::ElementSpace;

    fn two_cell_decomp() -> Decomp {
        let cells = ElementSpace {
            n_owned: 2,
            n_halo: vec![2],
            n_all: 2,
            n_size: 3,
            n_global: 2,
            global_id: vec![1, 2, 0],
            loc: vec![(0, 0), (0, 1), (0, 2)],
        };
        let edges = ElementSpace {
            n_owned: 1,
            n_halo: vec![1],
            n_all: 1,
            n_size: 2,
            n_global: 1,
            global_id: vec![1, 0],
            loc: vec![(0, 0), (0, 1)],
        };
        let vertices = ElementSpace {
            n_owned: 0,
            n_halo: vec![0],
            n_all: 0,
            n_size: 1,
            n_global: 0,
            global_id: vec![0],
            loc: vec![(0, 0)],
        };
        Decomp {
            halo_width: 1,
            max_edges: 1,
            vertex_degree: 1,
            cells,
            edges,
            vertices,
            cells_on_cell: vec![1, 2, 2],
            edges_on_cell: vec![0, 0, 1],
            vertices_on_cell: vec![0, 0, 0],
            n_edges_on_cell: vec![1, 1, 0],
            cells_on_edge: vec![0, 1, 2, 2],
            edges_on_edge: vec![],
            vertices_on_edge: vec![0, 0],
            n_edges_on_edge: vec![0, 0],
            cells_on_vertex: vec![],
            edges_on_vertex: vec![],
        }
    }

    #[test]
    fn edge_sign_on_cell_is_plus_minus_one_for_the_shared_edge() {
        let decomp = two_cell_decomp();
        let signs = compute_edge_sign_on_cell(&decomp);
        assert_eq!(*signs.get(&[0, 0]), 1.0);
        assert_eq!(*signs.get(&[1, 0]), -1.0);
    }
}

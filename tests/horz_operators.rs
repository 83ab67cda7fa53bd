//! Property tests for the point-wise operators, built against a small
//! hand-assembled mesh rather than a real mesh file — these exercise
//! the arithmetic contract, not geometry loading.

use oceanmesh_core::array::MirroredArray;
use oceanmesh_core::decomp::{Decomp, ElementSpace};
use oceanmesh_core::horz_mesh::HorzMesh;
use oceanmesh_core::horz_operators::{DivergenceOnCell, GradientOnEdge};

fn zeros(shape: &[usize]) -> MirroredArray<f64> {
    MirroredArray::zeros(shape)
}

/// One cell with two edges whose signs and lengths cancel exactly —
/// the arithmetic a genuinely closed cell boundary produces for a
/// constant flux.
fn cancelling_two_edge_mesh() -> (Decomp, HorzMesh) {
    let cells = ElementSpace {
        n_owned: 1,
        n_halo: vec![1],
        n_all: 1,
        n_size: 2,
        n_global: 1,
        global_id: vec![1, 0],
        loc: vec![(0, 0), (0, 1)],
    };
    let edges = ElementSpace {
        n_owned: 2,
        n_halo: vec![2],
        n_all: 2,
        n_size: 3,
        n_global: 2,
        global_id: vec![1, 2, 0],
        loc: vec![(0, 0), (0, 1), (0, 2)],
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

    let decomp = Decomp {
        halo_width: 1,
        max_edges: 2,
        vertex_degree: 1,
        cells,
        edges,
        vertices,
        cells_on_cell: vec![0, 0, 0, 0],
        edges_on_cell: vec![0, 1, 2, 2],
        vertices_on_cell: vec![0, 0, 0, 0],
        n_edges_on_cell: vec![2, 0],
        cells_on_edge: vec![0, 1, 0, 1, 1, 1],
        edges_on_edge: vec![oceanmesh_core::decomp::EdgeOnEdgeSlot::Sentinel; 12],
        vertices_on_edge: vec![0; 6],
        n_edges_on_edge: vec![0, 0, 0],
        cells_on_vertex: vec![0],
        edges_on_vertex: vec![0],
    };

    let mut edge_sign_on_cell = zeros(&[2, 2]);
    edge_sign_on_cell.host_mut()[0] = 1.0;
    edge_sign_on_cell.host_mut()[1] = -1.0;

    let mut dv_edge = zeros(&[3]);
    dv_edge.host_mut()[0] = 2.0;
    dv_edge.host_mut()[1] = 2.0;

    let mut area_cell = zeros(&[2]);
    area_cell.host_mut()[0] = 3.0;

    let mut dc_edge = zeros(&[3]);
    dc_edge.host_mut()[0] = 1.0;
    dc_edge.host_mut()[1] = 1.0;

    let mesh = HorzMesh {
        x_cell: zeros(&[2]),
        y_cell: zeros(&[2]),
        z_cell: zeros(&[2]),
        lon_cell: zeros(&[2]),
        lat_cell: zeros(&[2]),
        x_edge: zeros(&[3]),
        y_edge: zeros(&[3]),
        z_edge: zeros(&[3]),
        lon_edge: zeros(&[3]),
        lat_edge: zeros(&[3]),
        x_vertex: zeros(&[1]),
        y_vertex: zeros(&[1]),
        z_vertex: zeros(&[1]),
        lon_vertex: zeros(&[1]),
        lat_vertex: zeros(&[1]),
        dv_edge,
        dc_edge,
        area_cell,
        area_triangle: zeros(&[1]),
        kite_areas_on_vertex: zeros(&[1, 1]),
        angle_edge: zeros(&[3]),
        weights_on_edge: zeros(&[3, 4]),
        edge_sign_on_cell,
        edge_sign_on_vertex: zeros(&[1, 1]),
        f_vertex: zeros(&[1]),
        bottom_depth: zeros(&[2]),
    };

    (decomp, mesh)
}

#[test]
fn divergence_of_a_constant_flux_is_zero() {
    let (decomp, mesh) = cancelling_two_edge_mesh();
    let op = DivergenceOnCell::new(&mesh, &decomp);
    let flux = vec![7.0, 7.0, 0.0];
    assert_eq!(op.compute(0, 0, 1, &flux), 0.0);
}

#[test]
fn gradient_of_a_constant_field_is_zero() {
    let (decomp, mesh) = cancelling_two_edge_mesh();
    let op = GradientOnEdge::new(&mesh, &decomp);
    let phi = vec![4.0, 4.0];
    assert_eq!(op.compute(0, 0, 1, &phi), 0.0);
}

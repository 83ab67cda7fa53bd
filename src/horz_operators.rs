//! Point-wise differential operators over the horizontal mesh.
//!
//! Each operator is a small functor that owns a copy of exactly the
//! mesh arrays its formula needs, so it can be handed to a device
//! kernel by value. None of them touch halos — callers are expected to
//! exchange their input arrays first and dispatch a parallel-for over
//! the element range themselves.

use rayon::prelude::*;

use crate::decomp::{Decomp, EdgeOnEdgeSlot};
use crate::horz_mesh::HorzMesh;

/// Dispatches `f` over `0..n_elements` as a data-parallel host loop —
/// the "parallel-for over the appropriate element range" callers are
/// expected to provide around a functor's `compute`.
pub fn parallel_for<F: Fn(usize) + Sync>(n_elements: usize, f: F) {
    (0..n_elements).into_par_iter().for_each(f);
}

/// `∑ᵢ EdgeSignOnCell[c,i] · DvEdge[e] · flux[e,k] / AreaCell[c]`.
pub struct DivergenceOnCell {
    edge_sign_on_cell: Vec<f64>,
    edges_on_cell: Vec<usize>,
    n_edges_on_cell: Vec<u32>,
    dv_edge: Vec<f64>,
    area_cell: Vec<f64>,
    max_edges: usize,
}

impl DivergenceOnCell {
    pub fn new(mesh: &HorzMesh, decomp: &Decomp) -> Self {
        Self {
            edge_sign_on_cell: mesh.edge_sign_on_cell.host().to_vec(),
            edges_on_cell: decomp.edges_on_cell.clone(),
            n_edges_on_cell: decomp.n_edges_on_cell.clone(),
            dv_edge: mesh.dv_edge.host().to_vec(),
            area_cell: mesh.area_cell.host().to_vec(),
            max_edges: decomp.max_edges,
        }
    }

    /// `flux` is `[NEdgesSize, NVertLayers]` row-major; `k` the layer index.
    pub fn compute(&self, c: usize, k: usize, n_vert_layers: usize, flux: &[f64]) -> f64 {
        let mut sum = 0.0;
        for i in 0..self.n_edges_on_cell[c] as usize {
            let slot = c * self.max_edges + i;
            let e = self.edges_on_cell[slot];
            sum += self.edge_sign_on_cell[slot] * self.dv_edge[e] * flux[e * n_vert_layers + k];
        }
        sum / self.area_cell[c]
    }
}

/// `(φ_{c1} − φ_{c0}) / DcEdge[e]`.
pub struct GradientOnEdge {
    cells_on_edge: Vec<usize>,
    dc_edge: Vec<f64>,
}

impl GradientOnEdge {
    pub fn new(mesh: &HorzMesh, decomp: &Decomp) -> Self {
        Self {
            cells_on_edge: decomp.cells_on_edge.clone(),
            dc_edge: mesh.dc_edge.host().to_vec(),
        }
    }

    /// `phi` is `[NCellsSize, NVertLayers]` row-major.
    pub fn compute(&self, e: usize, k: usize, n_vert_layers: usize, phi: &[f64]) -> f64 {
        let c0 = self.cells_on_edge[e * 2];
        let c1 = self.cells_on_edge[e * 2 + 1];
        (phi[c1 * n_vert_layers + k] - phi[c0 * n_vert_layers + k]) / self.dc_edge[e]
    }
}

/// `∑ᵢ EdgeSignOnVertex[v,i] · DcEdge[e] · u_e[e,k] / AreaTriangle[v]`.
pub struct CurlOnVertex {
    edge_sign_on_vertex: Vec<f64>,
    edges_on_vertex: Vec<usize>,
    dc_edge: Vec<f64>,
    area_triangle: Vec<f64>,
    vertex_degree: usize,
}

impl CurlOnVertex {
    pub fn new(mesh: &HorzMesh, decomp: &Decomp) -> Self {
        Self {
            edge_sign_on_vertex: mesh.edge_sign_on_vertex.host().to_vec(),
            edges_on_vertex: decomp.edges_on_vertex.clone(),
            dc_edge: mesh.dc_edge.host().to_vec(),
            area_triangle: mesh.area_triangle.host().to_vec(),
            vertex_degree: decomp.vertex_degree,
        }
    }

    /// `u_e` is `[NEdgesSize, NVertLayers]` row-major.
    pub fn compute(&self, v: usize, k: usize, n_vert_layers: usize, u_e: &[f64]) -> f64 {
        let mut sum = 0.0;
        for i in 0..self.vertex_degree {
            let slot = v * self.vertex_degree + i;
            let e = self.edges_on_vertex[slot];
            sum += self.edge_sign_on_vertex[slot] * self.dc_edge[e] * u_e[e * n_vert_layers + k];
        }
        sum / self.area_triangle[v]
    }
}

/// `∑ⱼ WeightsOnEdge[e,j] · u_{EdgesOnEdge[e,j]}`; sentinel neighbors
/// contribute zero.
pub struct TangentialReconstructionOnEdge {
    weights_on_edge: Vec<f64>,
    edges_on_edge: Vec<EdgeOnEdgeSlot>,
    row_width: usize,
}

impl TangentialReconstructionOnEdge {
    pub fn new(mesh: &HorzMesh, decomp: &Decomp) -> Self {
        Self {
            weights_on_edge: mesh.weights_on_edge.host().to_vec(),
            edges_on_edge: decomp.edges_on_edge.clone(),
            row_width: 2 * decomp.max_edges,
        }
    }

    /// `u_e` is `[NEdgesSize, NVertLayers]` row-major.
    pub fn compute(&self, e: usize, k: usize, n_vert_layers: usize, u_e: &[f64]) -> f64 {
        let mut sum = 0.0;
        for j in 0..self.row_width {
            let slot = e * self.row_width + j;
            if let EdgeOnEdgeSlot::Valid(e2) = self.edges_on_edge[slot] {
                sum += self.weights_on_edge[slot] * u_e[e2 * n_vert_layers + k];
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangential_reconstruction_skips_sentinel_neighbors() {
        let op = TangentialReconstructionOnEdge {
            weights_on_edge: vec![0.5, 0.5],
            edges_on_edge: vec![EdgeOnEdgeSlot::Valid(1), EdgeOnEdgeSlot::Sentinel],
            row_width: 2,
        };
        let u_e = vec![10.0, 20.0];
        assert_eq!(op.compute(0, 0, 1, &u_e), 0.5 * 20.0);
    }

    #[test]
    fn parallel_for_visits_every_index_exactly_once() {
        let visited: std::sync::Mutex<Vec<usize>> = std::sync::Mutex::new(Vec::new());
        parallel_for(5, |i| visited.lock().unwrap().push(i));
        let mut v = visited.into_inner().unwrap();
        v.sort_unstable();
        assert_eq!(v, vec![0, 1, 2, 3, 4]);
    }
}

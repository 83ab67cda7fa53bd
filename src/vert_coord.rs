//! Per-column vertical coordinate math: hydrostatic pressure, z-height,
//! target thickness, and geopotential, plus the min/max active-layer
//! tables at edges and vertices derived from the per-cell masks.
//!
//! Parallelised over columns; each column's recurrence is strictly
//! serial (interface `k+1` depends on interface `k`), so every
//! `compute_*` method here takes one column's slices and is meant to
//! be dispatched from a parallel-for over cells, not called with a
//! whole-mesh array.

use crate::config::{MovementWeightType, Rearranger, VertCoordConfig};
use crate::decomp::Decomp;
use crate::error::CoreResult;
use crate::parallel_io::{DecompHandle, FileId, IoType, ParallelIo};

/// Standard gravitational acceleration, m/s^2.
const GRAVITY: f64 = 9.80665;
/// Reference (Boussinesq) density, kg/m^3.
const RHO0: f64 = 1000.0;

pub struct VertCoord {
    pub n_vert_layers: usize,
    /// Inclusive active-layer range per cell; `max_layer_cell[c] < 0` marks a dry column.
    pub min_layer_cell: Vec<i32>,
    pub max_layer_cell: Vec<i32>,
    pub min_layer_edge_top: Vec<i32>,
    pub min_layer_edge_bot: Vec<i32>,
    pub max_layer_edge_top: Vec<i32>,
    pub max_layer_edge_bot: Vec<i32>,
    pub min_layer_vertex_top: Vec<i32>,
    pub min_layer_vertex_bot: Vec<i32>,
    pub max_layer_vertex_top: Vec<i32>,
    pub max_layer_vertex_bot: Vec<i32>,
    /// Per-layer share of a surface-pressure perturbation, `[NVertLayers]`.
    pub movement_weights: Vec<f64>,
}

impl VertCoord {
    pub fn build(io: &ParallelIo, file: FileId, decomp: &Decomp, config: &VertCoordConfig) -> CoreResult<VertCoord> {
        let n_vert_layers = io.read_dimension_named(&["NVertLevels", "nVertLevels"], file)?;

        let cell_decomp = cell_decomp_1d(io, decomp)?;
        let mut min_layer_cell_buf = vec![0i64; decomp.cells.n_size];
        io.read_array_i64_named(&mut min_layer_cell_buf, &["MinLayerCell", "minLayerCell"], file, cell_decomp)?;
        let mut max_layer_cell_buf = vec![0i64; decomp.cells.n_size];
        io.read_array_i64_named(&mut max_layer_cell_buf, &["MaxLayerCell", "maxLayerCell"], file, cell_decomp)?;
        io.destroy_decomp(cell_decomp);

        let min_layer_cell: Vec<i32> = min_layer_cell_buf.iter().map(|&x| x as i32).collect();
        let max_layer_cell: Vec<i32> = max_layer_cell_buf.iter().map(|&x| x as i32).collect();

        let (min_layer_edge_top, min_layer_edge_bot, max_layer_edge_top, max_layer_edge_bot) =
            min_max_layer_edge(decomp, &min_layer_cell, &max_layer_cell);
        let (min_layer_vertex_top, min_layer_vertex_bot, max_layer_vertex_top, max_layer_vertex_bot) =
            min_max_layer_vertex(decomp, &min_layer_cell, &max_layer_cell);

        let movement_weights = init_movement_weights(config.movement_weight_type, n_vert_layers);

        Ok(VertCoord {
            n_vert_layers,
            min_layer_cell,
            max_layer_cell,
            min_layer_edge_top,
            min_layer_edge_bot,
            max_layer_edge_top,
            max_layer_edge_bot,
            min_layer_vertex_top,
            min_layer_vertex_bot,
            max_layer_vertex_top,
            max_layer_vertex_bot,
            movement_weights,
        })
    }

    /// Interface pressure `p_iface[KMin..=KMax+1]` and midpoint pressure
    /// `p_mid[KMin..=KMax]` for one column. No-op on a dry column.
    pub fn compute_pressure(&self, c: usize, h: &[f64], p0: f64, p_iface: &mut [f64], p_mid: &mut [f64]) {
        let Some((k_min, k_max)) = self.active_range(c) else { return };
        p_iface[k_min] = p0;
        for k in k_min..=k_max {
            p_iface[k + 1] = p_iface[k] + GRAVITY * RHO0 * h[k];
            p_mid[k] = 0.5 * (p_iface[k] + p_iface[k + 1]);
        }
    }

    /// Z-height accumulated from the bottom upward: `dz = specVol · dPiface / g`.
    /// `dp_iface[k]` is layer `k`'s interface pressure thickness.
    pub fn compute_z_height(&self, c: usize, bottom_depth: f64, spec_vol: &[f64], dp_iface: &[f64], z_iface: &mut [f64], z_mid: &mut [f64]) {
        let Some((k_min, k_max)) = self.active_range(c) else { return };
        z_iface[k_max + 1] = -bottom_depth;
        for k in (k_min..=k_max).rev() {
            z_iface[k] = z_iface[k + 1] + spec_vol[k] * dp_iface[k] / GRAVITY;
            z_mid[k] = 0.5 * (z_iface[k] + z_iface[k + 1]);
        }
    }

    /// `h_target[c,k] = h_ref[c,k] + w[k] · ΔP / (g·ρ₀·W[c])`, `W[c]`
    /// summed over this column's active layers.
    pub fn compute_target_thickness(&self, c: usize, h_ref: &[f64], delta_p: f64, h_target: &mut [f64]) {
        let Some((k_min, k_max)) = self.active_range(c) else { return };
        let w_total: f64 = self.movement_weights[k_min..=k_max].iter().sum();
        if w_total <= 0.0 {
            h_target[k_min..=k_max].copy_from_slice(&h_ref[k_min..=k_max]);
            return;
        }
        for k in k_min..=k_max {
            h_target[k] = h_ref[k] + self.movement_weights[k] * delta_p / (GRAVITY * RHO0 * w_total);
        }
    }

    /// Midpoint geopotential: `g·ZMid[c,k] + TidalPotential[c] + SelfAttractionLoading[c]`.
    pub fn compute_geopotential(
        &self,
        c: usize,
        z_mid: &[f64],
        tidal_potential: f64,
        self_attraction_loading: f64,
        geopot_mid: &mut [f64],
    ) {
        let Some((k_min, k_max)) = self.active_range(c) else { return };
        for k in k_min..=k_max {
            geopot_mid[k] = GRAVITY * z_mid[k] + tidal_potential + self_attraction_loading;
        }
    }

    fn active_range(&self, c: usize) -> Option<(usize, usize)> {
        let k_max = self.max_layer_cell[c];
        if k_max < 0 {
            return None;
        }
        Some((self.min_layer_cell[c].max(0) as usize, k_max as usize))
    }
}

fn cell_decomp_1d(io: &ParallelIo, decomp: &Decomp) -> CoreResult<DecompHandle> {
    let cells = &decomp.cells;
    let offsets: Vec<i64> = cells.global_id.iter().map(|&g| if g <= 0 { -1 } else { g - 1 }).collect();
    io.create_decomp(IoType::I8, &[cells.n_global], cells.n_size, &offsets, Rearranger::Box)
}

/// Edge min/max layer reductions over the edge's two incident cells:
/// top = min of the two cells' values, bot = max.
fn min_max_layer_edge(decomp: &Decomp, min_layer_cell: &[i32], max_layer_cell: &[i32]) -> (Vec<i32>, Vec<i32>, Vec<i32>, Vec<i32>) {
    let n_size = decomp.edges.n_size;
    let mut min_top = vec![-1i32; n_size];
    let mut min_bot = vec![-1i32; n_size];
    let mut max_top = vec![-1i32; n_size];
    let mut max_bot = vec![-1i32; n_size];
    for e in 0..n_size {
        let c0 = decomp.cells_on_edge[e * 2];
        let c1 = decomp.cells_on_edge[e * 2 + 1];
        if c0 == decomp.cells.n_all || c1 == decomp.cells.n_all {
            continue;
        }
        min_top[e] = min_layer_cell[c0].min(min_layer_cell[c1]);
        min_bot[e] = min_layer_cell[c0].max(min_layer_cell[c1]);
        max_top[e] = max_layer_cell[c0].min(max_layer_cell[c1]);
        max_bot[e] = max_layer_cell[c0].max(max_layer_cell[c1]);
    }
    (min_top, min_bot, max_top, max_bot)
}

/// Vertex min/max layer reductions over the `VertexDegree` incident cells.
fn min_max_layer_vertex(decomp: &Decomp, min_layer_cell: &[i32], max_layer_cell: &[i32]) -> (Vec<i32>, Vec<i32>, Vec<i32>, Vec<i32>) {
    let n_size = decomp.vertices.n_size;
    let degree = decomp.vertex_degree;
    let mut min_top = vec![-1i32; n_size];
    let mut min_bot = vec![-1i32; n_size];
    let mut max_top = vec![-1i32; n_size];
    let mut max_bot = vec![-1i32; n_size];
    for v in 0..n_size {
        let mut mins = Vec::with_capacity(degree);
        let mut maxs = Vec::with_capacity(degree);
        for i in 0..degree {
            let c = decomp.cells_on_vertex[v * degree + i];
            if c != decomp.cells.n_all {
                mins.push(min_layer_cell[c]);
                maxs.push(max_layer_cell[c]);
            }
        }
        let (Some(&min_of), Some(&max_of)) = (mins.iter().min(), maxs.iter().max()) else { continue };
        min_top[v] = min_of;
        min_bot[v] = *mins.iter().max().unwrap();
        max_top[v] = *maxs.iter().min().unwrap();
        max_bot[v] = max_of;
    }
    (min_top, min_bot, max_top, max_bot)
}

fn init_movement_weights(profile: MovementWeightType, n_vert_layers: usize) -> Vec<f64> {
    match profile {
        MovementWeightType::Fixed => {
            let mut w = vec![0.0; n_vert_layers];
            if n_vert_layers > 0 {
                w[0] = 1.0;
            }
            w
        }
        MovementWeightType::Uniform => {
            vec![1.0 / n_vert_layers.max(1) as f64; n_vert_layers]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_profile_puts_all_weight_in_layer_zero() {
        let w = init_movement_weights(MovementWeightType::Fixed, 4);
        assert_eq!(w, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn uniform_profile_shares_weight_equally() {
        let w = init_movement_weights(MovementWeightType::Uniform, 4);
        assert_eq!(w, vec![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn pressure_accumulates_hydrostatically() {
        let vc = VertCoord {
            n_vert_layers: 2,
            min_layer_cell: vec![0],
            max_layer_cell: vec![1],
            min_layer_edge_top: vec![],
            min_layer_edge_bot: vec![],
            max_layer_edge_top: vec![],
            max_layer_edge_bot: vec![],
            min_layer_vertex_top: vec![],
            min_layer_vertex_bot: vec![],
            max_layer_vertex_top: vec![],
            max_layer_vertex_bot: vec![],
            movement_weights: vec![0.5, 0.5],
        };
        let h = [10.0, 20.0];
        let mut p_iface = vec![0.0; 3];
        let mut p_mid = vec![0.0; 2];
        vc.compute_pressure(0, &h, 1000.0, &mut p_iface, &mut p_mid);
        assert_eq!(p_iface[0], 1000.0);
        assert!((p_iface[1] - (1000.0 + GRAVITY * RHO0 * 10.0)).abs() < 1e-9);
        assert!((p_iface[2] - p_iface[1] - GRAVITY * RHO0 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn dry_column_is_a_no_op() {
        let vc = VertCoord {
            n_vert_layers: 2,
            min_layer_cell: vec![0],
            max_layer_cell: vec![-1],
            min_layer_edge_top: vec![],
            min_layer_edge_bot: vec![],
            max_layer_edge_top: vec![],
            max_layer_edge_bot: vec![],
            min_layer_vertex_top: vec![],
            min_layer_vertex_bot: vec![],
            max_layer_vertex_top: vec![],
            max_layer_vertex_bot: vec![],
            movement_weights: vec![0.5, 0.5],
        };
        let mut p_iface = vec![7.0; 3];
        let mut p_mid = vec![7.0; 2];
        vc.compute_pressure(0, &[1.0, 2.0], 1000.0, &mut p_iface, &mut p_mid);
        assert_eq!(p_iface, vec![7.0; 3]);
    }

    #[test]
    fn geopotential_adds_tidal_and_self_attraction_terms_to_gz() {
        let vc = VertCoord {
            n_vert_layers: 2,
            min_layer_cell: vec![0],
            max_layer_cell: vec![1],
            min_layer_edge_top: vec![],
            min_layer_edge_bot: vec![],
            max_layer_edge_top: vec![],
            max_layer_edge_bot: vec![],
            min_layer_vertex_top: vec![],
            min_layer_vertex_bot: vec![],
            max_layer_vertex_top: vec![],
            max_layer_vertex_bot: vec![],
            movement_weights: vec![0.5, 0.5],
        };
        let z_mid = [-5.0, -15.0];
        let mut geopot_mid = vec![0.0; 2];
        vc.compute_geopotential(0, &z_mid, 0.1, 0.2, &mut geopot_mid);
        assert!((geopot_mid[0] - (GRAVITY * -5.0 + 0.1 + 0.2)).abs() < 1e-9);
        assert!((geopot_mid[1] - (GRAVITY * -15.0 + 0.1 + 0.2)).abs() < 1e-9);
    }
}

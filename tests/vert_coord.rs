//! Property tests for the vertical-coordinate recurrences.

use oceanmesh_core::vert_coord::VertCoord;

const GRAVITY: f64 = 9.80665;
const RHO0: f64 = 1000.0;

fn vert_coord(min_layer: i32, max_layer: i32, n_layers: usize) -> VertCoord {
    VertCoord {
        n_vert_layers: n_layers,
        min_layer_cell: vec![min_layer],
        max_layer_cell: vec![max_layer],
        min_layer_edge_top: vec![],
        min_layer_edge_bot: vec![],
        max_layer_edge_top: vec![],
        max_layer_edge_bot: vec![],
        min_layer_vertex_top: vec![],
        min_layer_vertex_bot: vec![],
        max_layer_vertex_top: vec![],
        max_layer_vertex_bot: vec![],
        movement_weights: vec![1.0 / n_layers as f64; n_layers],
    }
}

#[test]
fn pressure_with_unit_thickness_increments_by_one_per_layer() {
    let vc = vert_coord(0, 3, 4);
    let h = vec![1.0 / (GRAVITY * RHO0); 4];
    let mut p_iface = vec![0.0; 5];
    let mut p_mid = vec![0.0; 4];
    vc.compute_pressure(0, &h, 1.0, &mut p_iface, &mut p_mid);

    for k in 0..=4 {
        assert!((p_iface[k] - (k as f64 + 1.0)).abs() < 1e-9);
    }
}

#[test]
fn pressure_with_linear_thickness_profile_matches_triangular_numbers() {
    let vc = vert_coord(0, 3, 4);
    let c0 = 5.0;
    let h: Vec<f64> = (0..4).map(|k| (k as f64 + 1.0) / (GRAVITY * RHO0)).collect();
    let mut p_iface = vec![0.0; 5];
    let mut p_mid = vec![0.0; 4];
    vc.compute_pressure(0, &h, c0, &mut p_iface, &mut p_mid);

    for k in 0..=4 {
        let triangular = (k * (k + 1)) as f64 / 2.0;
        assert!((p_iface[k] - (triangular + c0)).abs() < 1e-9);
    }
}

#[test]
fn dry_column_contributes_nothing_to_pressure_integral() {
    let vc = vert_coord(0, -1, 4);
    let h = vec![1.0; 4];
    let mut p_iface = vec![-7.0; 5];
    let mut p_mid = vec![-7.0; 4];
    vc.compute_pressure(0, &h, 1.0, &mut p_iface, &mut p_mid);
    assert_eq!(p_iface, vec![-7.0; 5]);
    assert_eq!(p_mid, vec![-7.0; 4]);
}

#[test]
fn target_thickness_with_zero_perturbation_equals_reference() {
    let vc = vert_coord(0, 2, 3);
    let h_ref = vec![10.0, 20.0, 30.0];
    let mut h_target = vec![0.0; 3];
    vc.compute_target_thickness(0, &h_ref, 0.0, &mut h_target);
    assert_eq!(h_target, h_ref);
}

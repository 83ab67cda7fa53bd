//! Write-then-read round trip for the decomposed array primitives:
//! writing any supported typed array and reading it back must return
//! the same data bit-for-bit on owned indices.

use oceanmesh_core::config::Rearranger;
use oceanmesh_core::parallel_io::{FileMode, IoType, ParallelIo};

#[test]
fn f64_array_round_trips_through_a_real_hdf5_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mesh.h5");
    let io = ParallelIo::new();

    let global_offsets = vec![0i64, 1, 2, 3, -1];
    let written = [10.5, 20.25, 30.125, 40.0, -999.0];

    let file = io.open_file(&path, FileMode::WriteFailIfExists).unwrap();
    let decomp = io
        .create_decomp(IoType::R8, &[4], 5, &global_offsets, Rearranger::Box)
        .unwrap();
    io.write_array(&written, -999.0, file, decomp, "areaCell").unwrap();
    io.destroy_decomp(decomp);
    io.close_file(file);

    let file = io.open_file(&path, FileMode::Read).unwrap();
    let decomp = io
        .create_decomp(IoType::R8, &[4], 5, &global_offsets, Rearranger::Box)
        .unwrap();
    let mut read_back = [0.0; 5];
    io.read_array(&mut read_back, "areaCell", file, decomp).unwrap();

    assert_eq!(read_back[0..4], written[0..4]);
    // slot 4 is unowned (-1 offset); read_array must leave it untouched.
    assert_eq!(read_back[4], 0.0);
}

#[test]
fn i64_array_round_trips_through_a_real_hdf5_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decomp.h5");
    let io = ParallelIo::new();

    let global_offsets = vec![1i64, 0, -1];
    let written = [42i64, 7, 0];

    let file = io.open_file(&path, FileMode::WriteFailIfExists).unwrap();
    let decomp = io
        .create_decomp(IoType::I8, &[2], 3, &global_offsets, Rearranger::Box)
        .unwrap();
    io.write_array_i64(&written, -1, file, decomp, "cellsOnEdge").unwrap();
    io.destroy_decomp(decomp);
    io.close_file(file);

    let file = io.open_file(&path, FileMode::Read).unwrap();
    let decomp = io
        .create_decomp(IoType::I8, &[2], 3, &global_offsets, Rearranger::Box)
        .unwrap();
    let mut read_back = [0i64; 3];
    io.read_array_i64(&mut read_back, "cellsOnEdge", file, decomp).unwrap();

    assert_eq!(read_back[0], written[0]);
    assert_eq!(read_back[1], written[1]);
}

#[test]
fn metadata_string_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attrs.h5");
    let io = ParallelIo::new();

    let file = io.open_file(&path, FileMode::WriteFailIfExists).unwrap();
    io.write_metadata_string(file, "on_a_sphere", "YES").unwrap();
    io.close_file(file);

    let file = io.open_file(&path, FileMode::Read).unwrap();
    let value = io.read_metadata_string(file, "on_a_sphere").unwrap();
    assert_eq!(value, "YES");
}

#[test]
fn read_array_named_falls_back_to_a_legacy_candidate_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.h5");
    let io = ParallelIo::new();

    let global_offsets = vec![0i64, 1];
    let written = [1.0, 2.0];

    let file = io.open_file(&path, FileMode::WriteFailIfExists).unwrap();
    let decomp = io
        .create_decomp(IoType::R8, &[2], 2, &global_offsets, Rearranger::Box)
        .unwrap();
    io.write_array(&written, 0.0, file, decomp, "xCell").unwrap();
    io.destroy_decomp(decomp);
    io.close_file(file);

    let file = io.open_file(&path, FileMode::Read).unwrap();
    let decomp = io
        .create_decomp(IoType::R8, &[2], 2, &global_offsets, Rearranger::Box)
        .unwrap();
    let mut read_back = [0.0; 2];
    let matched = io
        .read_array_named(&mut read_back, &["XCell", "xCell"], file, decomp)
        .unwrap();

    assert_eq!(matched, "xCell");
    assert_eq!(read_back, written);
}

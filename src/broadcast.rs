//! Typed, blocking broadcast over a [`MachEnv`] group.
//!
//! A no-op on non-member ranks — never an error, since a non-member
//! simply has nothing to receive.

use mpi::topology::Communicator;
use mpi::traits::{Equivalence, Root};

use crate::mach_env::MachEnv;

/// Broadcast a single scalar value from `root` to every rank in `env`.
pub fn broadcast_scalar<T: Equivalence + Copy>(env: &MachEnv, value: &mut T, root: i32) {
    let Some(comm) = env.comm() else { return };
    comm.process_at_rank(root).broadcast_into(value);
}

/// Broadcast a `Vec<T>` from `root`. The length travels first so
/// non-root ranks can size their receive buffer.
pub fn broadcast_vec<T: Equivalence + Copy + Default>(env: &MachEnv, values: &mut Vec<T>, root: i32) {
    let Some(comm) = env.comm() else { return };
    let root_proc = comm.process_at_rank(root);

    let mut len = values.len() as i64;
    root_proc.broadcast_into(&mut len);

    if env.rank() != root {
        values.clear();
        values.resize(len as usize, T::default());
    }
    root_proc.broadcast_into(&mut values[..]);
}

/// Broadcast a `String` from `root`: size first, then raw bytes.
pub fn broadcast_string(env: &MachEnv, value: &mut String, root: i32) {
    let Some(comm) = env.comm() else { return };
    let root_proc = comm.process_at_rank(root);

    let mut len = value.len() as i64;
    root_proc.broadcast_into(&mut len);

    let mut bytes = if env.rank() == root {
        value.clone().into_bytes()
    } else {
        vec![0u8; len as usize]
    };
    root_proc.broadcast_into(&mut bytes[..]);

    if env.rank() != root {
        *value = String::from_utf8(bytes).unwrap_or_default();
    }
}

/// Broadcast a `bool` scalar (MPI has no native bool type on every
/// backend, so it travels as a byte).
pub fn broadcast_bool(env: &MachEnv, value: &mut bool, root: i32) {
    let Some(comm) = env.comm() else { return };
    let mut byte: u8 = if *value { 1 } else { 0 };
    comm.process_at_rank(root).broadcast_into(&mut byte);
    *value = byte != 0;
}

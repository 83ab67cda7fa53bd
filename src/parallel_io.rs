//! Typed, decomposition-aware file I/O.
//!
//! Wraps an HDF5 backend behind the three primitives the rest of the
//! core is written against: `create_decomp`, `read_array`,
//! `write_array`, plus typed scalar metadata. The real model links a
//! SCORPIO-style PnetCDF backend; no crate in this pack binds that, so
//! `hdf5` stands in (grounded in `other_examples`' arepo-grid reader,
//! which reads decomposed simulation state the same way). See
//! DESIGN.md for the scope of that substitution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::config::Rearranger;
use crate::error::{CoreError, CoreResult};

/// The six scalar types the core's I/O surface supports: two integer
/// widths, two float widths, bool, and string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    I4,
    I8,
    R4,
    R8,
    Bool,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    WriteFailIfExists,
    WriteReplace,
    WriteAppend,
}

/// Opaque handle to an open mesh/restart file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u64);

/// Opaque handle to a decomposition descriptor created by
/// [`ParallelIo::create_decomp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecompHandle(u64);

/// A decomposition descriptor: the map from this rank's local slots to
/// their position in the global row-major array, `-1` marking a slot
/// that must not be read from or written to (halo padding, the
/// sentinel slot).
struct DecompDescriptor {
    #[allow(dead_code)]
    io_type: IoType,
    dims: Vec<usize>,
    local_length: usize,
    global_offsets: Vec<i64>,
    #[allow(dead_code)]
    rearranger: Rearranger,
}

struct OpenFile {
    path: PathBuf,
    file: hdf5::File,
    mode: FileMode,
}

/// Process-wide handle to the I/O backend. One instance is created per
/// `MachEnv` at startup and shared by every component that reads or
/// writes mesh and restart data.
pub struct ParallelIo {
    files: RwLock<HashMap<u64, OpenFile>>,
    decomps: RwLock<HashMap<u64, DecompDescriptor>>,
    next_file_id: AtomicU64,
    next_decomp_id: AtomicU64,
    // hdf5 file handles are not `Sync` across unguarded concurrent
    // writers; serialize write_array/read_array bodies per-process.
    io_lock: Mutex<()>,
}

impl Default for ParallelIo {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelIo {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            decomps: RwLock::new(HashMap::new()),
            next_file_id: AtomicU64::new(1),
            next_decomp_id: AtomicU64::new(1),
            io_lock: Mutex::new(()),
        }
    }

    pub fn open_file(&self, path: impl AsRef<Path>, mode: FileMode) -> CoreResult<FileId> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            FileMode::Read => hdf5::File::open(&path),
            FileMode::WriteFailIfExists => hdf5::File::create_excl(&path),
            FileMode::WriteReplace => hdf5::File::create(&path),
            FileMode::WriteAppend => hdf5::File::append(&path),
        };
        let file = file.map_err(|e| CoreError::InvalidArgument {
            message: format!("could not open {path:?} ({mode:?}): {e}"),
        })?;

        let id = self.next_file_id.fetch_add(1, Ordering::Relaxed);
        self.files
            .write()
            .unwrap()
            .insert(id, OpenFile { path, file, mode });
        Ok(FileId(id))
    }

    pub fn close_file(&self, file: FileId) {
        self.files.write().unwrap().remove(&file.0);
    }

    /// Register a decomposition: `global_offsets[i]` is local slot
    /// `i`'s zero-based row-major position in the global array, or `-1`
    /// if slot `i` must not be read or written.
    pub fn create_decomp(
        &self,
        io_type: IoType,
        dims: &[usize],
        local_length: usize,
        global_offsets: &[i64],
        rearranger: Rearranger,
    ) -> CoreResult<DecompHandle> {
        if global_offsets.len() != local_length {
            return Err(CoreError::InvalidArgument {
                message: format!(
                    "global_offsets has {} entries, expected local_length {local_length}",
                    global_offsets.len()
                ),
            });
        }
        let id = self.next_decomp_id.fetch_add(1, Ordering::Relaxed);
        self.decomps.write().unwrap().insert(
            id,
            DecompDescriptor {
                io_type,
                dims: dims.to_vec(),
                local_length,
                global_offsets: global_offsets.to_vec(),
                rearranger,
            },
        );
        Ok(DecompHandle(id))
    }

    pub fn destroy_decomp(&self, decomp: DecompHandle) {
        self.decomps.write().unwrap().remove(&decomp.0);
    }

    /// Read a decomposed array, trying each candidate name in turn.
    /// Returns `VariableNotFound` (recoverable) only after every
    /// candidate has failed — the dual-naming mesh reader relies on
    /// this to silently fall back from canonical to legacy names.
    pub fn read_array_named(
        &self,
        buf: &mut [f64],
        candidates: &[&str],
        file: FileId,
        decomp: DecompHandle,
    ) -> CoreResult<String> {
        for name in candidates {
            if self.read_array(buf, name, file, decomp).is_ok() {
                return Ok((*name).to_string());
            }
        }
        Err(CoreError::VariableNotFound {
            name: candidates.join(" | "),
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Read one decomposed array under an exact variable name.
    pub fn read_array(
        &self,
        buf: &mut [f64],
        var_name: &str,
        file: FileId,
        decomp: DecompHandle,
    ) -> CoreResult<()> {
        let _guard = self.io_lock.lock().unwrap();
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "read_array: unknown file handle".to_string(),
        })?;
        let decomps = self.decomps.read().unwrap();
        let desc = decomps
            .get(&decomp.0)
            .ok_or_else(|| CoreError::InvalidArgument {
                message: "read_array: unknown decomp handle".to_string(),
            })?;

        let dataset = open
            .file
            .dataset(var_name)
            .map_err(|_| CoreError::VariableNotFound {
                name: var_name.to_string(),
                candidates: vec![var_name.to_string()],
            })?;

        let global: Vec<f64> = dataset.read_raw::<f64>().map_err(|e| CoreError::InvalidArgument {
            message: format!("reading {var_name}: {e}"),
        })?;

        for (local_idx, &offset) in desc.global_offsets.iter().enumerate() {
            if offset < 0 {
                continue;
            }
            buf[local_idx] = global[offset as usize];
        }
        Ok(())
    }

    /// Write a decomposed array. Write failures abort the group — a
    /// caller that wants a retryable read uses [`Self::read_array_named`]
    /// instead, never this.
    pub fn write_array(
        &self,
        buf: &[f64],
        fill_value: f64,
        file: FileId,
        decomp: DecompHandle,
        var_name: &str,
    ) -> CoreResult<()> {
        let _guard = self.io_lock.lock().unwrap();
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "write_array: unknown file handle".to_string(),
        })?;
        let decomps = self.decomps.read().unwrap();
        let desc = decomps
            .get(&decomp.0)
            .ok_or_else(|| CoreError::InvalidArgument {
                message: "write_array: unknown decomp handle".to_string(),
            })?;

        let global_len: usize = desc.dims.iter().product();
        let mut global = vec![fill_value; global_len];
        for (local_idx, &offset) in desc.global_offsets.iter().enumerate() {
            if offset >= 0 {
                global[offset as usize] = buf[local_idx];
            }
        }

        let dataset = match open.file.dataset(var_name) {
            Ok(ds) => ds,
            Err(_) => open
                .file
                .new_dataset::<f64>()
                .shape(desc.dims.as_slice())
                .create(var_name)
                .map_err(|e| CoreError::InvalidArgument {
                    message: format!("creating dataset {var_name}: {e}"),
                })?,
        };
        dataset.write_raw(&global).map_err(|e| CoreError::InvalidArgument {
            message: format!("writing {var_name} (file {:?}): {e}", open.path),
        })
    }

    /// Read a decomposed integer array (connectivity tables are stored
    /// this way), trying each candidate name in turn.
    pub fn read_array_i64_named(
        &self,
        buf: &mut [i64],
        candidates: &[&str],
        file: FileId,
        decomp: DecompHandle,
    ) -> CoreResult<String> {
        for name in candidates {
            if self.read_array_i64(buf, name, file, decomp).is_ok() {
                return Ok((*name).to_string());
            }
        }
        Err(CoreError::VariableNotFound {
            name: candidates.join(" | "),
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn read_array_i64(
        &self,
        buf: &mut [i64],
        var_name: &str,
        file: FileId,
        decomp: DecompHandle,
    ) -> CoreResult<()> {
        let _guard = self.io_lock.lock().unwrap();
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "read_array_i64: unknown file handle".to_string(),
        })?;
        let decomps = self.decomps.read().unwrap();
        let desc = decomps
            .get(&decomp.0)
            .ok_or_else(|| CoreError::InvalidArgument {
                message: "read_array_i64: unknown decomp handle".to_string(),
            })?;

        let dataset = open
            .file
            .dataset(var_name)
            .map_err(|_| CoreError::VariableNotFound {
                name: var_name.to_string(),
                candidates: vec![var_name.to_string()],
            })?;

        let global: Vec<i64> = dataset.read_raw::<i64>().map_err(|e| CoreError::InvalidArgument {
            message: format!("reading {var_name}: {e}"),
        })?;

        for (local_idx, &offset) in desc.global_offsets.iter().enumerate() {
            if offset < 0 {
                continue;
            }
            buf[local_idx] = global[offset as usize];
        }
        Ok(())
    }

    pub fn write_array_i64(
        &self,
        buf: &[i64],
        fill_value: i64,
        file: FileId,
        decomp: DecompHandle,
        var_name: &str,
    ) -> CoreResult<()> {
        let _guard = self.io_lock.lock().unwrap();
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "write_array_i64: unknown file handle".to_string(),
        })?;
        let decomps = self.decomps.read().unwrap();
        let desc = decomps
            .get(&decomp.0)
            .ok_or_else(|| CoreError::InvalidArgument {
                message: "write_array_i64: unknown decomp handle".to_string(),
            })?;

        let global_len: usize = desc.dims.iter().product();
        let mut global = vec![fill_value; global_len];
        for (local_idx, &offset) in desc.global_offsets.iter().enumerate() {
            if offset >= 0 {
                global[offset as usize] = buf[local_idx];
            }
        }

        let dataset = match open.file.dataset(var_name) {
            Ok(ds) => ds,
            Err(_) => open
                .file
                .new_dataset::<i64>()
                .shape(desc.dims.as_slice())
                .create(var_name)
                .map_err(|e| CoreError::InvalidArgument {
                    message: format!("creating dataset {var_name}: {e}"),
                })?,
        };
        dataset.write_raw(&global).map_err(|e| CoreError::InvalidArgument {
            message: format!("writing {var_name} (file {:?}): {e}", open.path),
        })
    }

    /// Read a named dimension's extent, trying each candidate spelling
    /// in turn (e.g. `NCells` vs. legacy `nCells`).
    pub fn read_dimension_named(&self, candidates: &[&str], file: FileId) -> CoreResult<usize> {
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "read_dimension: unknown file handle".to_string(),
        })?;
        for name in candidates {
            if let Ok(dataset) = open.file.dataset(name) {
                if let Some(&extent) = dataset.shape().first() {
                    return Ok(extent);
                }
            }
        }
        Err(CoreError::DimensionNotFound {
            name: candidates.join(" | "),
        })
    }

    /// Read an entire 1-D or 2-D integer variable without a decomp —
    /// used during the linear pre-read, before any decomposition
    /// descriptor exists.
    pub fn read_whole_i64(&self, var_name: &str, file: FileId) -> CoreResult<(Vec<i64>, Vec<usize>)> {
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "read_whole_i64: unknown file handle".to_string(),
        })?;
        let dataset = open
            .file
            .dataset(var_name)
            .map_err(|_| CoreError::VariableNotFound {
                name: var_name.to_string(),
                candidates: vec![var_name.to_string()],
            })?;
        let shape = dataset.shape();
        let data = dataset.read_raw::<i64>().map_err(|e| CoreError::InvalidArgument {
            message: format!("reading {var_name}: {e}"),
        })?;
        Ok((data, shape))
    }

    pub fn read_whole_i64_named(
        &self,
        candidates: &[&str],
        file: FileId,
    ) -> CoreResult<(Vec<i64>, Vec<usize>, String)> {
        for name in candidates {
            if let Ok((data, shape)) = self.read_whole_i64(name, file) {
                return Ok((data, shape, (*name).to_string()));
            }
        }
        Err(CoreError::VariableNotFound {
            name: candidates.join(" | "),
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Read a scalar metadata attribute of one of the six supported
    /// types, as a string-encoded value (the concrete typed accessors
    /// below decode it).
    pub fn read_metadata_string(&self, file: FileId, key: &str) -> CoreResult<String> {
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "read_metadata: unknown file handle".to_string(),
        })?;
        let attr = open
            .file
            .attr(key)
            .map_err(|_| CoreError::MetadataNotFound {
                field: "<global>".to_string(),
                key: key.to_string(),
            })?;
        attr.read_scalar::<hdf5::types::VarLenUnicode>()
            .map(|v| v.to_string())
            .map_err(|e| CoreError::InvalidArgument {
                message: format!("metadata {key} is not a string: {e}"),
            })
    }

    pub fn write_metadata_string(&self, file: FileId, key: &str, value: &str) -> CoreResult<()> {
        let files = self.files.read().unwrap();
        let open = files.get(&file.0).ok_or_else(|| CoreError::InvalidArgument {
            message: "write_metadata: unknown file handle".to_string(),
        })?;
        let encoded: hdf5::types::VarLenUnicode =
            value.parse().map_err(|_| CoreError::InvalidArgument {
                message: format!("metadata value for {key} is not valid UTF-8"),
            })?;
        open.file
            .new_attr::<hdf5::types::VarLenUnicode>()
            .create(key)
            .and_then(|attr| attr.write_scalar(&encoded))
            .map_err(|e| CoreError::InvalidArgument {
                message: format!("writing metadata {key}: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomp_rejects_length_mismatch() {
        let io = ParallelIo::new();
        let err = io
            .create_decomp(IoType::R8, &[10], 3, &[0, 1], Rearranger::Box)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }
}

//! Process-wide Field and Dimension registries.
//!
//! Named maps mutated only during initialization; steady-state code
//! only reads them. Creation fails if the name already exists,
//! mirroring [`crate::mach_env::MachEnv`]'s registration contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;

use crate::error::{CoreError, CoreResult};

/// Metadata the core publishes for one named output/restart field.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub name: String,
    pub units: String,
    pub long_name: String,
    pub valid_min: f64,
    pub valid_max: f64,
    pub fill_value: f64,
    /// Whether this field carries a leading unlimited `time` dimension on write.
    pub has_time_dim: bool,
}

static FIELDS: OnceCell<RwLock<HashMap<String, Arc<FieldMetadata>>>> = OnceCell::new();
static DIMENSIONS: OnceCell<RwLock<HashMap<String, usize>>> = OnceCell::new();

fn fields() -> &'static RwLock<HashMap<String, Arc<FieldMetadata>>> {
    FIELDS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn dimensions() -> &'static RwLock<HashMap<String, usize>> {
    DIMENSIONS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a field's metadata under its name. Fails if already present.
pub fn register_field(meta: FieldMetadata) -> CoreResult<()> {
    let mut reg = fields().write().unwrap();
    if reg.contains_key(&meta.name) {
        return Err(CoreError::AlreadyRegistered {
            registry: "Field".to_string(),
            name: meta.name,
        });
    }
    reg.insert(meta.name.clone(), Arc::new(meta));
    Ok(())
}

pub fn get_field(name: &str) -> Option<Arc<FieldMetadata>> {
    fields().read().unwrap().get(name).cloned()
}

/// Register a dimension's extent under its name. Fails if already present.
pub fn register_dimension(name: &str, extent: usize) -> CoreResult<()> {
    let mut reg = dimensions().write().unwrap();
    if reg.contains_key(name) {
        return Err(CoreError::AlreadyRegistered {
            registry: "Dimension".to_string(),
            name: name.to_string(),
        });
    }
    reg.insert(name.to_string(), extent);
    Ok(())
}

pub fn get_dimension(name: &str) -> Option<usize> {
    dimensions().read().unwrap().get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_dimension_name_is_rejected() {
        let _ = register_dimension("registry_test_dim", 10);
        let err = register_dimension("registry_test_dim", 20).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRegistered { .. }));
    }

    #[test]
    fn duplicate_field_name_is_rejected() {
        let meta = FieldMetadata {
            name: "registry_test_field".to_string(),
            units: "m".to_string(),
            long_name: "test field".to_string(),
            valid_min: 0.0,
            valid_max: 1.0,
            fill_value: -1.0,
            has_time_dim: false,
        };
        let _ = register_field(meta.clone());
        let err = register_field(meta).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRegistered { .. }));
    }
}

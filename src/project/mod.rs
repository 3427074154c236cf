//! Flow registry: a named collection of independently loaded documents.
//!
//! Each document sits behind its own single-writer lock ([`FlowHandle`]),
//! so editing one flow never blocks readers of another. The registry's
//! own map has a separate lock that is held only long enough to look up
//! or insert a handle.
//!
//! ```
//! use flowdef::project::FlowRegistry;
//!
//! let registry = FlowRegistry::new();
//! registry.load_str("main", r#"<flow start-state="a"><end-state id="a"/></flow>"#).unwrap();
//! let flow = registry.get("main").unwrap();
//! let model = flow.read();
//! assert_eq!(model.start_state_id(model.root()), Some("a"));
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::base::constants;
use crate::model::{FlowModel, ModelError};
use crate::validation::{FlowValidator, TypeShape, ValidationContext, ValidationOptions, ValidationReport};

/// Errors raised while loading flows into a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A flow with this name is already registered.
    #[error("Flow '{0}' is already registered")]
    Duplicate(SmolStr),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

impl RegistryError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Shared, lock-guarded access to one flow model.
#[derive(Clone, Debug)]
pub struct FlowHandle(Arc<RwLock<FlowModel>>);

impl FlowHandle {
    pub fn new(model: FlowModel) -> Self {
        Self(Arc::new(RwLock::new(model)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, FlowModel> {
        self.0.read()
    }

    /// Exclusive access for editing. Blocks until readers are done.
    pub fn write(&self) -> RwLockWriteGuard<'_, FlowModel> {
        self.0.write()
    }

    /// True if both handles point at the same document.
    pub fn same_flow(&self, other: &FlowHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Named flows, in registration order.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: RwLock<IndexMap<SmolStr, FlowHandle>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already built model.
    pub fn insert(&self, name: &str, model: FlowModel) -> Result<FlowHandle, RegistryError> {
        let mut flows = self.flows.write();
        if flows.contains_key(name) {
            return Err(RegistryError::Duplicate(SmolStr::new(name)));
        }
        let handle = FlowHandle::new(model);
        flows.insert(SmolStr::new(name), handle.clone());
        debug!(flow = name, "registered flow");
        Ok(handle)
    }

    /// Parse `text` and register it under `name`.
    pub fn load_str(&self, name: &str, text: &str) -> Result<FlowHandle, RegistryError> {
        let model = FlowModel::parse(text)?;
        self.insert(name, model)
    }

    /// Load a flow file. The flow is named after the file stem.
    pub fn load_file(&self, path: &Path) -> Result<FlowHandle, RegistryError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if extension != constants::FLOW_FILE_EXTENSION {
            return Err(RegistryError::UnsupportedExtension(extension.to_string()));
        }
        let name = flow_name(path);
        let model = FlowModel::from_file(path)?;
        let handle = self.insert(&name, model)?;
        info!(flow = %name, path = %path.display(), "loaded flow");
        Ok(handle)
    }

    /// Load every flow file under `dir`, recursively, in path order.
    ///
    /// Files that cannot be read or parsed, and names already taken, are
    /// skipped with a warning. Returns the names that were loaded.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<SmolStr>, RegistryError> {
        let mut paths = Vec::new();
        collect_flow_files(dir, &mut paths)?;
        paths.sort();

        let mut loaded = Vec::new();
        for path in paths {
            match self.load_file(&path) {
                Ok(_) => loaded.push(flow_name(&path)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping flow file"),
            }
        }
        info!(dir = %dir.display(), flows = loaded.len(), "loaded flow directory");
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<FlowHandle> {
        self.flows.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flows.read().contains_key(name)
    }

    /// Unregister a flow. Outstanding handles stay usable.
    pub fn remove(&self, name: &str) -> Option<FlowHandle> {
        self.flows.write().shift_remove(name)
    }

    pub fn names(&self) -> Vec<SmolStr> {
        self.flows.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.flows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.read().is_empty()
    }

    /// Validate every registered flow in parallel.
    ///
    /// Subflow references also resolve against the registry's own names.
    /// Reports come back in registration order.
    pub fn validate_all(
        &self,
        context: &dyn ValidationContext,
        options: &ValidationOptions,
        cancel: &CancellationToken,
    ) -> Vec<(SmolStr, ValidationReport)> {
        let snapshot: Vec<(SmolStr, FlowHandle)> = self
            .flows
            .read()
            .iter()
            .map(|(name, handle)| (name.clone(), handle.clone()))
            .collect();
        let context = RegistryContext::new(context, snapshot.iter().map(|(name, _)| name.clone()));

        let reports: Vec<_> = snapshot
            .par_iter()
            .map(|(name, handle)| {
                let model = handle.read();
                (name.clone(), FlowValidator::validate(&model, &context, options, cancel))
            })
            .collect();
        debug!(flows = reports.len(), "validated registry");
        reports
    }
}

fn flow_name(path: &Path) -> SmolStr {
    path.file_stem()
        .map(|stem| SmolStr::new(stem.to_string_lossy()))
        .unwrap_or_default()
}

fn collect_flow_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RegistryError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| RegistryError::io(dir, e))?.path();
        if path.is_dir() {
            collect_flow_files(&path, paths)?;
        } else if path.extension().is_some_and(|e| e == constants::FLOW_FILE_EXTENSION) {
            paths.push(path);
        }
    }
    Ok(())
}

// ============================================================================
// CONTEXT ADAPTER
// ============================================================================

/// A [`ValidationContext`] that also knows the flows of a registry.
pub struct RegistryContext<'a> {
    inner: &'a dyn ValidationContext,
    flows: FxHashSet<SmolStr>,
}

impl<'a> RegistryContext<'a> {
    pub fn new(inner: &'a dyn ValidationContext, flows: impl IntoIterator<Item = SmolStr>) -> Self {
        Self {
            inner,
            flows: flows.into_iter().collect(),
        }
    }
}

impl ValidationContext for RegistryContext<'_> {
    fn bean_exists(&self, name: &str) -> bool {
        self.inner.bean_exists(name)
    }

    fn is_factory_bean(&self, name: &str) -> bool {
        self.inner.is_factory_bean(name)
    }

    fn bean_methods(&self, name: &str) -> Vec<SmolStr> {
        self.inner.bean_methods(name)
    }

    fn resolve_type(&self, class_name: &str) -> Option<TypeShape> {
        self.inner.resolve_type(class_name)
    }

    fn flow_exists(&self, flow_id: &str) -> bool {
        self.flows.contains(flow_id) || self.inner.flow_exists(flow_id)
    }
}

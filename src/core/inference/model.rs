//! Loaded model artifacts and their declared interface.

use crate::core::errors::ClassifyResult;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Element type of a declared tensor feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Float16,
    Float64,
    Int8,
    Int32,
    Int64,
    Uint8,
    Bool,
    /// Any other element type, by name.
    Other(String),
}

/// Shape and type information of a declared feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// A dense tensor. Dynamic dimensions are reported as `-1`.
    Tensor {
        element_type: ElementType,
        shape: Vec<i64>,
    },
    /// Sequences, maps and other non-tensor values.
    Other(String),
}

/// A named model input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDescriptor {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureDescriptor {
    /// Creates a tensor feature descriptor.
    pub fn tensor(name: impl Into<String>, element_type: ElementType, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Tensor {
                element_type,
                shape,
            },
        }
    }

    /// Declared tensor shape, if this is a tensor feature.
    pub fn shape(&self) -> Option<&[i64]> {
        match &self.kind {
            FeatureKind::Tensor { shape, .. } => Some(shape),
            FeatureKind::Other(_) => None,
        }
    }
}

impl std::fmt::Display for FeatureDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FeatureKind::Tensor {
                element_type,
                shape,
            } => write!(f, "{} ({:?} {:?})", self.name, element_type, shape),
            FeatureKind::Other(kind) => write!(f, "{} ({})", self.name, kind),
        }
    }
}

/// Key/value metadata attached to a model, plus its descriptive header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMetadata {
    entries: BTreeMap<String, String>,
    pub name: Option<String>,
    pub producer: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub version: Option<i64>,
}

impl ModelMetadata {
    /// Creates metadata from custom key/value entries.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Looks up a value by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterates all custom entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed model artifact.
///
/// Holds the serialized bytes so sessions can be created on any execution
/// target without reading the file again. Features are kept in the order the
/// model declares them.
#[derive(Clone)]
pub struct ModelHandle {
    path: PathBuf,
    bytes: Vec<u8>,
    inputs: Vec<FeatureDescriptor>,
    outputs: Vec<FeatureDescriptor>,
    metadata: ModelMetadata,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ModelHandle {
    /// Loads and introspects an ONNX model with the default ONNX Runtime engine.
    pub fn load(path: impl AsRef<Path>) -> ClassifyResult<Self> {
        use super::engine::InferenceEngine;
        super::OrtEngine::default().load_model(path.as_ref())
    }

    /// Assembles a handle from already-parsed parts.
    pub fn from_parts(
        path: impl Into<PathBuf>,
        bytes: Vec<u8>,
        inputs: Vec<FeatureDescriptor>,
        outputs: Vec<FeatureDescriptor>,
        metadata: ModelMetadata,
    ) -> Self {
        Self {
            path: path.into(),
            bytes,
            inputs,
            outputs,
            metadata,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialized model bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared inputs in model order.
    pub fn input_features(&self) -> &[FeatureDescriptor] {
        &self.inputs
    }

    /// Declared outputs in model order.
    pub fn output_features(&self) -> &[FeatureDescriptor] {
        &self.outputs
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Model name for logs: the declared graph name, else the file stem.
    pub fn display_name(&self) -> String {
        self.metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| {
                self.path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "unknown_model".to_string())
    }
}

//! Run-time typing surface over JSON data.
//!
//! [`TypedJsonModel`] stores a `serde_json::Value` together with the
//! [`Shape`] it was declared with and resolves every path through the same
//! resolver the static checker uses, before touching the data. Where the
//! checker rejects a call statically, the model returns an `Err` at call
//! time.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::path::{AbsolutePath, PathError, RelativePath};
use crate::resolve::{check_complexity, resolve_absolute, Limits, Resolution, ResolveError};
use crate::shape::Shape;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("context was created by model {context_model}, not by model {model}")]
    ForeignContext { model: u64, context_model: u64 },
    #[error("value {value} is not assignable to {expected} at '{path}'")]
    ValueMismatch {
        path: String,
        expected: String,
        value: String,
    },
    #[error("'{path}' resolves to {shape}, which cannot be bound as a list")]
    NotAList { path: String, shape: String },
    #[error("data does not conform to {expected}")]
    DataMismatch { expected: String },
    #[error("value at '{path}' cannot be decoded: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A context fixed at one absolute path of the model that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedContext {
    model_id: u64,
    root: AbsolutePath,
}

impl TypedContext {
    pub fn root(&self) -> &AbsolutePath {
        &self.root
    }

    pub fn model_id(&self) -> u64 {
        self.model_id
    }

    /// Read a relative path through this context.
    pub fn get_property<'m>(
        &self,
        model: &'m TypedJsonModel,
        path: &str,
    ) -> Result<Option<&'m Value>, ModelError> {
        model.get_property_in(path, self)
    }
}

/// A list-valued path bound element by element.
#[derive(Debug, Clone)]
pub struct ListBinding {
    path: AbsolutePath,
    element: Shape,
    contexts: Vec<TypedContext>,
}

impl ListBinding {
    pub fn path(&self) -> &AbsolutePath {
        &self.path
    }

    /// Shape of one element: the array element, or the union of tuple items.
    pub fn element_shape(&self) -> &Shape {
        &self.element
    }

    /// One context per element present in the data.
    pub fn contexts(&self) -> &[TypedContext] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[derive(Debug)]
pub struct TypedJsonModel {
    id: u64,
    shape: Shape,
    data: Value,
    original: Value,
    limits: Limits,
}

impl TypedJsonModel {
    pub fn new(shape: Shape, data: Value) -> Result<Self, ModelError> {
        Self::with_limits(shape, data, Limits::default())
    }

    pub fn with_limits(shape: Shape, data: Value, limits: Limits) -> Result<Self, ModelError> {
        check_complexity(&shape, &limits)?;
        if !shape.admits(&data) {
            return Err(ModelError::DataMismatch {
                expected: shape.to_string(),
            });
        }
        let id = NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed);
        debug!(model = id, shape = %shape, "model created");
        Ok(TypedJsonModel {
            id,
            shape,
            original: data.clone(),
            data,
            limits,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The absolute location a call addresses.
    fn locate(&self, path: &str, ctx: Option<&TypedContext>) -> Result<AbsolutePath, ModelError> {
        match ctx {
            None => Ok(AbsolutePath::parse(path)?),
            Some(c) => {
                if c.model_id != self.id {
                    return Err(ModelError::ForeignContext {
                        model: self.id,
                        context_model: c.model_id,
                    });
                }
                let rel = RelativePath::parse(path)?;
                Ok(c.root.join(&rel))
            }
        }
    }

    /// The resolved shape of a call's path.
    pub fn resolve_type(
        &self,
        path: &str,
        ctx: Option<&TypedContext>,
        variant: Resolution,
    ) -> Result<Shape, ModelError> {
        let abs = self.locate(path, ctx)?;
        Ok(resolve_absolute(&self.shape, &abs, variant, &self.limits)?)
    }

    fn read<'v>(
        &self,
        source: &'v Value,
        path: &str,
        ctx: Option<&TypedContext>,
        variant: Resolution,
    ) -> Result<Option<&'v Value>, ModelError> {
        let abs = self.locate(path, ctx)?;
        resolve_absolute(&self.shape, &abs, variant, &self.limits)?;
        Ok(lookup(source, abs.segments()))
    }

    pub fn get_property(&self, path: &str) -> Result<Option<&Value>, ModelError> {
        self.read(&self.data, path, None, Resolution::Declared)
    }

    pub fn get_property_in(&self, path: &str, ctx: &TypedContext) -> Result<Option<&Value>, ModelError> {
        self.read(&self.data, path, Some(ctx), Resolution::Declared)
    }

    /// Read from the data as it was when the model was created or last
    /// replaced through [`TypedJsonModel::set_data`].
    pub fn get_original_property(&self, path: &str) -> Result<Option<&Value>, ModelError> {
        self.read(&self.original, path, None, Resolution::Original)
    }

    pub fn get_original_property_in(
        &self,
        path: &str,
        ctx: &TypedContext,
    ) -> Result<Option<&Value>, ModelError> {
        self.read(&self.original, path, Some(ctx), Resolution::Original)
    }

    /// Read an absolute path and deserialize it.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ModelError> {
        match self.get_property(path)? {
            None => Ok(None),
            Some(v) => T::deserialize(v).map(Some).map_err(|source| ModelError::Decode {
                path: path.to_owned(),
                source,
            }),
        }
    }

    pub fn set_property(&mut self, path: &str, value: Value) -> Result<bool, ModelError> {
        self.write(path, value, None)
    }

    pub fn set_property_in(&mut self, path: &str, value: Value, ctx: &TypedContext) -> Result<bool, ModelError> {
        self.write(path, value, Some(ctx))
    }

    /// Check `value` against the declared shape at `path`, then store it.
    /// `Ok(false)` means the parent container is absent from the data.
    fn write(&mut self, path: &str, value: Value, ctx: Option<&TypedContext>) -> Result<bool, ModelError> {
        let abs = self.locate(path, ctx)?;
        let target = resolve_absolute(&self.shape, &abs, Resolution::Declared, &self.limits)?;
        if !target.admits(&value) {
            return Err(ModelError::ValueMismatch {
                path: abs.to_string(),
                expected: target.to_string(),
                value: value.to_string(),
            });
        }
        let Some((last, parents)) = abs.segments().split_last() else {
            self.data = value;
            return Ok(true);
        };
        let Some(parent) = lookup_mut(&mut self.data, parents) else {
            trace!(model = self.id, path = %abs, "parent missing, nothing written");
            return Ok(false);
        };
        let written = match parent {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                true
            }
            Value::Array(items) => match last.parse::<usize>() {
                Ok(i) if i < items.len() => {
                    items[i] = value;
                    true
                }
                Ok(i) if i == items.len() => {
                    items.push(value);
                    true
                }
                _ => false,
            },
            _ => false,
        };
        trace!(model = self.id, path = %abs, written, "set property");
        Ok(written)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Replace the data; it must conform to the model's shape. The original
    /// snapshot is reset to the new data.
    pub fn set_data(&mut self, data: Value) -> Result<(), ModelError> {
        if !self.shape.admits(&data) {
            return Err(ModelError::DataMismatch {
                expected: self.shape.to_string(),
            });
        }
        self.original = data.clone();
        self.data = data;
        Ok(())
    }

    /// Bind a list-valued path. Paths resolving to anything but arrays or
    /// tuples are rejected.
    pub fn bind_list(&self, path: &str, ctx: Option<&TypedContext>) -> Result<ListBinding, ModelError> {
        let abs = self.locate(path, ctx)?;
        let resolved = resolve_absolute(&self.shape, &abs, Resolution::Declared, &self.limits)?;
        if !resolved.is_list() {
            return Err(ModelError::NotAList {
                path: abs.to_string(),
                shape: resolved.to_string(),
            });
        }
        let element = Shape::union(
            resolved
                .without_nullish()
                .members()
                .into_iter()
                .map(|s| match s {
                    Shape::Array(e) => e.as_ref().clone(),
                    Shape::Tuple(items) => Shape::union(items.iter().cloned()),
                    other => other.clone(),
                })
                .collect::<Vec<_>>(),
        );
        let count = lookup(&self.data, abs.segments())
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let contexts = (0..count)
            .map(|i| -> Result<TypedContext, ModelError> {
                let rel = RelativePath::parse(&i.to_string())?;
                Ok(TypedContext {
                    model_id: self.id,
                    root: abs.join(&rel),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListBinding {
            path: abs,
            element,
            contexts,
        })
    }

    pub fn create_binding_context(&self, path: &str) -> Result<TypedContext, ModelError> {
        let root = AbsolutePath::parse(path)?;
        resolve_absolute(&self.shape, &root, Resolution::Declared, &self.limits)?;
        Ok(TypedContext {
            model_id: self.id,
            root,
        })
    }
}

fn lookup<'v>(root: &'v Value, segments: &[String]) -> Option<&'v Value> {
    segments.iter().try_fold(root, |current, seg| match current {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn lookup_mut<'v>(root: &'v mut Value, segments: &[String]) -> Option<&'v mut Value> {
    segments.iter().try_fold(root, |current, seg| match current {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

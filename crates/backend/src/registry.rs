//! Function registration and dispatch.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use alexandria_core::{FunctionKind, FunctionPath};

use crate::context::FunctionContext;
use crate::error::FunctionError;
use crate::values::Validator;

type Handler =
    Arc<dyn Fn(FunctionContext, Value) -> BoxFuture<'static, Result<Value, FunctionError>> + Send + Sync>;

/// Arguments of functions that take none.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// A registered function: its address, kind, argument validator and handler.
#[derive(Clone)]
pub struct FunctionDefinition {
    path: FunctionPath,
    kind: FunctionKind,
    args: Validator,
    handler: Handler,
}

impl core::fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl FunctionDefinition {
    /// Define a query.
    pub fn query<A, R, F, Fut>(path: FunctionPath, args: Validator, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, FunctionError>> + Send + 'static,
    {
        Self::typed(path, FunctionKind::Query, args, handler)
    }

    /// Define a mutation.
    pub fn mutation<A, R, F, Fut>(path: FunctionPath, args: Validator, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, FunctionError>> + Send + 'static,
    {
        Self::typed(path, FunctionKind::Mutation, args, handler)
    }

    fn typed<A, R, F, Fut>(path: FunctionPath, kind: FunctionKind, args: Validator, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, FunctionError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |ctx, raw| {
            match serde_json::from_value::<A>(raw) {
                Ok(decoded) => handler(ctx, decoded)
                    .map(|result| -> Result<Value, FunctionError> {
                        Ok(serde_json::to_value(result?)?)
                    })
                    .boxed(),
                Err(e) => futures::future::ready(Err(FunctionError::ArgsDecode(e.to_string()))).boxed(),
            }
        });

        Self {
            path,
            kind,
            args,
            handler,
        }
    }

    #[must_use]
    pub const fn path(&self) -> &FunctionPath {
        &self.path
    }

    #[must_use]
    pub const fn kind(&self) -> FunctionKind {
        self.kind
    }

    #[must_use]
    pub const fn args(&self) -> &Validator {
        &self.args
    }

    /// Validate `args` and run the handler.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::InvalidArgs`] without running the handler if
    /// the arguments do not match the validator, or the handler's error.
    pub async fn invoke(&self, ctx: FunctionContext, args: Value) -> Result<Value, FunctionError> {
        self.args.validate(&args)?;
        (self.handler)(ctx, args).await
    }
}

/// All functions the backend serves, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<FunctionPath, FunctionDefinition>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::Duplicate`] if the path is already taken.
    pub fn register(&mut self, definition: FunctionDefinition) -> Result<(), FunctionError> {
        if self.functions.contains_key(definition.path()) {
            return Err(FunctionError::Duplicate(definition.path().clone()));
        }
        self.functions.insert(definition.path().clone(), definition);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, path: &FunctionPath) -> Option<&FunctionDefinition> {
        self.functions.get(path)
    }

    /// Registered functions in path order.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Look up `path`, check it is of `kind`, and invoke it.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::NotFound`], [`FunctionError::WrongKind`], or
    /// whatever invoking the function returns.
    pub async fn call(
        &self,
        kind: FunctionKind,
        path: &FunctionPath,
        ctx: FunctionContext,
        args: Value,
    ) -> Result<Value, FunctionError> {
        let definition = self
            .get(path)
            .ok_or_else(|| FunctionError::NotFound(path.clone()))?;

        if definition.kind() != kind {
            return Err(FunctionError::WrongKind {
                path: path.clone(),
                called: kind,
                defined: definition.kind(),
            });
        }

        definition.invoke(ctx, args).await
    }
}

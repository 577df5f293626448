//! Typed command dispatch.
//!
//! A command (action) is routed to its executor by its concrete type. The
//! binding is an explicit registry built at construction time, a map from
//! `TypeId` to executor, so new action/executor pairs are added by
//! registering them, never by modifying the dispatcher.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::DbError;

/// A typed command with its own validity check.
pub trait Action: Send + Sync + 'static {
    /// Check the command's own validity. Runs before dispatch; an error
    /// here is returned verbatim and no executor is invoked.
    fn validate(&self) -> Result<(), DbError>;

    /// Stable human-readable name for this action type, used in errors.
    fn kind(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Bridge a `validator`-derived check into an [`Action::validate`] result.
pub fn check(input: &impl validator::Validate) -> Result<(), DbError> {
    input
        .validate()
        .map_err(|e| DbError::Validation(e.to_string()))
}

/// Executes one action type.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &dyn Action) -> Result<serde_json::Value, DbError>;
}

/// Downcast a dispatched action to the concrete type an executor was
/// registered for.
///
/// The registry is keyed by `TypeId`, so an executor only ever receives
/// its own action type; a mismatch means the registry was wired by hand
/// and is a programming error.
pub fn expect_action<A: Action>(action: &dyn Action) -> &A {
    match action.as_any().downcast_ref::<A>() {
        Some(concrete) => concrete,
        None => panic!(
            "executor received action {} instead of {}",
            action.kind(),
            std::any::type_name::<A>()
        ),
    }
}

/// Static one-to-one mapping from action type to executor.
#[derive(Default)]
pub struct Dispatcher {
    executors: HashMap<TypeId, Box<dyn ActionExecutor>>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder {
            executors: HashMap::new(),
        }
    }

    /// Validate `action`, resolve its executor, and run it.
    pub async fn execute(&self, action: &dyn Action) -> Result<serde_json::Value, DbError> {
        action.validate()?;

        let executor = self
            .executors
            .get(&action.as_any().type_id())
            .ok_or(DbError::UnknownAction {
                kind: action.kind(),
            })?;
        executor.execute(action).await
    }
}

/// Builds the registry; bindings cannot change after `build`.
pub struct DispatcherBuilder {
    executors: HashMap<TypeId, Box<dyn ActionExecutor>>,
}

impl DispatcherBuilder {
    /// Bind action type `A` to `executor`, replacing any earlier binding.
    pub fn bind<A: Action>(mut self, executor: impl ActionExecutor + 'static) -> Self {
        self.executors.insert(TypeId::of::<A>(), Box::new(executor));
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            executors: self.executors,
        }
    }
}

use crate::node::{Context, Node};
use crate::types::{GraphState, NodeResult};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::marker::PhantomData;

/// A node backed by an async closure.
///
/// The closure receives the run context and an owned copy of the state and
/// returns either a full state or a list of updates:
///
/// ```ignore
/// let double = FunctionNode::new("double", |_ctx, state: FieldState| async move {
///     let n = state.require_f64("n")?;
///     Ok(NodeOutput::update(FieldUpdate::set("n", n * 2.0)))
/// });
/// ```
pub struct FunctionNode<S, F> {
    name: String,
    f: F,
    _state: PhantomData<fn(S)>,
}

impl<S, F, Fut> FunctionNode<S, F>
where
    S: GraphState,
    F: Fn(&Context, S) -> Fut + Send + Sync,
    Fut: Future<Output = NodeResult<S>> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _state: PhantomData,
        }
    }
}

impl<S, F: Clone> Clone for FunctionNode<S, F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            f: self.f.clone(),
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FunctionNode<S, F>
where
    S: GraphState,
    F: Fn(&Context, S) -> Fut + Send + Sync,
    Fut: Future<Output = NodeResult<S>> + Send,
{
    async fn process(&self, ctx: &Context, state: S) -> NodeResult<S> {
        (self.f)(ctx, state).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<S, F> Debug for FunctionNode<S, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FunctionNode").field(&self.name).finish()
    }
}

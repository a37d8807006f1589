//! Frame graph error types.

use std::fmt;

use crate::graph::{AccessType, BuilderState, NodeId, ResourceHandle};

/// Errors reported by the graphics layer a frame graph runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// The GPU device was lost.
    DeviceLost,
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

/// Errors that can occur while recording, compiling or executing a frame graph.
///
/// Every variant is a violated contract. None of them is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The operation is not allowed in the builder's current lifecycle state.
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the builder was in.
        state: BuilderState,
    },
    /// A compute node requested an access type the compute queue cannot transition to.
    ComputeAccessNotAllowed {
        node: NodeId,
        handle: ResourceHandle,
        access: AccessType,
    },
    /// A node recorded the same handle more than once.
    DuplicateAccess {
        node: NodeId,
        handle: ResourceHandle,
    },
    /// A handle is used both as a render target and as a depth target.
    ConflictingTargetAccess(ResourceHandle),
    /// The same external resource was registered twice.
    DuplicateExternalResource(String),
    /// External resources are not pooled and cannot be propagated.
    PropagateExternal(ResourceHandle),
    /// A node already has a render function.
    DuplicateRenderFunction(NodeId),
    /// The handle is not known to this graph.
    UnknownHandle(ResourceHandle),
    /// The node does not belong to this graph.
    UnknownNode(NodeId),
    /// The node did not record an access to the handle.
    HandleNotAccessed {
        node: NodeId,
        handle: ResourceHandle,
    },
    /// The builder was created by a different manager.
    ForeignManager,
    /// A pooled resource could not be allocated.
    ResourceAllocation(GraphicsError),
    /// A backend call failed during execution.
    Backend(GraphicsError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { operation, state } => {
                write!(f, "cannot {operation} while the graph is {state:?}")
            }
            Self::ComputeAccessNotAllowed {
                node,
                handle,
                access,
            } => write!(
                f,
                "compute node {} cannot access resource {} as {access:?}",
                node.index(),
                handle.id()
            ),
            Self::DuplicateAccess { node, handle } => write!(
                f,
                "node {} accesses resource {} more than once",
                node.index(),
                handle.id()
            ),
            Self::ConflictingTargetAccess(handle) => write!(
                f,
                "resource {} is used as both render target and depth target",
                handle.id()
            ),
            Self::DuplicateExternalResource(label) => {
                write!(f, "external resource {label} is already registered")
            }
            Self::PropagateExternal(handle) => write!(
                f,
                "external resource {} cannot be propagated to the next frame",
                handle.id()
            ),
            Self::DuplicateRenderFunction(node) => {
                write!(f, "node {} already has a render function", node.index())
            }
            Self::UnknownHandle(handle) => write!(f, "unknown resource handle {}", handle.id()),
            Self::UnknownNode(node) => write!(f, "unknown node {}", node.index()),
            Self::HandleNotAccessed { node, handle } => write!(
                f,
                "node {} did not record an access to resource {}",
                node.index(),
                handle.id()
            ),
            Self::ForeignManager => write!(f, "graph was created by a different manager"),
            Self::ResourceAllocation(err) => write!(f, "resource allocation failed: {err}"),
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ResourceAllocation(err) | Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphicsError> for GraphError {
    fn from(err: GraphicsError) -> Self {
        Self::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");
        assert_eq!(GraphicsError::DeviceLost.to_string(), "GPU device lost");
        assert_eq!(
            GraphicsError::ResourceCreationFailed("hdr".into()).to_string(),
            "resource creation failed: hdr"
        );

        let err = GraphError::InvalidState {
            operation: "compile",
            state: BuilderState::Executed,
        };
        assert_eq!(err.to_string(), "cannot compile while the graph is Executed");
    }

    #[test]
    fn test_error_source() {
        let err = GraphError::ResourceAllocation(GraphicsError::OutOfMemory);
        assert!(err.source().is_some());
        assert!(GraphError::ForeignManager.source().is_none());
    }
}

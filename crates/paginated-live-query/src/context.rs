use crate::transport::LiveQueryTransport;
use std::fmt;
use std::sync::Arc;

/// Where a paginated query is being evaluated.
#[derive(Clone)]
pub enum ExecutionContext {
    /// A live client with a transport that can push pages.
    Interactive(Arc<dyn LiveQueryTransport>),
    /// A one-shot render pass. Queries stay inert and never reach a transport.
    RenderPass,
}

impl ExecutionContext {
    pub fn interactive(transport: impl LiveQueryTransport + 'static) -> Self {
        ExecutionContext::Interactive(Arc::new(transport))
    }

    /// The transport, if this context can receive live updates.
    pub fn transport(&self) -> Option<&Arc<dyn LiveQueryTransport>> {
        match self {
            ExecutionContext::Interactive(transport) => Some(transport),
            ExecutionContext::RenderPass => None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.transport().is_some()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Interactive(_) => f.write_str("Interactive"),
            ExecutionContext::RenderPass => f.write_str("RenderPass"),
        }
    }
}

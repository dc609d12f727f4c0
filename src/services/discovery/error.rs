/// 服务发现错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Service unresolved: no live instance or fallback endpoint for {0}")]
    ServiceUnresolved(String),
    #[error("Registry unreachable: {0}")]
    RegistryUnreachable(String),
    #[error("Invalid endpoint {0:?}")]
    InvalidEndpoint(String),
}

/// 注册代理错误类型
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Registry rejected {operation} with status {status}")]
    Rejected { operation: &'static str, status: u16 },
    #[error("Instance not found in registry")]
    InstanceNotFound,
}

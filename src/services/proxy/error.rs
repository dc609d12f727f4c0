/// 代理错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("No route for {0}")]
    RouteNotFound(String),
    #[error("{app_id} unavailable: {reason}")]
    ServiceUnavailable { app_id: String, reason: String },
}

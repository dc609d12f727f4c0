/// 注册表错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Service {0} not found")]
    ApplicationNotFound(String),
    #[error("Instance {instance_id} not found under {app_id}")]
    InstanceNotFound { app_id: String, instance_id: String },
    #[error("Malformed instance descriptor: {0}")]
    MalformedDescriptor(String),
}

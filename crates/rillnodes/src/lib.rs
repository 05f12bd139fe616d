//! Standard node executor library
//!
//! One executor per node type key, grouped by category. Each executor
//! deserializes the subset of the input blob it cares about and ignores
//! everything else.

mod control;
mod data;
mod db;
mod email;
mod file;
mod http;
mod mq;
mod script;
mod shell;
mod time;
mod trigger;

pub use control::{ConditionExecutor, LoopExecutor, MergeExecutor};
pub use data::{LogExecutor, SetDataExecutor};
pub use db::{MysqlQueryExecutor, PostgresQueryExecutor};
pub use email::EmailSmtpExecutor;
pub use file::{FileReadExecutor, FileWriteExecutor};
pub use http::{HttpRequestExecutor, SlackExecutor};
pub use mq::RabbitmqPublishExecutor;
pub use script::CodeJsExecutor;
pub use shell::ShellCommandExecutor;
pub use time::WaitExecutor;
pub use trigger::{CronExecutor, WebhookExecutor};

use rillengine::ExecutorRegistry;
use std::sync::Arc;

/// Register every built-in executor with a registry.
pub fn register_builtin(registry: &mut ExecutorRegistry) {
    registry.register(Arc::new(HttpRequestExecutor::new()));
    registry.register(Arc::new(ShellCommandExecutor));
    registry.register(Arc::new(ConditionExecutor));
    registry.register(Arc::new(LoopExecutor));
    registry.register(Arc::new(WebhookExecutor));
    registry.register(Arc::new(CronExecutor));
    registry.register(Arc::new(WaitExecutor));
    registry.register(Arc::new(MergeExecutor));
    registry.register(Arc::new(SetDataExecutor));
    registry.register(Arc::new(CodeJsExecutor));
    registry.register(Arc::new(LogExecutor));
    registry.register(Arc::new(FileReadExecutor));
    registry.register(Arc::new(FileWriteExecutor));
    registry.register(Arc::new(PostgresQueryExecutor));
    registry.register(Arc::new(MysqlQueryExecutor));
    registry.register(Arc::new(EmailSmtpExecutor));
    registry.register(Arc::new(SlackExecutor::new()));
    registry.register(Arc::new(RabbitmqPublishExecutor));
}

/// Registry pre-populated with the built-in catalog.
pub fn builtin_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    register_builtin(&mut registry);
    registry
}

//! Background Task Runtime (C5).

mod broker;
mod callbacks;
mod worker;

pub use broker::{InMemoryTaskBroker, Task, TaskBroker, TaskRequest};
pub use callbacks::{CompletionStats, LoggingCallbackSink, TaskCallbackSink, TaskEvent};
pub use worker::spawn_worker_pool;

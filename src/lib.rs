#[macro_use]
extern crate log;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use sink::{ChannelSink, Sink, WriterSink};
pub use thread_pool::{Builder, FunctionPool, PanicHook, WorkerPanic};

pub mod config;
mod error;
pub mod sink;
pub mod thread_pool;

//! # Dispatcher
//!
//! 事件分发模块。
//!
//! 负责：
//! - 接收 `Event`，写入有界队列
//! - 单一 fan-out 循环，按注册顺序依次投递到每个 destination
//! - 管理 destination 生命周期 (setup / record / teardown)
//! - 进程内唯一实例 ([`get`])

mod cell;
pub mod destinations;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;

pub use cell::{get, try_get, DispatcherCell};
pub use contracts::{CancellationToken, Destination, Event};
pub use destinations::{
    create_destination, FileDestination, FileDestinationConfig, LogDestination,
    NetworkDestination, NetworkDestinationConfig,
};
pub use dispatcher::{
    Dispatcher, DispatcherBuilder, DispatcherConfig, DEFAULT_SLOW_DELIVERY_THRESHOLD,
};
pub use error::DispatcherError;
pub use handle::DestinationHandle;
pub use metrics::{DispatchMetrics, MetricsSnapshot};

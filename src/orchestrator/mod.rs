//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责队列状态和批量调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `queue_store` - 队列状态
//! - 队列快照（条目列表 + processing 标记 + 批次级错误）
//! - 纯函数 reducer，按 id 对条目做整体替换
//! - watch 通道：写入走 dispatch，展示层只读订阅
//! - 用户提交 URL 时的前置校验
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（初始化、运行、输出）
//! - 选中未完成的条目并同时发起处理
//! - 控制同时运行的浏览器数量（Semaphore）
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整个队列)
//!     ↓
//! workflow::ScrapeFlow (处理单个 URL)
//!     ↓
//! services (能力层：normalize / extract / store)
//!     ↓
//! infrastructure + browser (基础设施：PageFetcher / StructuredGenerator / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一写入口**：队列只能通过 QueueAction 修改
//! 2. **错误隔离**：单个条目的失败不会中断批次
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体抽取判断

pub mod batch_processor;
pub mod queue_store;

// 重新导出主要类型
pub use batch_processor::{App, BatchProcessor, BatchSummary};
pub use queue_store::{reduce, ItemsUpdate, QueueAction, QueueState, QueueStore};

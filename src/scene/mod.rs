//! 场景图系统模块
//!
//! 管理场景层级结构和加载：
//! - Object: 场景节点（父子关系以句柄表示）
//! - Scene: 场景容器，持有组件存储与对象数组
//! - tree: 父子结构的括号文本格式
//! - format: BOGLE 二进制场景文件
//! - loader: 可恢复的加载状态机

pub mod format;
pub mod loader;
pub mod object;
pub mod scene;
pub mod tree;

// 重新导出常用类型
pub use format::SceneFile;
pub use loader::{CustomStep, LoadState, StepStatus};
pub use object::{Object, ObjectHandle, UpdateHook};
pub use scene::Scene;

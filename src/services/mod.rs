// 服务层模块
//
// - baseline_store: 用户原有代理设置的持久化
// - sysproxy: 系统代理开关（sysproxy 调用、解析、状态机）

pub mod baseline_store;
pub mod sysproxy;

pub use baseline_store::BaselineStore;
pub use sysproxy::*;

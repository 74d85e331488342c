//! 基础设施层
//!
//! 持有稀缺资源（数据库连接池），只暴露能力

pub mod database;

pub use database::{bootstrap_schema, connect, placeholders, Database, Dialect};

//! resetgate - パスワードリセットワークフロー
//!
//! 署名付き時限トークンの発行・検証と、アカウントストア上の
//! ワンタイムリデンプション（成功時に未使用トークン全無効化）を提供する。

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;

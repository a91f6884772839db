//! # shapegate CLI Library
//!
//! 層化スキーマ検証のコマンドラインインターフェース
//! プロファイルを選んでグラフ群を一括検証し、終了コードで結果を返す

pub mod commands;
pub mod render;

pub use commands::*;
pub use render::*;

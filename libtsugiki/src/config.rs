use serde::{Deserialize, Serialize};

/// 変換エンジンのチューニング設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 各ノードで保持する経路数の上限(ビーム幅)。1 以上。
    #[serde(default = "default_n_best")]
    pub n_best: usize,
}

fn default_n_best() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            n_best: default_n_best(),
        }
    }
}

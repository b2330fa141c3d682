use std::ops::Range;

use crate::graph::lattice_node::LatticeNode;
use crate::graph::word_data::WordData;
use crate::input::ComposingText;

/// 連接コストのバッチ照会 1 件。
/// 結果は `cost(former_rcid, latter_lcid) + offset` になる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostQuery {
    pub former_rcid: i32,
    pub latter_lcid: i32,
    pub offset: f32,
}

/// 辞書ストアのファサード。
///
/// トライの遅延ロードなどで I/O を伴いうるため lookup と連接コスト照会は
/// async だが、入力に対して論理的には純粋な関数。失敗はリトライせず
/// そのまま呼び出し元に返す。
// 単一論理タスクから使う前提なので Send 境界は要求しない。
#[allow(async_fn_in_trait)]
pub trait DictStore {
    /// 辞書エントリ長の上限。探索ウィンドウのサイズ決めに使う。
    fn max_entry_length(&self) -> usize;

    /// 頻度下限などの理由で、どの経路にも参加させないエントリか。純粋述語。
    fn is_pruned(&self, data: &WordData) -> bool;

    /// `input[start..end)` (end は `ends` の範囲) に一致する辞書エントリを
    /// ノードにして返す。一致がなければ空。
    async fn lookup(
        &self,
        input: &ComposingText,
        start: usize,
        ends: Range<usize>,
    ) -> anyhow::Result<Vec<LatticeNode>>;

    /// クラス連接スコア。大きいほど繋がりやすい。
    async fn transition_cost(&self, rcid: i32, lcid: i32) -> anyhow::Result<f32>;

    /// バッチ形。既定実装は逐次照会。ストア側でまとめて引ける実装は
    /// これを上書きして 1 回の呼び出しに畳み込んでよい。
    async fn transition_costs(&self, queries: &[CostQuery]) -> anyhow::Result<Vec<f32>> {
        let mut values = Vec::with_capacity(queries.len());
        for q in queries {
            values.push(self.transition_cost(q.former_rcid, q.latter_lcid).await? + q.offset);
        }
        Ok(values)
    }
}

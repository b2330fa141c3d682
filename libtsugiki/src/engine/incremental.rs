use log::debug;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::dict::base::{CostQuery, DictStore};
use crate::engine::base::ConvertError;
use crate::graph::lattice::{EosNode, Lattice};
use crate::graph::lattice_node::LatticeNode;
use crate::graph::path_record::{PathRecord, PathRef};
use crate::graph::word_data::BOS_EOS_CLASS;
use crate::input::ComposingText;

/// ビーム幅 N のインクリメンタル N-best 変換エンジン。
///
/// 読みが末尾に伸びたとき、前回の格子を作り直さずに差分だけを計算する。
/// 手順:
///
/// (1) 新規に到達可能になった範囲に掛かる辞書エントリだけを列挙する。
///
/// (2) 前回格子の生きているノードから (1) のノードへ繋がるように
///     レコードを登録し、各ノードの上位 N 件を保つ。
///
/// (3) (1) のノード同士を開始位置の昇順に連結し、入力全長に達した経路を
///     EOS ノードに登録する。
///
/// (4) 新規ノードを前回格子に取り込んで返却する。
///
/// 全処理は単一論理タスク上で走る。キャンセルは各位置ループの先頭で
/// 協調的に検査し、観測したら何もマージせずに打ち切る。
pub struct IncrementalNBestEngine<D: DictStore> {
    dict: D,
    config: EngineConfig,
}

impl<D: DictStore> IncrementalNBestEngine<D> {
    pub fn new(dict: D) -> IncrementalNBestEngine<D> {
        Self::with_config(dict, EngineConfig::default())
    }

    pub fn with_config(dict: D, config: EngineConfig) -> IncrementalNBestEngine<D> {
        IncrementalNBestEngine { dict, config }
    }

    pub fn dict(&self) -> &D {
        &self.dict
    }

    /// 読み全体を設定のビーム幅で変換する。毎回ゼロから格子を組む、
    /// 入力開始時用の入り口。
    pub async fn convert(
        &self,
        yomi: &str,
        cancel: &CancellationToken,
    ) -> Result<(EosNode, Lattice), ConvertError> {
        let input = ComposingText::new(yomi);
        self.build_lattice(&input, self.config.n_best, cancel).await
    }

    /// 空の前回結果からのフルビルド。インクリメンタル経路の
    /// 「前回格子 = 空」の場合そのもの。
    pub async fn build_lattice(
        &self,
        input: &ComposingText,
        n_best: usize,
        cancel: &CancellationToken,
    ) -> Result<(EosNode, Lattice), ConvertError> {
        let mut lattice = Lattice::new();
        let result = self
            .extend_lattice(input, n_best, input.len(), &mut lattice, cancel)
            .await?;
        Ok((result, lattice))
    }

    /// 入力末尾に `added_count` 文字追加されたときの格子更新。
    ///
    /// 成功すれば EOS ノードを返し、`lattice` は追記済みになる。
    /// キャンセル・失敗時は `lattice` に一切手を付けないので、呼び出し側は
    /// 前回の格子のまま新しい入力でリトライできる。
    pub async fn extend_lattice(
        &self,
        input: &ComposingText,
        n_best: usize,
        added_count: usize,
        lattice: &mut Lattice,
        cancel: &CancellationToken,
    ) -> Result<EosNode, ConvertError> {
        let count = input.len();
        let prev_len = lattice.input_len();
        if prev_len + added_count != count {
            return Err(ConvertError::LengthMismatch {
                lattice_len: prev_len,
                expected: count.saturating_sub(added_count),
            });
        }
        debug!(
            "{}文字追加。追加されたのは「{}」",
            added_count,
            input.suffix(added_count)
        );
        if added_count == 1 {
            return self
                .extend_lattice_by_one(input, n_best, lattice, cancel)
                .await;
        }

        // (1)
        let mut added_nodes = self.added_nodes(input, prev_len, count).await?;
        let slot_base = slot_bases(lattice, count);

        // (2)
        self.link_frontier(lattice, &mut added_nodes, n_best, cancel)
            .await?;

        // (3)
        let mut result = EosNode::default();
        for i in 0..count {
            if cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            tokio::task::yield_now().await;

            // 位置 i のノードを確定しつつ、それより後ろの位置へ書き込む。
            let (head, tail) = added_nodes.split_at_mut(i + 1);
            let list = &mut head[i];
            for k in 0..list.len() {
                if list[k].is_unreachable() {
                    continue;
                }
                if self.dict.is_pruned(&list[k].data) {
                    continue;
                }
                self.refresh_values(&mut list[k], i == 0).await?;

                let node = &list[k];
                let next_index = node.end();
                if next_index == count {
                    // 入力全長に達したので EOS に登録する。ここはビーム幅で
                    // 切らず、全経路を残す。
                    for rank in 0..node.prevs.len() {
                        result.prevs.push(PathRecord::new(
                            node.values[rank],
                            PathRef {
                                pos: i,
                                slot: slot_base[i] + k,
                                rank,
                            },
                        ));
                    }
                } else {
                    for next in tail[next_index - i - 1].iter_mut() {
                        if self.dict.is_pruned(&next.data) {
                            continue;
                        }
                        let cc = self
                            .dict
                            .transition_cost(node.data.rcid, next.data.lcid)
                            .await?;
                        for (rank, value) in node.values.iter().enumerate() {
                            next.insert_ranked(
                                PathRecord::new(
                                    cc + *value,
                                    PathRef {
                                        pos: i,
                                        slot: slot_base[i] + k,
                                        rank,
                                    },
                                ),
                                n_best,
                            );
                        }
                    }
                }
            }
        }

        // (4)
        lattice.merge(added_nodes);
        Ok(result)
    }

    /// 1 文字追加の特殊化。同一の外部契約を持つ。
    ///
    /// 新規ノードはすべて入力末尾で終わるため、新規ノード同士の連結は
    /// 発生せず、到達可能な新規ノードは全経路が EOS に登録される。
    pub async fn extend_lattice_by_one(
        &self,
        input: &ComposingText,
        n_best: usize,
        lattice: &mut Lattice,
        cancel: &CancellationToken,
    ) -> Result<EosNode, ConvertError> {
        let count = input.len();
        let prev_len = lattice.input_len();
        if prev_len + 1 != count {
            return Err(ConvertError::LengthMismatch {
                lattice_len: prev_len,
                expected: count.saturating_sub(1),
            });
        }

        let mut added_nodes = self.added_nodes(input, prev_len, count).await?;
        let slot_base = slot_bases(lattice, count);

        self.link_frontier(lattice, &mut added_nodes, n_best, cancel)
            .await?;

        let mut result = EosNode::default();
        for (i, list) in added_nodes.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            tokio::task::yield_now().await;

            for k in 0..list.len() {
                if list[k].is_unreachable() {
                    continue;
                }
                if self.dict.is_pruned(&list[k].data) {
                    continue;
                }
                self.refresh_values(&mut list[k], i == 0).await?;

                let node = &list[k];
                debug_assert_eq!(node.end(), count);
                for rank in 0..node.prevs.len() {
                    result.prevs.push(PathRecord::new(
                        node.values[rank],
                        PathRef {
                            pos: i,
                            slot: slot_base[i] + k,
                            rank,
                        },
                    ));
                }
            }
        }

        lattice.merge(added_nodes);
        Ok(result)
    }

    /// (1) 新規領域に掛かる辞書エントリの列挙。
    ///
    /// `added[i]` は位置 i から始まり、前回入力の終端より後ろで終わる
    /// ノード。ウィンドウを `max(prev_len + 1, i + 1) ..=
    /// min(count, i + max_entry_length)` に絞ることで、作業量が
    /// 「新文字で到達可能になった範囲 + 新旧境界をまたぐ長語」に収まる。
    async fn added_nodes(
        &self,
        input: &ComposingText,
        prev_len: usize,
        count: usize,
    ) -> anyhow::Result<Vec<Vec<LatticeNode>>> {
        let max_entry_length = self.dict.max_entry_length();
        let mut added = Vec::with_capacity(count);
        for i in 0..count {
            let ends = (prev_len + 1).max(i + 1)..count.min(i + max_entry_length) + 1;
            added.push(self.dict.lookup(input, i, ends).await?);
        }
        Ok(added)
    }

    /// (2) 前回格子の生きているノードを新規ノードへ連結する。
    async fn link_frontier(
        &self,
        lattice: &Lattice,
        added_nodes: &mut [Vec<LatticeNode>],
        n_best: usize,
        cancel: &CancellationToken,
    ) -> Result<(), ConvertError> {
        for (pos, node_list) in lattice.node_lists().iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            tokio::task::yield_now().await;

            for (slot, node) in node_list.iter().enumerate() {
                if node.is_unreachable() {
                    continue;
                }
                if self.dict.is_pruned(&node.data) {
                    continue;
                }
                // このノードの後ろに続くのは、終端位置から始まる新規ノード。
                // 入力全長で終わるノードに後続はない。
                let next_index = node.end();
                let Some(next_list) = added_nodes.get_mut(next_index) else {
                    continue;
                };
                for next in next_list.iter_mut() {
                    if self.dict.is_pruned(&next.data) {
                        continue;
                    }
                    let cc = self
                        .dict
                        .transition_cost(node.data.rcid, next.data.lcid)
                        .await?;
                    for (rank, value) in node.values.iter().enumerate() {
                        next.insert_ranked(
                            PathRecord::new(cc + *value, PathRef { pos, slot, rank }),
                            n_best,
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// prevs から合成済みスコア列 `values` を作り直す。
    ///
    /// 位置 0 から始まるノードの prevs は必ず BOS 起点のレコードで、
    /// 連接コストがまだ乗っていないため、ここで改めてバッチ照会する。
    /// それ以外のレコードはリンク作成時に連接コストを適用済み。
    async fn refresh_values(&self, node: &mut LatticeNode, at_origin: bool) -> anyhow::Result<()> {
        let word_value = node.data.word_value;
        if at_origin {
            let queries: Vec<CostQuery> = node
                .prevs
                .iter()
                .map(|p| CostQuery {
                    former_rcid: BOS_EOS_CLASS,
                    latter_lcid: node.data.lcid,
                    offset: p.total_value + word_value,
                })
                .collect();
            node.values = self.dict.transition_costs(&queries).await?;
        } else {
            node.values = node
                .prevs
                .iter()
                .map(|p| p.total_value + word_value)
                .collect();
        }
        Ok(())
    }
}

/// 新規ノードがマージ後に収まる最終スロットの先頭位置。
/// マージ前に作る逆参照をマージ後も有効に保つために使う。
fn slot_bases(lattice: &Lattice, count: usize) -> Vec<usize> {
    (0..count)
        .map(|i| lattice.node_list(i).map_or(0, |list| list.len()))
        .collect()
}

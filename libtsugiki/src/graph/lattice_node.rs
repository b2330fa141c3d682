use std::fmt::{Display, Formatter};
use std::ops::Range;

use crate::graph::path_record::PathRecord;
use crate::graph::word_data::WordData;

/// 入力の `[start, end)` を覆う辞書エントリ候補のノード。
///
/// `prevs` はこのノードに到達する経路の上位 N 件を累積スコア降順で保持する。
/// `values` は `prevs` と並行な合成済みスコア列で、ノードを処理するたびに
/// 計算し直される。`prevs` が空のノードは到達不能であり、すべての消費側で
/// スキップされる。
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeNode {
    pub data: WordData,
    pub range: Range<usize>,
    pub prevs: Vec<PathRecord>,
    pub values: Vec<f32>,
}

impl LatticeNode {
    /// 入力先頭から始まるノードには BOS 起点のレコードを 1 件入れておく。
    /// 空の前回結果から格子を立ち上げるのはこのレコードだけ。
    pub fn new(data: WordData, range: Range<usize>) -> LatticeNode {
        let prevs = if range.start == 0 {
            vec![PathRecord::bos()]
        } else {
            Vec::new()
        };
        LatticeNode {
            data,
            range,
            prevs,
            values: Vec::new(),
        }
    }

    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    /// 有効な経路が 1 本も到達していないノードか。
    pub fn is_unreachable(&self) -> bool {
        self.prevs.is_empty()
    }

    /// 降順ソートを保ったまま `record` を挿入する。
    ///
    /// 挿入位置は「スコアが厳密に小さくなる最初の位置」。同点は発見順を
    /// 崩さず既存エントリの後ろに入る。挿入位置が `n_best` に達する場合は
    /// 何もしない。リストが満杯なら最下位を先に追い出してから挿入するので、
    /// 観測可能などの時点でも長さは `n_best` を超えない。
    pub(crate) fn insert_ranked(&mut self, record: PathRecord, n_best: usize) {
        let index = self
            .prevs
            .iter()
            .position(|p| p.total_value < record.total_value)
            .unwrap_or(self.prevs.len());
        if index == n_best {
            return;
        }
        if self.prevs.len() >= n_best {
            self.prevs.pop();
        }
        self.prevs.insert(index, record);
    }
}

impl Display for LatticeNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..{})", self.data, self.range.start, self.range.end)
    }
}

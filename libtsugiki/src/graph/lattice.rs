use std::cmp::Ordering;

use crate::graph::lattice_node::LatticeNode;
use crate::graph::path_record::{PathRecord, PathRef};
use crate::graph::word_data::WordData;

/// 考えられる辞書エントリ解釈すべてを含む格子。
///
/// `nodes[i]` は入力位置 i から始まるノードのリスト。入力が伸びるのに
/// 合わせて単調に成長し、既存位置のリストは追記されることはあっても
/// 置き換えられることはない。常に `nodes.len() == 覆っている入力長` が
/// 成り立つ。ノードはすべてこのコンテナが所有し、ノード間の参照は
/// [`PathRef`] で表す。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lattice {
    nodes: Vec<Vec<LatticeNode>>,
}

impl Lattice {
    pub fn new() -> Lattice {
        Lattice::default()
    }

    /// この格子が覆っている入力の長さ。
    pub fn input_len(&self) -> usize {
        self.nodes.len()
    }

    /// 位置 start から始まるノードのリスト。
    pub fn node_list(&self, start: usize) -> Option<&Vec<LatticeNode>> {
        self.nodes.get(start)
    }

    pub fn node_lists(&self) -> &[Vec<LatticeNode>] {
        &self.nodes
    }

    pub fn get(&self, r: PathRef) -> Option<&LatticeNode> {
        self.nodes.get(r.pos).and_then(|list| list.get(r.slot))
    }

    /// 新規発見ノードを取り込む。既存位置には追記し、新しい位置は
    /// リストごと追加する。これ以外の経路で格子が変化することはない。
    pub(crate) fn merge(&mut self, added: Vec<Vec<LatticeNode>>) {
        for (i, list) in added.into_iter().enumerate() {
            if i < self.nodes.len() {
                self.nodes[i].extend(list);
            } else {
                self.nodes.push(list);
            }
        }
    }

    /// 経路レコードから、経路上の単語列を入力先頭から順に復元する。
    pub fn reconstruct(&self, record: &PathRecord) -> Vec<&WordData> {
        let mut out = Vec::new();
        let mut cur = record.prev;
        while let Some(r) = cur {
            let Some(node) = self.get(r) else {
                break;
            };
            out.push(&node.data);
            cur = node.prevs.get(r.rank).and_then(|p| p.prev);
        }
        out.reverse();
        out
    }

    /// 経路の表層を連結した文字列。
    pub fn surface_of(&self, record: &PathRecord) -> String {
        self.reconstruct(record)
            .iter()
            .map(|d| d.surface.as_str())
            .collect()
    }
}

/// 「文全体を変換し終えた」ことを表すシンクノード。
///
/// 入力全長に到達した経路が発見順にすべて積まれる。ここではビーム幅の
/// 制限は掛けない。上位だけに切り詰めるのは消費側の仕事。呼び出しごとに
/// 作り直され、呼び出しをまたいで状態を持たない。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EosNode {
    pub prevs: Vec<PathRecord>,
}

impl EosNode {
    /// 累積スコア降順に並べた経路レコード。同点は発見順のまま。
    pub fn ranked(&self) -> Vec<&PathRecord> {
        let mut records: Vec<&PathRecord> = self.prevs.iter().collect();
        records.sort_by(|a, b| {
            b.total_value
                .partial_cmp(&a.total_value)
                .unwrap_or(Ordering::Equal)
        });
        records
    }

    pub fn best(&self) -> Option<&PathRecord> {
        self.ranked().into_iter().next()
    }
}

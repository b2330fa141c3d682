use std::ops::Range;

use log::trace;
use rustc_hash::FxHashMap;

use crate::dict::base::DictStore;
use crate::graph::lattice_node::LatticeNode;
use crate::graph::word_data::WordData;
use crate::input::ComposingText;

/// オンメモリの辞書ストア。
///
/// テストおよび小規模な組み込み用のリファレンス実装。読み → エントリ列と
/// (rcid, lcid) → 連接スコアをそのままハッシュマップで持つ。
pub struct HashmapDictStore {
    entries: FxHashMap<String, Vec<WordData>>,
    transitions: FxHashMap<(i32, i32), f32>,
    default_transition_cost: f32,
    max_entry_length: usize,
    /// 生起スコアがこの値を下回るエントリは経路に参加させない。
    prune_floor: f32,
}

#[derive(Default)]
pub struct HashmapDictStoreBuilder {
    entries: FxHashMap<String, Vec<WordData>>,
    transitions: FxHashMap<(i32, i32), f32>,
    default_transition_cost: f32,
    max_entry_length: Option<usize>,
    prune_floor: Option<f32>,
}

impl HashmapDictStoreBuilder {
    pub fn add(&mut self, data: WordData) -> &mut Self {
        self.entries.entry(data.yomi.clone()).or_default().push(data);
        self
    }

    pub fn add_transition(&mut self, rcid: i32, lcid: i32, cost: f32) -> &mut Self {
        self.transitions.insert((rcid, lcid), cost);
        self
    }

    pub fn set_default_transition_cost(&mut self, cost: f32) -> &mut Self {
        self.default_transition_cost = cost;
        self
    }

    pub fn set_max_entry_length(&mut self, max_entry_length: usize) -> &mut Self {
        self.max_entry_length = Some(max_entry_length);
        self
    }

    pub fn set_prune_floor(&mut self, prune_floor: f32) -> &mut Self {
        self.prune_floor = Some(prune_floor);
        self
    }

    pub fn build(&mut self) -> HashmapDictStore {
        let longest = self
            .entries
            .keys()
            .map(|yomi| yomi.chars().count())
            .max()
            .unwrap_or(1);
        HashmapDictStore {
            entries: std::mem::take(&mut self.entries),
            transitions: std::mem::take(&mut self.transitions),
            default_transition_cost: self.default_transition_cost,
            max_entry_length: self.max_entry_length.unwrap_or(longest),
            prune_floor: self.prune_floor.unwrap_or(f32::NEG_INFINITY),
        }
    }
}

impl DictStore for HashmapDictStore {
    fn max_entry_length(&self) -> usize {
        self.max_entry_length
    }

    fn is_pruned(&self, data: &WordData) -> bool {
        data.word_value < self.prune_floor
    }

    async fn lookup(
        &self,
        input: &ComposingText,
        start: usize,
        ends: Range<usize>,
    ) -> anyhow::Result<Vec<LatticeNode>> {
        let chars = input.chars();
        let mut nodes = Vec::new();
        for end in ends {
            if end <= start || end > chars.len() {
                continue;
            }
            if end - start > self.max_entry_length {
                break;
            }
            let yomi: String = chars[start..end].iter().collect();
            if let Some(entries) = self.entries.get(&yomi) {
                for data in entries {
                    trace!("lookup hit: {} [{}..{})", data, start, end);
                    nodes.push(LatticeNode::new(data.clone(), start..end));
                }
            }
        }
        Ok(nodes)
    }

    async fn transition_cost(&self, rcid: i32, lcid: i32) -> anyhow::Result<f32> {
        Ok(self
            .transitions
            .get(&(rcid, lcid))
            .copied()
            .unwrap_or(self.default_transition_cost))
    }
}

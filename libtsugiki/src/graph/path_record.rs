/// 格子内のあるノードの prevs エントリを指すハンドル。
/// (開始位置, その位置リスト内のスロット, prevs 内の順位)。
/// ノードの prevs はそのノードの処理が終わった時点で凍結されるため、
/// 以後この参照が無効になることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRef {
    pub pos: usize,
    pub slot: usize,
    pub rank: usize,
}

/// あるノードに到達する 1 本の経路。作成後は不変で、挿入と削除のみ行われる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRecord {
    /// 経路の累積スコア。大きいほど良い。
    pub total_value: f32,
    /// 直前ノードの prevs エントリへの逆参照。None なら BOS 起点。
    pub prev: Option<PathRef>,
}

impl PathRecord {
    pub fn new(total_value: f32, prev: PathRef) -> PathRecord {
        PathRecord {
            total_value,
            prev: Some(prev),
        }
    }

    /// 入力先頭から始まるノードに生まれつき与えられる起点レコード。
    /// BOS との連接コストは含まない。ノード処理時に改めて足し込まれる。
    pub fn bos() -> PathRecord {
        PathRecord {
            total_value: 0.0,
            prev: None,
        }
    }
}

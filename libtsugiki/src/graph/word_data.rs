use std::fmt::{Display, Formatter};

/// BOS/EOS 境界の文法クラス。辞書側はこの id を実単語に割り当てないこと。
pub const BOS_EOS_CLASS: i32 = 0;

/// 辞書エントリの中身。格子ノードが保持する。
#[derive(Debug, Clone, PartialEq)]
pub struct WordData {
    /// 表層。
    pub surface: String,
    /// 読み仮名
    pub yomi: String,
    /// 左文法クラス。前の単語との連接コスト計算に使う。
    pub lcid: i32,
    /// 右文法クラス。次の単語との連接コスト計算に使う。
    pub rcid: i32,
    /// 単語の生起スコア。対数確率様で、大きいほど出やすい。
    pub word_value: f32,
}

impl WordData {
    pub fn new(surface: &str, yomi: &str, lcid: i32, rcid: i32, word_value: f32) -> WordData {
        WordData {
            surface: surface.to_string(),
            yomi: yomi.to_string(),
            lcid,
            rcid,
            word_value,
        }
    }
}

impl Display for WordData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.surface, self.yomi)
    }
}

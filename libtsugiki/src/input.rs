use std::fmt::{Display, Formatter};

/// 変換対象の読み(音素列)のスナップショット。
/// 追記のみで伸びていき、1 回の変換呼び出しの間は不変。
/// 前回スナップショットとの比較は長さのみで行う。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposingText {
    chars: Vec<char>,
}

impl ComposingText {
    pub fn new(yomi: &str) -> ComposingText {
        ComposingText {
            chars: yomi.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// 末尾 n 文字。差分ログ用。
    pub fn suffix(&self, n: usize) -> String {
        let skip = self.chars.len().saturating_sub(n);
        self.chars[skip..].iter().collect()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl Display for ComposingText {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

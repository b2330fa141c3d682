/// インクリメンタル変換呼び出しの失敗分類。
///
/// キャンセルはデータ異常ではなく「呼び出し側の入力が先に進んだ」合図。
/// どの失敗でも部分的にマージされた格子が観測されることはない。
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("conversion was cancelled")]
    Cancelled,

    #[error("previous lattice covers {lattice_len} chars, but previous input should have {expected}")]
    LengthMismatch { lattice_len: usize, expected: usize },

    /// 辞書ストア側の失敗。エンジンはリトライしない。
    #[error(transparent)]
    DictStore(#[from] anyhow::Error),
}

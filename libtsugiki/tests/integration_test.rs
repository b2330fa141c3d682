use std::ops::Range;

use tokio_util::sync::CancellationToken;

use libtsugiki::config::EngineConfig;
use libtsugiki::dict::base::DictStore;
use libtsugiki::dict::hashmap_dict::{HashmapDictStore, HashmapDictStoreBuilder};
use libtsugiki::engine::base::ConvertError;
use libtsugiki::engine::incremental::IncrementalNBestEngine;
use libtsugiki::graph::lattice::{EosNode, Lattice};
use libtsugiki::graph::lattice_node::LatticeNode;
use libtsugiki::graph::word_data::{WordData, BOS_EOS_CLASS};
use libtsugiki::input::ComposingText;

/// トイアルファベットの辞書。連接コストに凹凸をつけて順位が
/// 自明にならないようにしてある。
fn build_dict() -> HashmapDictStore {
    let mut builder = HashmapDictStoreBuilder::default();
    builder
        .add(WordData::new("A", "a", 1, 1, 1.0))
        .add(WordData::new("B", "b", 2, 2, 0.9))
        .add(WordData::new("C", "c", 5, 5, 1.1))
        .add(WordData::new("AB", "ab", 3, 3, 1.4))
        .add(WordData::new("BC", "bc", 4, 4, 1.2))
        .add(WordData::new("ABC", "abc", 6, 6, 2.0))
        .add(WordData::new("CA", "ca", 7, 7, 0.8))
        .add_transition(BOS_EOS_CLASS, 1, 0.3)
        .add_transition(BOS_EOS_CLASS, 3, 0.2)
        .add_transition(BOS_EOS_CLASS, 6, 0.1)
        .add_transition(1, 2, 0.4)
        .add_transition(1, 4, 0.6)
        .add_transition(2, 5, 0.5)
        .add_transition(3, 5, 0.7)
        .add_transition(5, 1, 0.2)
        .add_transition(4, 7, 0.4)
        .set_default_transition_cost(-0.5);
    builder.build()
}

/// ranked した EOS の (表層, スコア) 列。
fn ranked_paths(result: &EosNode, lattice: &Lattice) -> Vec<(String, f32)> {
    result
        .ranked()
        .into_iter()
        .map(|r| (lattice.surface_of(r), r.total_value))
        .collect()
}

fn assert_sorted_and_bounded(lattice: &Lattice, n_best: usize) {
    for list in lattice.node_lists() {
        for node in list {
            assert!(node.prevs.len() <= n_best);
            for pair in node.prevs.windows(2) {
                assert!(pair[0].total_value >= pair[1].total_value);
            }
        }
    }
}

/// 統合テスト: どの分割点から差分更新しても、ゼロから組んだ場合と
/// EOS の (経路, スコア) 集合が一致する。
#[tokio::test]
async fn test_incremental_equals_from_scratch_at_every_split() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let yomi = "abcab";
    let cancel = CancellationToken::new();

    for n_best in [1, 2, 3, 10] {
        let engine = IncrementalNBestEngine::new(build_dict());
        let full_input = ComposingText::new(yomi);
        let (expected_result, expected_lattice) =
            engine.build_lattice(&full_input, n_best, &cancel).await?;
        let expected = ranked_paths(&expected_result, &expected_lattice);
        assert!(!expected.is_empty());

        for split in 0..yomi.len() {
            let prefix = ComposingText::new(&yomi[..split]);
            let (_, mut lattice) = engine.build_lattice(&prefix, n_best, &cancel).await?;

            let result = engine
                .extend_lattice(&full_input, n_best, yomi.len() - split, &mut lattice, &cancel)
                .await?;
            let got = ranked_paths(&result, &lattice);
            assert_eq!(got, expected, "split={} n_best={}", split, n_best);
            assert_sorted_and_bounded(&lattice, n_best);
        }
    }
    Ok(())
}

/// 統合テスト: 1 文字ずつ打鍵していく高速パスの連続適用。
#[tokio::test]
async fn test_char_by_char_typing_matches_full_build() -> anyhow::Result<()> {
    let yomi = "abcab";
    let cancel = CancellationToken::new();
    let engine = IncrementalNBestEngine::new(build_dict());
    let n_best = 3;

    let full_input = ComposingText::new(yomi);
    let (expected_result, expected_lattice) =
        engine.build_lattice(&full_input, n_best, &cancel).await?;
    let expected = ranked_paths(&expected_result, &expected_lattice);

    let mut lattice = Lattice::new();
    let mut final_paths = None;
    let mut prev_list_lens: Vec<usize> = Vec::new();
    for end in 1..=yomi.len() {
        let input = ComposingText::new(&yomi[..end]);
        let result = engine
            .extend_lattice(&input, n_best, 1, &mut lattice, &cancel)
            .await?;

        // 単調成長: 位置数は常に入力長に一致し、既存リストは縮まない。
        assert_eq!(lattice.input_len(), end);
        for (i, len) in prev_list_lens.iter().enumerate() {
            assert!(lattice.node_list(i).unwrap().len() >= *len);
        }
        prev_list_lens = lattice
            .node_lists()
            .iter()
            .map(|list| list.len())
            .collect();

        if end == yomi.len() {
            final_paths = Some(ranked_paths(&result, &lattice));
        }
    }

    assert_eq!(final_paths.unwrap(), expected);
    Ok(())
}

/// 統合テスト: 追記しても既存ノードは変化しない(再利用される)。
#[tokio::test]
async fn test_extension_reuses_existing_nodes_unchanged() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let engine = IncrementalNBestEngine::new(build_dict());

    let prefix = ComposingText::new("ab");
    let (_, mut lattice) = engine.build_lattice(&prefix, 2, &cancel).await?;
    let before = lattice.clone();

    let input = ComposingText::new("abc");
    engine
        .extend_lattice(&input, 2, 1, &mut lattice, &cancel)
        .await?;

    // 旧ノードはリストの先頭部分にそのまま残っている
    for (i, old_list) in before.node_lists().iter().enumerate() {
        let new_list = lattice.node_list(i).unwrap();
        assert_eq!(&new_list[..old_list.len()], &old_list[..]);
    }
    // 追加されたのは 3 文字目を覆うノードだけ
    for (i, list) in lattice.node_lists().iter().enumerate() {
        for node in &list[before.node_lists().get(i).map_or(0, |l| l.len())..] {
            assert_eq!(node.end(), 3);
        }
    }
    Ok(())
}

/// lookup のたびにトークンをキャンセルする辞書。キャンセルの原子性を
/// 決定的に検査するために使う。
struct CancellingDict {
    inner: HashmapDictStore,
    token: CancellationToken,
}

impl DictStore for CancellingDict {
    fn max_entry_length(&self) -> usize {
        self.inner.max_entry_length()
    }

    fn is_pruned(&self, data: &WordData) -> bool {
        self.inner.is_pruned(data)
    }

    async fn lookup(
        &self,
        input: &ComposingText,
        start: usize,
        ends: Range<usize>,
    ) -> anyhow::Result<Vec<LatticeNode>> {
        self.token.cancel();
        self.inner.lookup(input, start, ends).await
    }

    async fn transition_cost(&self, rcid: i32, lcid: i32) -> anyhow::Result<f32> {
        self.inner.transition_cost(rcid, lcid).await
    }
}

/// 統合テスト: 呼び出し途中でキャンセルされても、格子は呼び出し前の
/// 状態のまま残る。
#[tokio::test]
async fn test_mid_flight_cancellation_is_atomic() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let plain = IncrementalNBestEngine::new(build_dict());
    let prefix = ComposingText::new("ab");
    let (_, mut lattice) = plain.build_lattice(&prefix, 2, &cancel).await?;
    let snapshot = lattice.clone();

    let token = CancellationToken::new();
    let engine = IncrementalNBestEngine::new(CancellingDict {
        inner: build_dict(),
        token: token.clone(),
    });
    let input = ComposingText::new("abcab");
    let err = engine
        .extend_lattice(&input, 2, 3, &mut lattice, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Cancelled));
    assert_eq!(lattice, snapshot);
    Ok(())
}

/// 統合テスト: 設定のビーム幅で変換する入り口。
#[tokio::test]
async fn test_convert_uses_configured_beam_width() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let engine =
        IncrementalNBestEngine::with_config(build_dict(), EngineConfig { n_best: 1 });
    let (result, lattice) = engine.convert("abc", &cancel).await?;

    assert!(!result.prevs.is_empty());
    assert_sorted_and_bounded(&lattice, 1);
    let best = result.best().unwrap();
    assert!(!lattice.surface_of(best).is_empty());
    Ok(())
}

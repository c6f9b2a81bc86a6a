//! End-to-end conversion through the engine

use crate::common::{Recorder, LEGACY_POST};
use blockshift::shortcode::ShortcodeSet;
use blockshift::{
    engine_with_settings, restore, BlockConverter, ConversionEngine, DocumentId,
    HtmlBlockConverter, MemoryStore, NoopCache, PatchChain, PatcherSettings, Phase,
    RestoreScope, RestoreTarget, SnapshotStore, SqliteStore,
};
use insta::assert_snapshot;
use std::sync::Arc;
use std::thread;

fn default_engine() -> ConversionEngine {
    let settings = PatcherSettings::default();
    let pre: Vec<String> = blockshift::patchers::DEFAULT_PRE_CHAIN
        .iter()
        .map(|s| s.to_string())
        .collect();
    let post: Vec<String> = blockshift::patchers::DEFAULT_POST_CHAIN
        .iter()
        .map(|s| s.to_string())
        .collect();
    engine_with_settings(&settings, &pre, &post).unwrap()
}

#[test]
fn default_chain_converts_legacy_post() {
    let blocks = default_engine()
        .convert_content(DocumentId(1), LEGACY_POST)
        .unwrap();
    assert_snapshot!(blocks, @r###"
    <!-- wp:paragraph -->
    <p>Kept</p>
    <!-- /wp:paragraph -->

    <!-- wp:paragraph -->
    <p>Intro line</p>
    <!-- /wp:paragraph -->

    <!-- wp:paragraph -->
    <p>See </p>
    <!-- /wp:paragraph -->

    <!-- wp:shortcode -->
    [gallery ids=1,2]
    <!-- /wp:shortcode -->

    <!-- wp:image -->
    <figure class="wp-block-image"><img src="a.png" alt="A" width="640"/></figure>
    <!-- /wp:image -->

    <!-- wp:embed {"providerNameSlug":"youtube","url":"https://youtu.be/xyz"} -->
    <figure class="wp-block-embed is-provider-youtube"><div class="wp-block-embed__wrapper">
    https://youtu.be/xyz
    </div></figure>
    <!-- /wp:embed -->
    "###);
}

#[test]
fn blank_lines_inside_preformatted_and_quotes_survive() {
    let engine = default_engine();

    let code = "<pre>fn main() {\n\n    body();\n}</pre>";
    assert_eq!(
        engine.convert_content(DocumentId(1), code).unwrap(),
        format!("<!-- wp:preformatted -->\n{code}\n<!-- /wp:preformatted -->")
    );

    let quote = engine
        .convert_content(DocumentId(2), "<blockquote>\nfirst\n\nsecond\n</blockquote>")
        .unwrap();
    assert_eq!(
        quote,
        "<!-- wp:quote -->\n<blockquote class=\"wp-block-quote\">\nfirst\n\nsecond\n</blockquote>\n<!-- /wp:quote -->"
    );
}

#[test]
fn captioned_image_converts_to_one_image_block() {
    let input = "[caption id=\"attachment_7\" align=\"alignright\" width=\"300\"]\
                 <img src=\"cat.jpg\" alt=\"Cat\" width=\"300\" height=\"200\"> A sleepy cat[/caption]\n\n\
                 After";
    let blocks = default_engine()
        .convert_content(DocumentId(8), input)
        .unwrap();
    assert_snapshot!(blocks, @r###"
    <!-- wp:image {"align":"right","id":7} -->
    <figure class="wp-block-image alignright"><img src="cat.jpg" alt="Cat" width="300" height="200"><figcaption>A sleepy cat</figcaption></figure>
    <!-- /wp:image -->

    <!-- wp:paragraph -->
    <p>After</p>
    <!-- /wp:paragraph -->
    "###);
}

#[test]
fn pullquote_around_paragraphs_stays_whole() {
    let blocks = default_engine()
        .convert_content(DocumentId(9), "[pullquote cite=\"Ann\"]<p>Big idea</p>[/pullquote]")
        .unwrap();
    assert_eq!(
        blocks,
        "<!-- wp:pullquote -->\n<figure class=\"wp-block-pullquote\"><blockquote><p>Big idea</p><cite>Ann</cite></blockquote></figure>\n<!-- /wp:pullquote -->"
    );
}

#[test]
fn codec_only_chain_passes_conversion_output_through() {
    let input = "<p>Hello [gallery ids=1,2]</p>";
    let converter = HtmlBlockConverter::new(ShortcodeSet::new(["gallery"]));
    let expected = converter.convert_to_blocks(input).unwrap();

    let store = MemoryStore::with_documents([(DocumentId(1), input)]);
    let engine = ConversionEngine::new(PatchChain::new(), converter);
    assert_eq!(engine.convert(&store, DocumentId(1)).unwrap(), expected);
    assert_eq!(store.live_content(DocumentId(1)).unwrap(), expected);

    let restored = restore(
        &store,
        RestoreTarget::Original,
        &RestoreScope::All,
        &mut NoopCache,
    )
    .unwrap();
    assert_eq!(restored, 1);
    assert_eq!(store.live_content(DocumentId(1)).unwrap(), input);
}

#[test]
fn patchers_only_ever_see_placeholders() {
    let pre = Recorder::pre("pre-recorder");
    let post = Recorder::post("post-recorder");
    let chain = PatchChain::builder()
        .pre(Arc::new(pre.clone()))
        .unwrap()
        .post(Arc::new(post.clone()))
        .unwrap()
        .build();
    let engine = ConversionEngine::new(chain, HtmlBlockConverter::default());

    let input = "<!-- wp:separator /-->\n<p>a</p>";
    let out = engine.convert_content(DocumentId(4), input).unwrap();
    assert!(out.starts_with("<!-- wp:separator /-->"));

    for seen in pre.seen().iter().chain(post.seen().iter()) {
        assert!(seen.contains("<!-- blockshift:encoded-block 0 -->"));
        assert!(!seen.contains("wp:separator"));
    }
    assert_eq!(pre.seen().len(), 1);
    assert_eq!(post.seen().len(), 1);
}

#[test]
fn reconversion_never_touches_the_original() {
    let store = MemoryStore::with_documents([(DocumentId(3), LEGACY_POST)]);
    let engine = default_engine();

    let first = engine.convert(&store, DocumentId(3)).unwrap();
    for _ in 0..3 {
        assert_eq!(engine.convert(&store, DocumentId(3)).unwrap(), first);
    }

    let doc = store.document(DocumentId(3)).unwrap();
    assert_eq!(doc.original_content.as_deref(), Some(LEGACY_POST));
    assert_eq!(doc.converted_content.as_deref(), Some(first.as_str()));
    assert!(doc.is_converted());
}

#[test]
fn failing_document_does_not_affect_concurrent_one() {
    let store = MemoryStore::with_documents([
        (DocumentId(5), "<p>Broken [gallery ids=1</p>"),
        (DocumentId(6), "<p>Fine</p>"),
    ]);
    let engine = default_engine();

    let (five, six) = thread::scope(|scope| {
        let five = scope.spawn(|| engine.convert(&store, DocumentId(5)));
        let six = scope.spawn(|| engine.convert(&store, DocumentId(6)));
        (five.join().unwrap(), six.join().unwrap())
    });

    let err = five.unwrap_err();
    assert_eq!(err.document_id(), DocumentId(5));
    assert_eq!(err.phase(), Some(Phase::Pre));
    assert!(err.to_string().contains("shortcode-preconversion"));
    assert_eq!(
        store.live_content(DocumentId(5)).unwrap(),
        "<p>Broken [gallery ids=1</p>"
    );

    assert_eq!(
        six.unwrap(),
        "<!-- wp:paragraph -->\n<p>Fine</p>\n<!-- /wp:paragraph -->"
    );
}

#[test]
fn sqlite_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("content.db")).unwrap();
    store.set_live_content(DocumentId(10), LEGACY_POST).unwrap();
    store.set_live_content(DocumentId(11), "<p>two</p>").unwrap();

    let engine = default_engine();
    let report = engine.convert_batch(&store, &store.document_ids().unwrap());
    assert!(report.is_clean());
    assert_eq!(report.converted, vec![DocumentId(10), DocumentId(11)]);
    assert!(store.document(DocumentId(10)).unwrap().is_converted());

    let restored = restore(
        &store,
        RestoreTarget::Original,
        &"10".parse().unwrap(),
        &mut NoopCache,
    )
    .unwrap();
    assert_eq!(restored, 1);
    assert_eq!(store.live_content(DocumentId(10)).unwrap(), LEGACY_POST);
    assert!(store.document(DocumentId(11)).unwrap().is_converted());
}

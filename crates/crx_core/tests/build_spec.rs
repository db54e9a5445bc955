mod common;

use common::{bundle_of, chunk, setup_workspace, write_file, MockBundler};
use crx_core::{ContentScriptSession, CrxError, Manifest, OutputBundle, SessionConfig};

#[tokio::test]
async fn test_dynamic_script_build() {
    let root = setup_workspace("build_dynamic");
    let entry = write_file(&root, "src/entry.ts", "import url from './foo.ts?script&module'");
    write_file(&root, "src/foo.ts", "export const onExecute = () => {}");

    let session = ContentScriptSession::new(SessionConfig::new(&root));
    let mut plugin = session.build_plugin();
    let mut bundler = MockBundler::build().with_chunk_name("foo.ts", "assets/foo.abc123.js");

    plugin.build_start(&mut bundler).await.unwrap();
    assert_eq!(bundler.chunk_count(), 0);

    let script_id = plugin
        .resolve_id("./foo.ts?script&module", Some(&entry))
        .unwrap()
        .unwrap();
    assert_eq!(script_id, "crx:content-scripts::src/foo.ts");

    // Registered after build start, so load emits the chunk.
    let code = plugin.load(&mut bundler, &script_id).unwrap().unwrap();
    let ref_id = session.registry().read().unwrap().get(&script_id).unwrap().ref_id.clone().unwrap();
    assert_eq!(code, format!("export default \"%IMPORTED_SCRIPT_{}%\"", ref_id));
    assert_eq!(bundler.chunk_count(), 1);

    // Loading again reuses the ref.
    plugin.load(&mut bundler, &script_id).unwrap();
    assert_eq!(bundler.chunk_count(), 1);

    bundler.start_render();
    let entry_id = entry.to_string_lossy().to_string();
    let mut bundle = bundle_of(vec![chunk(
        "assets/entry.js",
        &format!("const url = \"%IMPORTED_SCRIPT_{}%\";\nconsole.log(url);\n", ref_id),
        &[&entry_id, &script_id],
    )]);

    plugin
        .render_manifest(&mut bundler, Manifest::default(), &mut bundle)
        .unwrap();

    let out = bundle.chunk("assets/entry.js").unwrap();
    assert_eq!(
        out.code,
        "const url = \"/assets/content-script-loader.foo.abc123.js\";\nconsole.log(url);\n"
    );

    let registry = session.registry().read().unwrap();
    let record = registry.get(&script_id).unwrap();
    assert_eq!(record.output_file_name.as_deref(), Some("assets/foo.abc123.js"));
    assert_eq!(
        record.loader_file_name.as_deref(),
        Some("assets/content-script-loader.foo.abc123.js")
    );

    let loader = bundler.asset_source("content-script-loader.foo.abc123.js").unwrap();
    assert!(loader.contains(r#"chrome.runtime.getURL("assets/foo.abc123.js")"#));
    assert!(!loader.contains("__CLIENT__"));
}

#[tokio::test]
async fn test_build_start_emits_once() {
    let root = setup_workspace("build_emit_once");
    let entry = write_file(&root, "src/entry.ts", "");
    write_file(&root, "src/a.ts", "");
    write_file(&root, "src/b.ts", "");

    let session = ContentScriptSession::new(SessionConfig::new(&root));
    let mut plugin = session.build_plugin();
    let mut bundler = MockBundler::build();

    plugin.resolve_id("./a?script", Some(&entry)).unwrap();
    plugin.build_start(&mut bundler).await.unwrap();
    assert_eq!(bundler.chunk_count(), 1);

    plugin.build_start(&mut bundler).await.unwrap();
    assert_eq!(bundler.chunk_count(), 1);

    plugin.resolve_id("./b?script", Some(&entry)).unwrap();
    plugin.build_start(&mut bundler).await.unwrap();
    assert_eq!(bundler.chunk_count(), 2);

    let registry = session.registry().read().unwrap();
    let refs: Vec<_> = registry.entries().map(|(_, r)| r.ref_id.clone().unwrap()).collect();
    assert_eq!(refs.len(), 2);
    assert_ne!(refs[0], refs[1]);
}

#[tokio::test]
async fn test_declared_and_dynamic_scripts() {
    let root = setup_workspace("build_declared");
    let entry = write_file(&root, "src/background.ts", "");
    write_file(&root, "src/one.ts", "");
    write_file(&root, "src/two.ts", "");

    let session = ContentScriptSession::new(SessionConfig::new(&root));
    let mut plugin = session.build_plugin();
    let mut bundler = MockBundler::build();

    let one = plugin.resolve_id("./one?script", Some(&entry)).unwrap().unwrap();
    let two = plugin.resolve_id("./two?script", Some(&entry)).unwrap().unwrap();
    plugin.build_start(&mut bundler).await.unwrap();

    let manifest = Manifest::from_json(
        r#"{
            "manifest_version": 3,
            "content_scripts": [
                { "matches": ["https://a.com/*"], "js": ["assets/declared-a.js"] },
                { "matches": ["https://b.com/*"], "js": ["assets/declared-b.js"] }
            ]
        }"#,
    )
    .unwrap();

    bundler.start_render();
    let mut bundle = OutputBundle::new();
    let rendered = plugin.render_manifest(&mut bundler, manifest, &mut bundle).unwrap();

    let declared: Vec<_> = rendered
        .content_scripts
        .as_ref()
        .unwrap()
        .iter()
        .flat_map(|cs| cs.js.clone().unwrap())
        .collect();
    assert_eq!(
        declared,
        vec![
            "assets/content-script-loader.declared-a.js",
            "assets/content-script-loader.declared-b.js",
        ]
    );
    let loader = bundler.asset_source("content-script-loader.declared-a.js").unwrap();
    assert!(loader.contains(r#"getURL("assets/declared-a.js")"#));

    let registry = session.registry().read().unwrap();
    for id in [&one, &two] {
        let loader_name = registry.get(id).unwrap().loader_file_name.clone().unwrap();
        assert!(loader_name.starts_with("assets/content-script-loader."));
    }
}

#[tokio::test]
async fn test_iife_and_main_skip_loader() {
    let root = setup_workspace("build_direct_types");
    let entry = write_file(&root, "src/entry.ts", "");
    write_file(&root, "src/inject.ts", "");
    write_file(&root, "src/world.ts", "");

    let session = ContentScriptSession::new(SessionConfig::new(&root));
    let mut plugin = session.build_plugin();
    let mut bundler = MockBundler::build()
        .with_chunk_name("inject.ts", "assets/inject.1.js")
        .with_chunk_name("world.ts", "assets/world.2.js");

    let iife = plugin.resolve_id("./inject?script&iife", Some(&entry)).unwrap().unwrap();
    let main = plugin.resolve_id("./world?script&main", Some(&entry)).unwrap().unwrap();
    plugin.build_start(&mut bundler).await.unwrap();

    bundler.start_render();
    plugin
        .render_manifest(&mut bundler, Manifest::default(), &mut OutputBundle::new())
        .unwrap();

    assert!(bundler.asset_names().is_empty());
    let registry = session.registry().read().unwrap();
    assert_eq!(registry.get(&iife).unwrap().loader_file_name.as_deref(), Some("assets/inject.1.js"));
    assert_eq!(registry.get(&main).unwrap().loader_file_name.as_deref(), Some("assets/world.2.js"));
}

#[tokio::test]
async fn test_unknown_script_type_fails_render() {
    let root = setup_workspace("build_unknown_type");
    let entry = write_file(&root, "src/entry.ts", "");
    write_file(&root, "src/odd.ts", "");

    let session = ContentScriptSession::new(SessionConfig::new(&root));
    let mut plugin = session.build_plugin();
    let mut bundler = MockBundler::build();

    plugin.resolve_id("./odd?script&other", Some(&entry)).unwrap();
    plugin.build_start(&mut bundler).await.unwrap();
    bundler.start_render();

    let err = plugin
        .render_manifest(&mut bundler, Manifest::default(), &mut OutputBundle::new())
        .unwrap_err();
    match err {
        CrxError::UnknownScriptType { script_type, source_id } => {
            assert_eq!(script_type, "other");
            assert!(source_id.ends_with("odd.ts"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_tree_shaken_consumer_is_not_an_error() {
    let root = setup_workspace("build_tree_shaken");
    let entry = write_file(&root, "src/entry.ts", "");
    write_file(&root, "src/unused.ts", "");

    let session = ContentScriptSession::new(SessionConfig::new(&root));
    let mut plugin = session.build_plugin();
    let mut bundler = MockBundler::build();

    plugin.resolve_id("./unused?script", Some(&entry)).unwrap();
    plugin.build_start(&mut bundler).await.unwrap();
    bundler.start_render();

    let code = "console.log('no scripts here');";
    let mut bundle = bundle_of(vec![chunk("assets/entry.js", code, &["/elsewhere.ts"])]);
    plugin
        .render_manifest(&mut bundler, Manifest::default(), &mut bundle)
        .unwrap();
    assert_eq!(bundle.chunk("assets/entry.js").unwrap().code, code);
}

#[test]
fn test_plain_imports_ignored() {
    let session = ContentScriptSession::new(SessionConfig::new("/project"));
    let plugin = session.build_plugin();
    let importer = std::path::Path::new("/project/src/entry.ts");

    assert_eq!(plugin.resolve_id("./util.ts", Some(importer)).unwrap(), None);
    // No importer means an entry point, never a script import.
    assert_eq!(plugin.resolve_id("./foo.ts?script", None).unwrap(), None);
    assert!(session.registry().read().unwrap().is_empty());
}

#[test]
fn test_reset_discards_records() {
    let session = ContentScriptSession::new(SessionConfig::new("/project"));
    let plugin = session.build_plugin();
    plugin
        .resolve_id("./foo.ts?script", Some(std::path::Path::new("/project/src/entry.ts")))
        .unwrap();
    assert_eq!(session.registry().read().unwrap().len(), 1);

    session.reset().unwrap();
    assert!(session.registry().read().unwrap().is_empty());
}

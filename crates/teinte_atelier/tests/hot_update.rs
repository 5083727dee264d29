//! Live palette updates in a dev session, driven through the plugin pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use teinte_atelier::{
    BuildCommand, HmrPhase, HostConfig, HotChannel, HotChannelError, HotUpdateContext,
    HotUpdateOutcome, LanguageOptions, ModuleNode, ScopeVarConfig, StyleLang, ThemeHmrPlugin,
    ThemePlugin, ThemePluginOptions,
};

#[derive(Default)]
struct Recorder(Mutex<Vec<(String, serde_json::Value)>>);

impl Recorder {
    fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.0.lock().clone()
    }
}

impl HotChannel for Recorder {
    fn send(&self, event: &str, payload: serde_json::Value) -> Result<(), HotChannelError> {
        self.0.lock().push((event.to_string(), payload));
        Ok(())
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    plugin: ThemePlugin,
    hmr: ThemeHmrPlugin,
    recorder: Arc<Recorder>,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let mut options = ThemePluginOptions::default();
        options.set(
            StyleLang::Less,
            LanguageOptions {
                multiple_scope_vars: vec![ScopeVarConfig::new("theme-1", ["src/vars.less"])],
                arbitrary_mode: Some(true),
                default_primary_color: Some("#1890ff".to_string()),
                ..Default::default()
            },
        );

        let mut plugin = ThemePlugin::new(options);
        let mut host = HostConfig {
            root: root.clone(),
            ..Default::default()
        };
        plugin.config(&mut host, BuildCommand::Serve).unwrap();
        plugin.config_resolved(&host).unwrap();

        let mut hmr = ThemeHmrPlugin::new();
        hmr.build_start(&[plugin.handle()]).unwrap();

        Self {
            _tmp: tmp,
            root,
            plugin,
            hmr,
            recorder: Arc::new(Recorder::default()),
        }
    }

    fn id(&self, relative: &str) -> String {
        teinte_carton::path::path_to_posix(&self.root.join(relative))
    }

    /// The substituted preprocessor reporting a compiled module.
    fn compile(&self, relative: &str, css: &str) {
        let session = self.plugin.session().unwrap();
        session.compile_arbitrary(&self.id(relative), css);
    }

    fn change(&self, file: &Path, modules: &[ModuleNode]) -> HotUpdateOutcome {
        let channel: Arc<dyn HotChannel> = self.recorder.clone();
        self.hmr.handle_hot_update(&HotUpdateContext { file, modules }, Some(channel))
    }

    fn change_vars(&self) -> HotUpdateOutcome {
        let vars = self.root.join("src/vars.less");
        let modules = [ModuleNode {
            id: Some(self.id("src/vars.less")),
            importers: vec![self.id("src/a.less"), self.id("src/b.less"), self.id("src/main.ts")],
        }];
        self.change(&vars, &modules)
    }
}

#[test]
fn scope_variable_change_pushes_once_after_all_importers() {
    let fx = Fixture::new();
    fx.compile("src/a.less", ".a{color:#1890ff;padding:0}");
    fx.compile("src/b.less", ".b{border-color:#1890ff}");

    assert_eq!(fx.change_vars(), HotUpdateOutcome::Default);
    let coordinator = fx.hmr.coordinator().unwrap();
    assert!(matches!(coordinator.phase(), HmrPhase::Waiting { .. }));

    fx.compile("src/a.less", ".a{color:#1890ff;padding:0}");
    assert!(fx.hmr.transform(&fx.id("src/a.less")).is_none());
    assert!(fx.recorder.events().is_empty());

    fx.compile("src/b.less", ".b{border-color:#1890ff}");
    assert!(fx.hmr.transform(&fx.id("src/b.less")).is_some());
    assert_eq!(coordinator.phase(), HmrPhase::Idle);

    let events = fx.recorder.events();
    assert_eq!(events.len(), 1);
    let (event, payload) = &events[0];
    assert_eq!(event, "custom-theme-update");
    assert_eq!(
        payload["sourceThemeStyle"],
        ".a{color:#1890ff}\n.b{border-color:#1890ff}"
    );
    assert_eq!(payload["hybridValueMap"]["#1890ff"], "#1890ff");
    assert!(payload["gradientValues"].as_object().unwrap().is_empty());

    // Late transforms of the same change push nothing more.
    assert!(fx.hmr.transform(&fx.id("src/a.less")).is_none());
    assert_eq!(fx.recorder.events().len(), 1);
}

#[test]
fn pushed_style_tracks_source_changes() {
    let fx = Fixture::new();
    fx.compile("src/a.less", ".a{color:#1890ff}");
    fx.compile("src/b.less", ".b{color:#1890ff}");

    let cycle = |fx: &Fixture| {
        fx.change_vars();
        fx.hmr.transform(&fx.id("src/a.less"));
        fx.hmr.transform(&fx.id("src/b.less"));
        fx.recorder.events().last().unwrap().1["sourceThemeStyle"].clone()
    };

    let first = cycle(&fx);
    let second = cycle(&fx);
    assert_eq!(first, second);

    fx.compile("src/b.less", ".b{background:#1890ff}");
    let third = cycle(&fx);
    assert_ne!(first, third);
    assert_eq!(third, ".a{color:#1890ff}\n.b{background:#1890ff}");
    assert_eq!(fx.recorder.events().len(), 3);
}

#[test]
fn ordinary_style_change_waits_for_its_own_module() {
    let fx = Fixture::new();
    fx.compile("src/a.less", ".a{color:#1890ff}");

    let file = fx.root.join("src/a.less");
    let modules = [ModuleNode {
        id: Some(fx.id("src/a.less")),
        importers: vec![fx.id("src/main.ts")],
    }];
    assert_eq!(fx.change(&file, &modules), HotUpdateOutcome::Default);

    fx.compile("src/a.less", ".a{color:#1890ff;background:#1890ff}");
    let output = fx.hmr.transform(&fx.id("src/a.less")).unwrap();
    assert_eq!(output.style_content, ".a{color:#1890ff;background:#1890ff}");
    assert_eq!(fx.recorder.events().len(), 1);
}

#[test]
fn generated_runtime_change_updates_nothing() {
    let fx = Fixture::new();
    let runtime = fx.plugin.session().unwrap().runtime_output_path();
    assert!(runtime.is_file());
    assert_eq!(fx.change(&runtime, &[]), HotUpdateOutcome::NoModules);
    assert!(fx.recorder.events().is_empty());
}

use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tempfile::TempDir;
use tower_lsp_server::ls_types;
use url::Url;
use vls_conf::Settings;
use vls_ide::LanguageServices;
use vls_source::OsFileSystem;
use vls_workspace::LanguageId;
use vls_workspace::TextDocument;

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
    services: LanguageServices,
}

impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        Self::with_settings(files, Settings::default())
    }

    fn with_settings(files: &[(&str, &str)], settings: Settings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().canonicalize().unwrap()).unwrap();
        for (path, text) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let services = LanguageServices::new(Arc::new(OsFileSystem), settings);
        Self {
            _dir: dir,
            root,
            services,
        }
    }

    fn url(&self, relative: &str) -> Url {
        Url::from_file_path(self.root.join(relative).as_std_path()).unwrap()
    }

    fn open(&self, relative: &str, text: &str) -> Url {
        self.open_as(relative, text, LanguageId::Vue)
    }

    fn open_as(&self, relative: &str, text: &str, language: LanguageId) -> Url {
        let url = self.url(relative);
        self.services
            .open_document(&url, TextDocument::new(text, 1, language));
        url
    }
}

/// Position of the `nth` occurrence of `needle`, `offset` bytes into it.
/// Texts are ASCII so columns equal byte counts.
fn position_of(text: &str, needle: &str, nth: usize, offset: usize) -> ls_types::Position {
    let index = text.match_indices(needle).nth(nth).unwrap().0 + offset;
    let before = &text[..index];
    let line = before.matches('\n').count();
    let column = before.len() - before.rfind('\n').map_or(0, |newline| newline + 1);
    ls_types::Position::new(u32::try_from(line).unwrap(), u32::try_from(column).unwrap())
}

const COMPONENT: &str = "<template><div>{{ a }}</div></template><script>export default { data(){ return { a: 1 } } }</script>";

#[test]
fn test_template_member_checks() {
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", COMPONENT);
    assert_eq!(workspace.services.validate(&url), Vec::new());

    let edited = COMPONENT.replacen("{{ a }}", "{{ b }}", 1);
    workspace
        .services
        .update_document(&url, TextDocument::new(edited.as_str(), 2, LanguageId::Vue));
    let diagnostics = workspace.services.validate(&url);

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.code, Some(ls_types::NumberOrString::Number(2339)));
    assert_eq!(diagnostic.range.start, position_of(&edited, "{{ b }}", 0, 3));
    assert_eq!(diagnostic.range.end, position_of(&edited, "{{ b }}", 0, 4));
    insta::assert_snapshot!(diagnostic.message, @"Property 'b' does not exist on type 'App'.");
}

#[test]
fn test_template_validation_can_be_disabled() {
    let mut settings = Settings::default();
    settings.validation.template = false;
    let workspace = Workspace::with_settings(&[("tsconfig.json", "{}")], settings);
    let url = workspace.open("App.vue", &COMPONENT.replacen("{{ a }}", "{{ b }}", 1));
    assert!(workspace.services.validate(&url).is_empty());
}

#[test]
fn test_unterminated_script_still_validates() {
    let text = "<script>const x = ";
    let regions = vls_embedded::segment(text);
    assert_eq!(regions.len(), 1);
    let region = regions.iter().next().unwrap();
    assert_eq!(region.kind, vls_embedded::RegionKind::Script);
    assert_eq!(region.span.end_usize(), text.len());

    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("Broken.vue", text);
    let diagnostics = workspace.services.validate(&url);
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == Some(ls_types::NumberOrString::Number(1109))));
}

#[test]
fn test_completions_stay_in_their_project() {
    let a = "<script>\nconst alpha = 1;\nal\nexport default {}\n</script>\n";
    let b = "<script>\nconst beta = 2;\nbe\nexport default {}\n</script>\n";
    let workspace = Workspace::new(&[
        ("tsconfig.json", "{}"),
        ("a.vue", a),
        ("b/tsconfig.json", r#"{ "compilerOptions": { "strict": true } }"#),
        ("b/b.vue", b),
    ]);
    let a_url = workspace.open("a.vue", a);
    let b_url = workspace.open("b/b.vue", b);

    let labels = |url: &Url, position| -> Vec<String> {
        workspace
            .services
            .complete(url, position)
            .into_iter()
            .map(|item| item.label)
            .collect()
    };
    let in_a = labels(&a_url, position_of(a, "al\n", 0, 2));
    let in_b = labels(&b_url, position_of(b, "be\n", 0, 2));

    assert!(in_a.contains(&"alpha".to_string()));
    assert!(!in_a.contains(&"beta".to_string()));
    assert!(in_b.contains(&"beta".to_string()));
    assert!(!in_b.contains(&"alpha".to_string()));

    let projects = workspace.services.projects().projects();
    assert_eq!(projects.len(), 2);
}

#[test]
fn test_completion_resolves_details() {
    let a = "<script>\n/** The first letter. */\nconst alpha = 1;\nal\nexport default {}\n</script>\n";
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("a.vue", a);

    let item = workspace
        .services
        .complete(&url, position_of(a, "al\n", 0, 2))
        .into_iter()
        .find(|item| item.label == "alpha")
        .unwrap();
    assert!(item.detail.is_none());
    assert!(item.text_edit.is_some());

    let resolved = workspace.services.resolve_completion(item);
    assert!(resolved.detail.unwrap().contains("alpha"));
}

#[test]
fn test_hover_outside_of_script_regions() {
    let text = "<template><p>{{ a }}</p></template>\n<script>export default { data() { return { a: 1 } } }</script>\n<style>.a { color: red }</style>\n";
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", text);

    assert!(workspace
        .services
        .hover(&url, position_of(text, "color", 0, 2))
        .is_none());
    assert!(workspace
        .services
        .hover(&url, position_of(text, "<p>", 0, 1))
        .is_none());

    let position = position_of(text, "{{ a }}", 0, 3);
    let hover = workspace.services.hover(&url, position).unwrap();
    assert_eq!(hover.range.map(|range| range.start), Some(position));
    assert_eq!(workspace.services.hover(&url, position), Some(hover));
}

#[test]
fn test_template_definition_lands_in_script() {
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", COMPONENT);

    let locations = workspace
        .services
        .find_definition(&url, position_of(COMPONENT, "{{ a }}", 0, 3));
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri.as_str(), url.as_str());
    let script_start = position_of(COMPONENT, "<script>", 0, 8);
    assert!(locations[0].range.start.character >= script_start.character);
}

#[test]
fn test_document_symbols_of_script() {
    let text = "<template><p/></template>\n<script>\nfunction helper() {}\nexport default {}\n</script>\n";
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", text);

    let symbols = workspace.services.document_symbols(&url);
    let helper = symbols.iter().find(|symbol| symbol.name == "helper").unwrap();
    assert_eq!(helper.kind, ls_types::SymbolKind::FUNCTION);
    assert_eq!(helper.selection_range.start, position_of(text, "helper", 0, 0));
}

#[test]
fn test_format_touches_only_the_script() {
    let text = "<template>\n      <p/>\n</template>\n<script>\nexport default {\ndata() { return {} }\n}\n</script>\n";
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", text);

    let options = ls_types::FormattingOptions {
        tab_size: 2,
        insert_spaces: true,
        ..Default::default()
    };
    let edits = workspace.services.format(&url, None, &options);
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].new_text, "  ");
    assert_eq!(edits[0].range.start, position_of(text, "data()", 0, 0));
}

#[test]
fn test_open_buffers_shadow_disk_until_closed() {
    let main = "<script>\nimport * as util from './util';\nutil.\nexport default {}\n</script>\n";
    let workspace = Workspace::new(&[
        ("tsconfig.json", "{}"),
        ("util.ts", "export const onDisk = 1;\n"),
        ("main.vue", main),
    ]);
    let util = workspace.open_as(
        "util.ts",
        "export const inBuffer = 1;\n",
        LanguageId::TypeScript,
    );
    let url = workspace.open("main.vue", main);
    let members = || -> Vec<String> {
        workspace
            .services
            .complete(&url, position_of(main, "util.\n", 0, 5))
            .into_iter()
            .map(|item| item.label)
            .collect()
    };

    assert_eq!(members(), vec!["inBuffer".to_string()]);
    workspace.services.on_document_removed(&util);
    assert_eq!(members(), vec!["onDisk".to_string()]);
}

#[test]
fn test_concurrent_edits_and_validation() {
    let texts = [
        "<template>ééé{{ a }}</template><script>export default { data(){ return { a: 1 } } }</script>",
        "<template >ééé{{ a }}</template><script>export default { data(){ return { a: 1 } } }</script>",
    ];
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("Accents.vue", texts[0]);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for version in 2..500 {
                let text = texts[usize::try_from(version).unwrap() % 2];
                workspace
                    .services
                    .update_document(&url, TextDocument::new(text, version, LanguageId::Vue));
            }
        });
        for _ in 0..3 {
            scope.spawn(|| {
                for _ in 0..300 {
                    let diagnostics = workspace.services.validate(&url);
                    assert!(diagnostics
                        .iter()
                        .all(|diagnostic| diagnostic.code != Some(ls_types::NumberOrString::Number(2339))));
                }
            });
        }
    });

    assert!(workspace.services.validate(&url).is_empty());
}

#[test]
fn test_config_change_rebuilds_project() {
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", COMPONENT);
    workspace.services.validate(&url);
    let before = workspace.services.projects().projects();
    assert_eq!(before.len(), 1);

    workspace
        .services
        .on_external_file_changed(&workspace.root.join("tsconfig.json"));
    assert!(before[0].is_disposed());
    assert!(workspace.services.projects().is_empty());

    assert!(workspace.services.validate(&url).is_empty());
    assert_eq!(workspace.services.projects().len(), 1);
}

#[test]
fn test_dispose_releases_projects() {
    let workspace = Workspace::new(&[("tsconfig.json", "{}")]);
    let url = workspace.open("App.vue", COMPONENT);
    workspace.services.validate(&url);
    workspace.services.dispose();
    assert!(workspace.services.projects().is_empty());

    // the document is still open and served again on demand
    assert!(workspace.services.validate(&url).is_empty());
}

#[test]
fn test_unknown_documents_yield_empty_results() {
    let workspace = Workspace::new(&[]);
    let url = workspace.url("Missing.vue");
    let position = ls_types::Position::new(0, 0);
    assert!(workspace.services.validate(&url).is_empty());
    assert!(workspace.services.complete(&url, position).is_empty());
    assert!(workspace.services.hover(&url, position).is_none());
    assert!(workspace.services.signature_help(&url, position).is_none());
    assert!(workspace.services.document_highlights(&url, position).is_empty());
    assert!(workspace.services.find_references(&url, position).is_empty());
    assert!(workspace
        .services
        .apply_refactor(serde_json::json!({ "nonsense": true }))
        .is_none());
}

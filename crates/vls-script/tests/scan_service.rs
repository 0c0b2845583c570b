use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashMap;
use vls_conf::CompilerOptions;
use vls_script::DocumentRegistry;
use vls_script::FormatOptions;
use vls_script::HighlightKind;
use vls_script::LanguageService;
use vls_script::ResolvedModule;
use vls_script::ScanServiceFactory;
use vls_script::ServiceError;
use vls_script::ServiceFactory;
use vls_script::ServiceHost;
use vls_script::SymbolKind;
use vls_source::Offset;
use vls_source::Span;

#[derive(Default)]
struct MemoryHost {
    files: Mutex<FxHashMap<Utf8PathBuf, (u64, Arc<str>)>>,
}

impl MemoryHost {
    fn with(files: &[(&str, &str)]) -> Arc<Self> {
        let host = Arc::new(Self::default());
        for (path, text) in files {
            host.set(path, text);
        }
        host
    }

    fn set(&self, path: &str, text: &str) {
        let mut files = self.files.lock().unwrap();
        let version = files.get(Utf8Path::new(path)).map_or(1, |(v, _)| v + 1);
        files.insert(Utf8PathBuf::from(path), (version, Arc::from(text)));
    }
}

impl ServiceHost for MemoryHost {
    fn script_file_names(&self) -> Vec<Utf8PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn script_version(&self, path: &Utf8Path) -> Option<u64> {
        self.files.lock().unwrap().get(path).map(|(v, _)| *v)
    }

    fn script_snapshot(&self, path: &Utf8Path) -> Option<Arc<str>> {
        self.files.lock().unwrap().get(path).map(|(_, t)| Arc::clone(t))
    }

    fn resolve_module(&self, specifier: &str, containing: &Utf8Path) -> Option<ResolvedModule> {
        let base = containing.parent()?.join(specifier.trim_start_matches("./"));
        let files = self.files.lock().unwrap();
        [
            format!("{base}.ts"),
            base.to_string(),
        ]
        .into_iter()
        .map(Utf8PathBuf::from)
        .find(|candidate| files.contains_key(candidate))
        .map(|path| ResolvedModule {
            path,
            is_external_library: false,
        })
    }
}

fn service(host: &Arc<MemoryHost>, options: CompilerOptions) -> Arc<dyn LanguageService> {
    ScanServiceFactory.create(host.clone(), Arc::new(DocumentRegistry::new()), options)
}

fn offset_of(text: &str, needle: &str) -> Offset {
    Offset::from_usize(text.find(needle).unwrap())
}

const COMPONENT: &str = "/** The counter. */\nexport default {\n  props: ['start'],\n  data() {\n    return { a: 1 }\n  },\n  methods: {\n    /** Bump it. */\n    inc(by) { this.a += by }\n  }\n}\n";

const TEMPLATE: &str = "import __vlsComponent from \"./App.vue\";\nfunction __vlsRender(this: typeof __vlsComponent) {\n(this.a);\n(this.b);\nthis.inc(1);\n}\n";

fn component_host() -> Arc<MemoryHost> {
    MemoryHost::with(&[
        ("/p/App.vue.ts", COMPONENT),
        ("/p/App.vue.template.ts", TEMPLATE),
    ])
}

#[test]
fn test_missing_component_member_is_reported() {
    let host = component_host();
    let service = service(&host, CompilerOptions::default());
    let diagnostics = service
        .semantic_diagnostics(Utf8Path::new("/p/App.vue.template.ts"))
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, 2339);
    assert_eq!(diagnostics[0].message, "Property 'b' does not exist on type 'App'.");
    let b = TEMPLATE.find("this.b").unwrap() + 5;
    assert_eq!(diagnostics[0].span, Span::from_parts(b, 1));
}

#[test]
fn test_unresolved_import() {
    let text = "import missing from './missing';\nexport default missing;\n";
    let host = MemoryHost::with(&[("/p/main.ts", text)]);
    let service = service(&host, CompilerOptions::default());
    let diagnostics = service
        .semantic_diagnostics(Utf8Path::new("/p/main.ts"))
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, 2307);
    assert_eq!(
        diagnostics[0].message,
        "Cannot find module './missing' or its corresponding type declarations."
    );
}

#[test]
fn test_unused_locals_follow_options() {
    let text = "export function f() {\n  const unused = 1;\n}\n";
    let host = MemoryHost::with(&[("/p/main.ts", text)]);
    let path = Utf8Path::new("/p/main.ts");

    let relaxed = service(&host, CompilerOptions::default());
    assert!(relaxed.semantic_diagnostics(path).unwrap().is_empty());

    let strict = service(
        &host,
        CompilerOptions {
            no_unused_locals: Some(true),
            ..CompilerOptions::default()
        },
    );
    let diagnostics = strict.semantic_diagnostics(path).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, 6133);
    assert!(diagnostics[0].reports_unnecessary);

    let fixes = strict
        .code_fixes(path, diagnostics[0].span, &[6133])
        .unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].changes[0].changes[0].span, Span::new(22, 20));
}

#[test]
fn test_member_completions_after_this() {
    let host = component_host();
    let service = service(&host, CompilerOptions::default());
    let path = Utf8Path::new("/p/App.vue.template.ts");
    let offset = Offset::new(offset_of(TEMPLATE, "this.a").get() + 5);

    let names: Vec<String> = service
        .completions(path, offset)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["start", "a", "inc"]);
}

#[test]
fn test_identifier_completions_hide_render_scaffolding() {
    let host = component_host();
    let service = service(&host, CompilerOptions::default());
    let path = Utf8Path::new("/p/App.vue.template.ts");
    let offset = offset_of(TEMPLATE, "(this.a)");

    let entries = service.completions(path, offset).unwrap();
    let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
    assert!(names.starts_with(&["start", "a", "inc"]));
    assert!(!names.contains(&"__vlsComponent"));
    assert!(!names.contains(&"__vlsRender"));
    assert!(entries
        .iter()
        .filter(|entry| entry.kind == SymbolKind::Keyword)
        .all(|entry| entry.sort_text == "15"));
}

#[test]
fn test_quick_info_and_definition_of_member() {
    let host = component_host();
    let service = service(&host, CompilerOptions::default());
    let path = Utf8Path::new("/p/App.vue.template.ts");
    let offset = Offset::new(offset_of(TEMPLATE, "this.inc").get() + 6);

    let info = service.quick_info(path, offset).unwrap().unwrap();
    assert_eq!(info.display, "(method) inc(by)");
    assert_eq!(info.documentation, "Bump it.");

    let definitions = service.definition(path, offset).unwrap();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].path, "/p/App.vue.ts");
    assert_eq!(
        definitions[0].span,
        Span::from_parts(COMPONENT.find("inc(by)").unwrap(), 3)
    );
}

#[test]
fn test_signature_help() {
    let text = "/** Adds. */\nfunction add(a: number, b: number) { return a + b; }\nadd(1, ";
    let host = MemoryHost::with(&[("/p/main.ts", text)]);
    let service = service(&host, CompilerOptions::default());
    let help = service
        .signature_help(Utf8Path::new("/p/main.ts"), Offset::from_usize(text.len()))
        .unwrap()
        .unwrap();
    assert_eq!(help.items[0].label, "add(a: number, b: number)");
    assert_eq!(help.items[0].documentation, "Adds.");
    assert_eq!(help.active_parameter, 1);
}

#[test]
fn test_highlights_and_references() {
    let text = "let n = 1;\nn = n + 1;\nexport { n };\n";
    let host = MemoryHost::with(&[("/p/main.ts", text)]);
    let service = service(&host, CompilerOptions::default());
    let path = Utf8Path::new("/p/main.ts");

    let highlights = service.document_highlights(path, Offset::new(4)).unwrap();
    let kinds: Vec<HighlightKind> = highlights.iter().map(|h| h.kind).collect();
    assert_eq!(
        kinds,
        vec![
            HighlightKind::Write,
            HighlightKind::Write,
            HighlightKind::Read,
            HighlightKind::Read,
        ]
    );
    assert_eq!(service.references(path, Offset::new(4)).unwrap().len(), 4);
}

#[test]
fn test_navigation_tree_lists_component_members() {
    let host = component_host();
    let service = service(&host, CompilerOptions::default());
    let tree = service
        .navigation_tree(Utf8Path::new("/p/App.vue.ts"))
        .unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].name, "default");
    let members: Vec<&str> = tree[0].children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(members, vec!["start", "a", "inc"]);
}

#[test]
fn test_organize_imports_refactor() {
    let text = "import b from './b';\nimport a from './a';\nexport default a;\n";
    let host = MemoryHost::with(&[("/p/main.ts", text)]);
    let service = service(&host, CompilerOptions::default());
    let path = Utf8Path::new("/p/main.ts");
    let whole = Span::from_parts(0, text.len());

    let refactors = service.applicable_refactors(path, whole).unwrap();
    assert_eq!(refactors[0].name, "organizeImports");

    let edits = service
        .edits_for_refactor(path, whole, "organizeImports", "organizeImports")
        .unwrap();
    let change = &edits.edits[0].changes[0];
    assert_eq!(change.new_text, "import a from './a';");

    let unknown = service.edits_for_refactor(path, whole, "extractFunction", "x");
    assert!(matches!(unknown, Err(ServiceError::UnknownRefactor(_))));
}

#[test]
fn test_formatting_through_service() {
    let text = "function f() {\nreturn 1;\n}\n";
    let host = MemoryHost::with(&[("/p/main.js", text)]);
    let service = service(&host, CompilerOptions::default());
    let changes = service
        .formatting_edits(
            Utf8Path::new("/p/main.js"),
            Span::from_parts(0, text.len()),
            &FormatOptions::default(),
        )
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].new_text, "  ");
}

#[test]
fn test_models_are_rebuilt_only_on_version_change() {
    let host = MemoryHost::with(&[("/p/main.ts", "const a = 1;")]);
    let registry = Arc::new(DocumentRegistry::new());
    let service = ScanServiceFactory.create(host.clone(), registry.clone(), CompilerOptions::default());
    let path = Utf8Path::new("/p/main.ts");

    service.syntactic_diagnostics(path).unwrap();
    service.syntactic_diagnostics(path).unwrap();
    assert_eq!(registry.len(), 1);

    host.set("/p/main.ts", "const a = ;");
    let diagnostics = service.syntactic_diagnostics(path).unwrap();
    assert_eq!(diagnostics[0].code, 1109);
}

#[test]
fn test_unknown_file_and_disposal() {
    let host = MemoryHost::with(&[("/p/main.ts", "")]);
    let service = service(&host, CompilerOptions::default());

    let unknown = service.syntactic_diagnostics(Utf8Path::new("/p/other.ts"));
    assert!(matches!(unknown, Err(ServiceError::UnknownFile(_))));

    let out_of_range = service.quick_info(Utf8Path::new("/p/main.ts"), Offset::new(10));
    assert!(matches!(out_of_range, Err(ServiceError::OffsetOutOfRange { .. })));

    service.dispose();
    let disposed = service.syntactic_diagnostics(Utf8Path::new("/p/main.ts"));
    assert_eq!(disposed, Err(ServiceError::Disposed));
}

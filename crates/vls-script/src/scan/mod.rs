//! The built-in analysis engine.
//!
//! [`ScanService`] answers every [`LanguageService`] request from a
//! token-level [`SourceModel`] of each file: scoped declarations, imports and
//! the option object of a default-exported component. It has no type
//! checker, so member access is only understood through `this` in functions
//! whose `this` parameter is typed as a component import.

mod checks;
mod edits;
mod format;
mod model;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use vls_conf::CompilerOptions;
use vls_source::Offset;
use vls_source::Span;

use model::ComponentMember;
use model::ComponentShape;
use model::FunctionInfo;
use model::ImportedName;
use model::MemberKind;
pub(crate) use model::SourceModel;

use crate::host::ServiceHost;
use crate::lexer;
use crate::registry::DocumentRegistry;
use crate::service::CodeFixAction;
use crate::service::CompletionDetails;
use crate::service::CompletionEntry;
use crate::service::FileSpan;
use crate::service::FileTextChanges;
use crate::service::FormatOptions;
use crate::service::Highlight;
use crate::service::HighlightKind;
use crate::service::LanguageService;
use crate::service::NavigationItem;
use crate::service::QuickInfo;
use crate::service::RefactorAction;
use crate::service::RefactorEdits;
use crate::service::RefactorInfo;
use crate::service::ServiceDiagnostic;
use crate::service::ServiceError;
use crate::service::ServiceResult;
use crate::service::SignatureHelpItems;
use crate::service::SignatureItem;
use crate::service::SymbolKind;
use crate::service::TextChange;

const ORGANIZE_IMPORTS: &str = "organizeImports";
const SORT_IMPORTS: &str = "sortImports";

const WRITE_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=", "++", "--",
];

/// Another file's model, reached through an import.
pub(crate) struct Target {
    pub(crate) path: Utf8PathBuf,
    pub(crate) model: Arc<SourceModel>,
}

impl Target {
    fn shape(&self) -> Option<&ComponentShape> {
        self.model.component.as_ref()
    }
}

/// One request against one file.
pub(crate) struct Context<'a> {
    pub(crate) host: &'a dyn ServiceHost,
    pub(crate) registry: &'a DocumentRegistry,
    pub(crate) options: &'a CompilerOptions,
    pub(crate) path: &'a Utf8Path,
    pub(crate) model: Arc<SourceModel>,
}

impl Context<'_> {
    fn import_target(&self, import: usize) -> Option<Target> {
        let import = self.model.imports.get(import)?;
        let resolved = self.host.resolve_module(&import.specifier, self.path)?;
        let model = self.registry.acquire(self.host, &resolved.path)?;
        Some(Target {
            path: resolved.path,
            model,
        })
    }

    /// The component `this` is typed as inside `function`.
    pub(crate) fn this_component(&self, function: &FunctionInfo) -> Option<Target> {
        let binding = function.this_binding.as_deref()?;
        let declaration = self.model.lookup(binding, function.body.start())?;
        let Some((import, ImportedName::Default)) = &self.model.declarations[declaration].import
        else {
            return None;
        };
        let target = self.import_target(*import)?;
        target.shape().is_some().then_some(target)
    }

    fn this_component_at(&self, offset: u32) -> Option<Target> {
        self.this_component(self.model.typed_this_function_at(offset)?)
    }

    /// Target of `ns.member` where `ns` is a namespace import.
    fn namespace_target(&self, object: usize) -> Option<Target> {
        let declaration = self.model.resolve(object)?;
        let Some((import, ImportedName::Namespace)) = &self.model.declarations[declaration].import
        else {
            return None;
        };
        self.import_target(*import)
    }
}

fn exported_declaration(model: &SourceModel, name: &str) -> Option<usize> {
    let file = model.file_span();
    model
        .declarations
        .iter()
        .position(|d| d.name == name && d.exported && d.scope == file)
}

fn member_symbol_kind(member: &ComponentMember) -> SymbolKind {
    if member.kind == MemberKind::Method {
        SymbolKind::Method
    } else {
        SymbolKind::Property
    }
}

fn member_display(model: &SourceModel, member: &ComponentMember) -> String {
    if member.kind == MemberKind::Method {
        let params = member
            .function
            .map_or_else(|| "()".to_string(), |f| model.compact(model.functions[f].params_span));
        format!("(method) {}{params}", member.name)
    } else {
        format!("(property) {}", member.name)
    }
}

fn declaration_display(model: &SourceModel, index: usize) -> String {
    let declaration = &model.declarations[index];
    let name = &declaration.name;
    let annotation = declaration
        .annotation
        .map(|span| format!(": {}", model.compact(span)))
        .unwrap_or_default();
    match declaration.kind {
        SymbolKind::Function => {
            let params = declaration.function.map_or_else(
                || "()".to_string(),
                |f| model.compact(model.functions[f].params_span),
            );
            format!("function {name}{params}")
        }
        SymbolKind::Parameter => format!("(parameter) {name}{annotation}"),
        SymbolKind::Alias => {
            let Some((import, imported)) = &declaration.import else {
                return format!("(alias) {name}");
            };
            let specifier = &model.imports[*import].specifier;
            match imported {
                ImportedName::Default => format!("(alias) import {name} from \"{specifier}\""),
                ImportedName::Named(original) if original != name => {
                    format!("(alias) import {{ {original} as {name} }} from \"{specifier}\"")
                }
                ImportedName::Named(_) => {
                    format!("(alias) import {{ {name} }} from \"{specifier}\"")
                }
                ImportedName::Namespace => {
                    format!("(alias) import * as {name} from \"{specifier}\"")
                }
            }
        }
        SymbolKind::Const | SymbolKind::Let | SymbolKind::Variable => {
            format!("{} {name}{annotation}", declaration.kind.label())
        }
        kind => format!("{} {name}", kind.label()),
    }
}

fn declaration_documentation(model: &SourceModel, index: usize) -> String {
    let declaration = &model.declarations[index];
    if declaration.kind == SymbolKind::Parameter {
        return String::new();
    }
    model
        .jsdoc_before(declaration.statement.start())
        .unwrap_or_default()
}

fn highlight_kind(model: &SourceModel, token: usize) -> HighlightKind {
    if model
        .declarations
        .iter()
        .any(|declaration| declaration.token == token)
        || WRITE_OPERATORS.contains(&model.text_at(token + 1))
    {
        HighlightKind::Write
    } else {
        HighlightKind::Read
    }
}

pub struct ScanService {
    host: Arc<dyn ServiceHost>,
    registry: Arc<DocumentRegistry>,
    options: CompilerOptions,
    disposed: AtomicBool,
}

impl ScanService {
    #[must_use]
    pub fn new(
        host: Arc<dyn ServiceHost>,
        registry: Arc<DocumentRegistry>,
        options: CompilerOptions,
    ) -> Self {
        Self {
            host,
            registry,
            options,
            disposed: AtomicBool::new(false),
        }
    }

    fn context<'a>(&'a self, path: &'a Utf8Path) -> ServiceResult<Context<'a>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ServiceError::Disposed);
        }
        if !self.host.has_script(path) {
            return Err(ServiceError::UnknownFile(path.to_path_buf()));
        }
        let model = self
            .registry
            .acquire(self.host.as_ref(), path)
            .ok_or_else(|| ServiceError::UnknownFile(path.to_path_buf()))?;
        Ok(Context {
            host: self.host.as_ref(),
            registry: &self.registry,
            options: &self.options,
            path,
            model,
        })
    }

    fn context_at<'a>(&'a self, path: &'a Utf8Path, offset: Offset) -> ServiceResult<Context<'a>> {
        let cx = self.context(path)?;
        if offset.as_usize() > cx.model.text.len() {
            return Err(ServiceError::OffsetOutOfRange {
                path: path.to_path_buf(),
                offset: offset.get(),
            });
        }
        Ok(cx)
    }

    fn member_completions(cx: &Context<'_>, dot: usize, offset: u32) -> Vec<(String, SymbolKind)> {
        let model = &cx.model;
        let Some(object) = dot.checked_sub(1) else {
            return Vec::new();
        };
        if model.is_keyword(object, "this") {
            let Some(target) = cx.this_component_at(offset) else {
                return Vec::new();
            };
            return target
                .shape()
                .map(|shape| {
                    shape
                        .members
                        .iter()
                        .map(|member| (member.name.clone(), member_symbol_kind(member)))
                        .collect()
                })
                .unwrap_or_default();
        }
        let Some(target) = cx.namespace_target(object) else {
            return Vec::new();
        };
        let file = target.model.file_span();
        target
            .model
            .declarations
            .iter()
            .filter(|d| d.exported && d.scope == file)
            .map(|d| (d.name.clone(), d.kind))
            .collect()
    }

    fn quick_info_at(cx: &Context<'_>, offset: Offset) -> Option<QuickInfo> {
        let model = &cx.model;
        let index = model.word_at(offset)?;
        let span = model.tokens[index].span;
        let name = model.text_at(index);

        if model.is_this_member(index) {
            let target = cx.this_component_at(span.start())?;
            let member = target.shape()?.member(name)?;
            return Some(QuickInfo {
                span,
                kind: member_symbol_kind(member),
                display: member_display(&target.model, member),
                documentation: target
                    .model
                    .jsdoc_before(member.span.start())
                    .unwrap_or_default(),
            });
        }
        if model.is_member_name(index) {
            let target = cx.namespace_target(index.checked_sub(2)?)?;
            let declaration = exported_declaration(&target.model, name)?;
            return Some(QuickInfo {
                span,
                kind: target.model.declarations[declaration].kind,
                display: declaration_display(&target.model, declaration),
                documentation: declaration_documentation(&target.model, declaration),
            });
        }

        let declaration = model.resolve(index)?;
        Some(QuickInfo {
            span,
            kind: model.declarations[declaration].kind,
            display: declaration_display(model, declaration),
            documentation: declaration_documentation(model, declaration),
        })
    }

    /// Parameters, display name and documentation of the function a call
    /// at `callee` targets.
    fn callee_signature(cx: &Context<'_>, callee: usize) -> Option<SignatureItem> {
        let model = &cx.model;
        let name = model.text_at(callee).to_string();

        let (target_model, function): (Arc<SourceModel>, usize) = if model.is_this_member(callee) {
            let target = cx.this_component_at(model.tokens[callee].span.start())?;
            let function = target.shape()?.member(&name)?.function?;
            (target.model, function)
        } else if model.is_member_name(callee) {
            return None;
        } else {
            let declaration = model.resolve(callee)?;
            let found = &model.declarations[declaration];
            match (&found.import, found.kind) {
                (Some((import, ImportedName::Named(original))), _) => {
                    let target = cx.import_target(*import)?;
                    let exported = exported_declaration(&target.model, original)?;
                    let function = Self::declared_function(&target.model, exported)?;
                    (target.model, function)
                }
                (Some(_), _) => return None,
                _ => (
                    Arc::clone(model),
                    Self::declared_function(model, declaration)?,
                ),
            }
        };

        let function = &target_model.functions[function];
        let parameters: Vec<String> = function
            .params
            .iter()
            .map(|&param| target_model.compact(target_model.declarations[param].statement))
            .collect();
        let documentation = function
            .name_span
            .and_then(|span| {
                let statement = target_model
                    .declarations
                    .iter()
                    .find(|d| d.span == span)
                    .map_or(span.start(), |d| d.statement.start());
                target_model.jsdoc_before(statement)
            })
            .unwrap_or_default();
        Some(SignatureItem {
            label: format!("{name}({})", parameters.join(", ")),
            parameters,
            documentation,
        })
    }

    /// The function a declaration names: a function declaration or a
    /// variable initialised with a function.
    fn declared_function(model: &SourceModel, declaration: usize) -> Option<usize> {
        let declaration = &model.declarations[declaration];
        if declaration.kind == SymbolKind::Function {
            return declaration.function;
        }
        model
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.span.start() > declaration.span.end()
                    && declaration.statement.contains_span(f.span)
            })
            .min_by_key(|(_, f)| f.span.start())
            .map(|(index, _)| index)
    }

    fn navigation_item(model: &SourceModel, index: usize) -> NavigationItem {
        let declaration = &model.declarations[index];
        let children = declaration
            .function
            .filter(|_| declaration.kind == SymbolKind::Function)
            .map(|function| {
                let body = model.functions[function].body;
                model
                    .declarations
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| d.scope == body && d.kind != SymbolKind::Parameter)
                    .map(|(child, _)| Self::navigation_item(model, child))
                    .collect()
            })
            .unwrap_or_default();
        NavigationItem {
            name: declaration.name.clone(),
            kind: declaration.kind,
            span: declaration.statement,
            selection_span: declaration.span,
            children,
        }
    }
}

impl LanguageService for ScanService {
    fn syntactic_diagnostics(&self, path: &Utf8Path) -> ServiceResult<Vec<ServiceDiagnostic>> {
        let cx = self.context(path)?;
        Ok(checks::syntactic(&cx.model))
    }

    fn semantic_diagnostics(&self, path: &Utf8Path) -> ServiceResult<Vec<ServiceDiagnostic>> {
        let cx = self.context(path)?;
        Ok(checks::semantic(&cx))
    }

    fn completions(
        &self,
        path: &Utf8Path,
        offset: Offset,
    ) -> ServiceResult<Vec<CompletionEntry>> {
        let cx = self.context_at(path, offset)?;
        let model = &cx.model;
        if model.in_literal_or_comment(offset) {
            return Ok(Vec::new());
        }

        let word = model
            .word_at(offset)
            .filter(|&index| model.tokens[index].span.start() < offset.get());
        let replacement_span = word.map(|index| model.tokens[index].span);
        let before = match word {
            Some(index) => index.checked_sub(1),
            None => model
                .tokens
                .partition_point(|token| token.span.end() <= offset.get())
                .checked_sub(1),
        };
        let entry = |name: String, kind: SymbolKind, sort_text: &str| CompletionEntry {
            name,
            kind,
            sort_text: sort_text.to_string(),
            replacement_span,
        };

        if let Some(dot) = before.filter(|&i| model.is_punct(i, ".") || model.is_punct(i, "?.")) {
            return Ok(Self::member_completions(&cx, dot, offset.get())
                .into_iter()
                .map(|(name, kind)| entry(name, kind, "11"))
                .collect());
        }

        // the component binding and the function typed by it are scaffolding
        let hidden: FxHashSet<&str> = model
            .functions
            .iter()
            .filter(|function| function.this_binding.is_some())
            .flat_map(|function| [function.this_binding.as_deref(), function.name.as_deref()])
            .flatten()
            .collect();
        let mut seen = FxHashSet::default();
        let mut entries = Vec::new();

        if let Some(target) = cx.this_component_at(offset.get()) {
            for member in target.shape().map(|s| s.members.as_slice()).unwrap_or_default() {
                if seen.insert(member.name.clone()) {
                    entries.push(entry(member.name.clone(), member_symbol_kind(member), "11"));
                }
            }
        }
        for index in model.visible(offset.get()) {
            let declaration = &model.declarations[index];
            if hidden.contains(declaration.name.as_str()) || !seen.insert(declaration.name.clone())
            {
                continue;
            }
            entries.push(entry(declaration.name.clone(), declaration.kind, "11"));
        }
        for keyword in lexer::KEYWORDS {
            if seen.insert((*keyword).to_string()) {
                entries.push(entry((*keyword).to_string(), SymbolKind::Keyword, "15"));
            }
        }
        Ok(entries)
    }

    fn completion_details(
        &self,
        path: &Utf8Path,
        offset: Offset,
        name: &str,
    ) -> ServiceResult<Option<CompletionDetails>> {
        let cx = self.context_at(path, offset)?;
        let model = &cx.model;

        if let Some(target) = cx.this_component_at(offset.get()) {
            if let Some(member) = target.shape().and_then(|shape| shape.member(name)) {
                return Ok(Some(CompletionDetails {
                    name: name.to_string(),
                    kind: member_symbol_kind(member),
                    display: member_display(&target.model, member),
                    documentation: target
                        .model
                        .jsdoc_before(member.span.start())
                        .unwrap_or_default(),
                }));
            }
        }
        if let Some(index) = model
            .visible(offset.get())
            .into_iter()
            .find(|&index| model.declarations[index].name == name)
        {
            return Ok(Some(CompletionDetails {
                name: name.to_string(),
                kind: model.declarations[index].kind,
                display: declaration_display(model, index),
                documentation: declaration_documentation(model, index),
            }));
        }
        if lexer::is_keyword(name) {
            return Ok(Some(CompletionDetails {
                name: name.to_string(),
                kind: SymbolKind::Keyword,
                display: name.to_string(),
                documentation: String::new(),
            }));
        }
        Ok(None)
    }

    fn quick_info(&self, path: &Utf8Path, offset: Offset) -> ServiceResult<Option<QuickInfo>> {
        let cx = self.context_at(path, offset)?;
        Ok(Self::quick_info_at(&cx, offset))
    }

    fn signature_help(
        &self,
        path: &Utf8Path,
        offset: Offset,
    ) -> ServiceResult<Option<SignatureHelpItems>> {
        let cx = self.context_at(path, offset)?;
        let model = &cx.model;
        if model.in_literal_or_comment(offset) {
            return Ok(None);
        }

        let mut cursor = model
            .tokens
            .partition_point(|token| token.span.start() < offset.get());
        let mut commas = 0u32;
        let open = loop {
            let Some(previous) = cursor.checked_sub(1) else {
                return Ok(None);
            };
            cursor = previous;
            match model.text_at(cursor) {
                ")" | "]" | "}" => match model.partner[cursor] {
                    Some(open) => cursor = open,
                    None => return Ok(None),
                },
                "," => commas += 1,
                "(" => break cursor,
                "{" | "[" | ";" => return Ok(None),
                _ => {}
            }
        };

        let Some(callee) = open.checked_sub(1).filter(|&i| {
            model.is_ident(i)
                && !model.property_keys.contains(&i)
                && !model.is_keyword(i.wrapping_sub(1), "function")
        }) else {
            return Ok(None);
        };
        let Some(item) = Self::callee_signature(&cx, callee) else {
            return Ok(None);
        };

        let start = model.tokens[open].span.end();
        let end = model.partner[open].map_or(offset.get(), |close| model.tokens[close].span.start());
        Ok(Some(SignatureHelpItems {
            items: vec![item],
            applicable_span: Span::new(start, end.saturating_sub(start)),
            active_item: 0,
            active_parameter: commas,
        }))
    }

    fn document_highlights(
        &self,
        path: &Utf8Path,
        offset: Offset,
    ) -> ServiceResult<Vec<Highlight>> {
        let cx = self.context_at(path, offset)?;
        let model = &cx.model;
        let Some(index) = model.word_at(offset) else {
            return Ok(Vec::new());
        };

        let tokens: Vec<usize> = if model.is_this_member(index) {
            let name = model.text_at(index);
            (0..model.tokens.len())
                .filter(|&i| model.is_this_member(i) && model.text_at(i) == name)
                .collect()
        } else {
            let Some(declaration) = model.resolve(index) else {
                return Ok(Vec::new());
            };
            let mut tokens = model.references(declaration);
            tokens.push(model.declarations[declaration].token);
            tokens.sort_unstable();
            tokens
        };

        Ok(tokens
            .into_iter()
            .map(|token| Highlight {
                span: model.tokens[token].span,
                kind: highlight_kind(model, token),
            })
            .collect())
    }

    fn navigation_tree(&self, path: &Utf8Path) -> ServiceResult<Vec<NavigationItem>> {
        let cx = self.context(path)?;
        let model = &cx.model;
        let file = model.file_span();

        let mut items: Vec<NavigationItem> = model
            .declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| {
                d.scope == file && !matches!(d.kind, SymbolKind::Parameter | SymbolKind::Alias)
            })
            .map(|(index, _)| Self::navigation_item(model, index))
            .collect();

        if let (Some(shape), Some(default)) = (&model.component, model.default_export) {
            items.push(NavigationItem {
                name: "default".to_string(),
                kind: SymbolKind::Module,
                span: Span::from_bounds(default.start_usize(), shape.object.end_usize()),
                selection_span: default,
                children: shape
                    .members
                    .iter()
                    .map(|member| NavigationItem {
                        name: member.name.clone(),
                        kind: member_symbol_kind(member),
                        span: member
                            .function
                            .map_or(member.span, |f| model.functions[f].span),
                        selection_span: member.span,
                        children: Vec::new(),
                    })
                    .collect(),
            });
        }
        items.sort_by_key(|item| item.span.start());
        Ok(items)
    }

    fn definition(&self, path: &Utf8Path, offset: Offset) -> ServiceResult<Vec<FileSpan>> {
        let cx = self.context_at(path, offset)?;
        let model = &cx.model;
        let Some(index) = model.word_at(offset) else {
            return Ok(Vec::new());
        };
        let name = model.text_at(index);

        if model.is_this_member(index) {
            let found = cx
                .this_component_at(model.tokens[index].span.start())
                .and_then(|target| {
                    let member = target.shape()?.member(name)?;
                    Some(FileSpan {
                        span: member.span,
                        path: target.path,
                    })
                });
            return Ok(found.into_iter().collect());
        }
        if model.is_member_name(index) {
            let found = index
                .checked_sub(2)
                .and_then(|object| cx.namespace_target(object))
                .and_then(|target| {
                    let declaration = exported_declaration(&target.model, name)?;
                    Some(FileSpan {
                        span: target.model.declarations[declaration].span,
                        path: target.path,
                    })
                });
            return Ok(found.into_iter().collect());
        }

        let Some(declaration) = model.resolve(index) else {
            return Ok(Vec::new());
        };
        let local = FileSpan {
            path: path.to_path_buf(),
            span: model.declarations[declaration].span,
        };
        let Some((import, imported)) = &model.declarations[declaration].import else {
            return Ok(vec![local]);
        };
        let Some(target) = cx.import_target(*import) else {
            return Ok(vec![local]);
        };
        let span = match imported {
            ImportedName::Default => target.model.default_export,
            ImportedName::Named(original) => exported_declaration(&target.model, original)
                .map(|found| target.model.declarations[found].span),
            ImportedName::Namespace => Some(Span::new(0, 0)),
        };
        Ok(vec![span.map_or(local, |span| FileSpan {
            path: target.path,
            span,
        })])
    }

    fn references(&self, path: &Utf8Path, offset: Offset) -> ServiceResult<Vec<FileSpan>> {
        let cx = self.context_at(path, offset)?;
        let model = &cx.model;
        let Some(index) = model.word_at(offset) else {
            return Ok(Vec::new());
        };

        let tokens: Vec<usize> = if model.is_this_member(index) {
            let name = model.text_at(index);
            (0..model.tokens.len())
                .filter(|&i| model.is_this_member(i) && model.text_at(i) == name)
                .collect()
        } else {
            let Some(declaration) = model.resolve(index) else {
                return Ok(Vec::new());
            };
            let mut tokens = model.references(declaration);
            tokens.push(model.declarations[declaration].token);
            tokens.sort_unstable();
            tokens
        };

        Ok(tokens
            .into_iter()
            .map(|token| FileSpan {
                path: path.to_path_buf(),
                span: model.tokens[token].span,
            })
            .collect())
    }

    fn code_fixes(
        &self,
        path: &Utf8Path,
        span: Span,
        codes: &[u32],
    ) -> ServiceResult<Vec<CodeFixAction>> {
        let cx = self.context(path)?;
        if !codes.contains(&6133) {
            return Ok(Vec::new());
        }
        let model = &cx.model;
        Ok(checks::unused_declarations(model, true, true)
            .into_iter()
            .filter(|&index| model.declarations[index].span.intersects(span))
            .flat_map(|index| edits::unused_fixes(model, path, index))
            .collect())
    }

    fn applicable_refactors(
        &self,
        path: &Utf8Path,
        _span: Span,
    ) -> ServiceResult<Vec<RefactorInfo>> {
        let cx = self.context(path)?;
        if cx.model.imports.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![RefactorInfo {
            name: ORGANIZE_IMPORTS.to_string(),
            description: "Organize imports".to_string(),
            actions: vec![
                RefactorAction {
                    name: ORGANIZE_IMPORTS.to_string(),
                    description: "Organize imports".to_string(),
                },
                RefactorAction {
                    name: SORT_IMPORTS.to_string(),
                    description: "Sort imports".to_string(),
                },
            ],
        }])
    }

    fn edits_for_refactor(
        &self,
        path: &Utf8Path,
        _span: Span,
        refactor: &str,
        action: &str,
    ) -> ServiceResult<RefactorEdits> {
        let cx = self.context(path)?;
        if refactor != ORGANIZE_IMPORTS {
            return Err(ServiceError::UnknownRefactor(refactor.to_string()));
        }
        let remove_unused = match action {
            ORGANIZE_IMPORTS => true,
            SORT_IMPORTS => false,
            other => return Err(ServiceError::UnknownRefactor(other.to_string())),
        };
        let changes = edits::organize_imports(&cx.model, remove_unused);
        let edits = if changes.is_empty() {
            Vec::new()
        } else {
            vec![FileTextChanges {
                path: path.to_path_buf(),
                changes,
            }]
        };
        Ok(RefactorEdits { edits })
    }

    fn formatting_edits(
        &self,
        path: &Utf8Path,
        span: Span,
        options: &FormatOptions,
    ) -> ServiceResult<Vec<TextChange>> {
        let cx = self.context(path)?;
        Ok(format::formatting_edits(&cx.model, span, options))
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Disposed language service");
        }
    }
}


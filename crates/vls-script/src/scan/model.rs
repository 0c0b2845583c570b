//! Token-level structure of one script file: brackets, blocks, declarations,
//! imports, functions and the shape of the default-exported component.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use vls_source::Offset;
use vls_source::Span;

use crate::host::ScriptKind;
use crate::lexer;
use crate::lexer::Comment;
use crate::lexer::LexError;
use crate::lexer::Token;
use crate::lexer::TokenKind;
use crate::service::SymbolKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportedName {
    Default,
    Named(String),
    Namespace,
}

#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    pub(crate) name: String,
    pub(crate) kind: SymbolKind,
    pub(crate) token: usize,
    pub(crate) span: Span,
    /// Region of the file in which the name is visible.
    pub(crate) scope: Span,
    /// The declaring statement, or the parameter segment for parameters.
    pub(crate) statement: Span,
    pub(crate) exported: bool,
    pub(crate) annotation: Option<Span>,
    pub(crate) has_default: bool,
    pub(crate) import: Option<(usize, ImportedName)>,
    pub(crate) function: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ImportBinding {
    pub(crate) declaration: usize,
    /// `name` or `name as alias`, without separators.
    pub(crate) segment: Span,
    pub(crate) named: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ImportDecl {
    pub(crate) statement: Span,
    pub(crate) first_token: usize,
    pub(crate) last_token: usize,
    pub(crate) specifier: String,
    pub(crate) specifier_span: Span,
    pub(crate) bindings: Vec<ImportBinding>,
    pub(crate) type_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Declaration,
    Expression,
    Method,
    Arrow,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionInfo {
    pub(crate) name: Option<String>,
    pub(crate) name_span: Option<Span>,
    pub(crate) kind: FunctionKind,
    pub(crate) params: Vec<usize>,
    pub(crate) params_span: Span,
    pub(crate) body: Span,
    pub(crate) span: Span,
    /// Binding named by a `this: typeof binding` parameter.
    pub(crate) this_binding: Option<String>,
    /// Passed directly as a call argument, so contextually typed.
    pub(crate) in_argument: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    Prop,
    Data,
    Computed,
    Method,
    Setup,
    Inject,
}

#[derive(Debug, Clone)]
pub(crate) struct ComponentMember {
    pub(crate) name: String,
    pub(crate) kind: MemberKind,
    pub(crate) span: Span,
    pub(crate) function: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ComponentShape {
    pub(crate) name: Option<String>,
    pub(crate) object: Span,
    pub(crate) members: Vec<ComponentMember>,
    /// Members may come from mixins, `extends` or spreads we cannot see.
    pub(crate) open: bool,
}

impl ComponentShape {
    pub(crate) fn member(&self, name: &str) -> Option<&ComponentMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum EntryValue {
    Method { body_open: usize },
    Value(usize),
    Shorthand,
    Spread,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectEntry {
    pub(crate) key: Option<String>,
    pub(crate) key_token: usize,
    pub(crate) value: EntryValue,
}

const MODIFIERS: &[&str] = &[
    "async",
    "get",
    "set",
    "static",
    "public",
    "private",
    "protected",
    "readonly",
    "override",
    "abstract",
    "declare",
];

#[derive(Default)]
struct Collected {
    declarations: Vec<Declaration>,
    imports: Vec<ImportDecl>,
    functions: Vec<FunctionInfo>,
    property_keys: FxHashSet<usize>,
}

#[derive(Debug)]
pub struct SourceModel {
    pub(crate) text: Arc<str>,
    pub(crate) kind: ScriptKind,
    pub(crate) tokens: Vec<Token>,
    pub(crate) comments: Vec<Comment>,
    pub(crate) lex_errors: Vec<LexError>,
    pub(crate) partner: Vec<Option<usize>>,
    pub(crate) unmatched_closers: Vec<usize>,
    pub(crate) unclosed_openers: Vec<usize>,
    pub(crate) blocks: Vec<Span>,
    pub(crate) declarations: Vec<Declaration>,
    pub(crate) imports: Vec<ImportDecl>,
    pub(crate) functions: Vec<FunctionInfo>,
    pub(crate) property_keys: FxHashSet<usize>,
    pub(crate) component: Option<ComponentShape>,
    pub(crate) default_export: Option<Span>,
    pub(crate) is_module: bool,
}

impl SourceModel {
    #[must_use]
    pub fn build(text: Arc<str>, kind: ScriptKind) -> Self {
        let lexed = lexer::tokenize(&text);
        let mut model = Self {
            text,
            kind,
            tokens: lexed.tokens,
            comments: lexed.comments,
            lex_errors: lexed.errors,
            partner: Vec::new(),
            unmatched_closers: Vec::new(),
            unclosed_openers: Vec::new(),
            blocks: Vec::new(),
            declarations: Vec::new(),
            imports: Vec::new(),
            functions: Vec::new(),
            property_keys: FxHashSet::default(),
            component: None,
            default_export: None,
            is_module: false,
        };

        model.match_brackets();

        let mut collected = Collected::default();
        model.collect_imports(&mut collected);
        model.collect_declarations(&mut collected);
        model.declarations = collected.declarations;
        model.imports = collected.imports;
        model.functions = collected.functions;
        model.property_keys = collected.property_keys;
        model.mark_export_clauses();
        model.is_module = !model.imports.is_empty()
            || model
                .tokens
                .iter()
                .any(|token| token.is_keyword(&model.text, "export"));
        model.collect_component();
        model
    }

    fn match_brackets(&mut self) {
        let mut partner = vec![None; self.tokens.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (index, token) in self.tokens.iter().enumerate() {
            if token.kind != TokenKind::Punct {
                continue;
            }
            let closer_for = match token.text(&self.text) {
                "(" | "[" | "{" => {
                    stack.push(index);
                    continue;
                }
                ")" => "(",
                "]" => "[",
                "}" => "{",
                _ => continue,
            };
            let matching = stack
                .iter()
                .rposition(|&open| self.tokens[open].text(&self.text) == closer_for);
            match matching {
                Some(position) => {
                    // openers above the match are never closed
                    self.unclosed_openers.extend(stack.drain(position + 1..));
                    if let Some(open) = stack.pop() {
                        partner[open] = Some(index);
                        partner[index] = Some(open);
                    }
                }
                None => self.unmatched_closers.push(index),
            }
        }
        self.unclosed_openers.extend(stack);
        self.unclosed_openers.sort_unstable();

        let text_end = self.text.len();
        self.blocks = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.is_punct(&self.text, "{"))
            .map(|(index, token)| {
                let end = partner[index].map_or(text_end, |close| self.tokens[close].span.end_usize());
                Span::from_bounds(token.span.start_usize(), end)
            })
            .collect();
        self.partner = partner;
    }

    // ---- token helpers -------------------------------------------------

    pub(crate) fn text_at(&self, index: usize) -> &str {
        self.tokens
            .get(index)
            .map_or("", |token| token.text(&self.text))
    }

    pub(crate) fn is_punct(&self, index: usize, punct: &str) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|token| token.is_punct(&self.text, punct))
    }

    pub(crate) fn is_keyword(&self, index: usize, keyword: &str) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|token| token.is_keyword(&self.text, keyword))
    }

    pub(crate) fn is_ident(&self, index: usize) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|token| token.kind == TokenKind::Ident)
    }

    fn is_opener(&self, index: usize) -> bool {
        matches!(self.text_at(index), "(" | "[" | "{")
            && self.tokens[index].kind == TokenKind::Punct
    }

    fn is_closer(&self, index: usize) -> bool {
        matches!(self.text_at(index), ")" | "]" | "}")
            && self.tokens[index].kind == TokenKind::Punct
    }

    pub(crate) fn file_span(&self) -> Span {
        Span::from_bounds(0, self.text.len())
    }

    pub(crate) fn block_span(&self, open: usize) -> Span {
        let start = self.tokens[open].span.start_usize();
        let end = self.partner[open].map_or(self.text.len(), |close| {
            self.tokens[close].span.end_usize()
        });
        Span::from_bounds(start, end)
    }

    /// Smallest brace block strictly enclosing `offset`, or the whole file.
    pub(crate) fn innermost_block(&self, offset: u32) -> Span {
        self.blocks
            .iter()
            .filter(|block| block.start() < offset && offset < block.end())
            .min_by_key(|block| block.length())
            .copied()
            .unwrap_or_else(|| self.file_span())
    }

    pub(crate) fn newline_between(&self, left: usize, right: usize) -> bool {
        let (Some(left), Some(right)) = (self.tokens.get(left), self.tokens.get(right)) else {
            return false;
        };
        self.text
            .get(left.span.end_usize()..right.span.start_usize())
            .is_some_and(|gap| gap.contains('\n'))
    }

    fn adjacent(&self, left: usize, right: usize) -> bool {
        self.tokens[left].span.end() == self.tokens[right].span.start()
    }

    /// Index of the `,` ending the list element starting at `start`, or
    /// `limit` when the element runs to it. Nested brackets and adjacent
    /// generic argument lists are skipped.
    pub(crate) fn segment_end(&self, start: usize, limit: usize) -> usize {
        let mut index = start;
        let mut angle = 0usize;
        while index < limit {
            if self.is_opener(index) {
                match self.partner[index] {
                    Some(close) if close < limit => index = close,
                    _ => return limit,
                }
            } else if self.is_punct(index, "<") && index > start && self.adjacent(index - 1, index)
            {
                angle += 1;
            } else if angle > 0 && matches!(self.text_at(index), ">" | ">>" | ">>>") {
                angle = angle.saturating_sub(self.text_at(index).len());
            } else if angle == 0 && (self.is_punct(index, ",") || self.is_closer(index)) {
                return index;
            }
            index += 1;
        }
        limit
    }

    /// Index of the last token of the statement starting at `start`.
    pub(crate) fn statement_end(&self, start: usize, stop_at_comma: bool) -> usize {
        let last = self.tokens.len().saturating_sub(1);
        let mut index = start;
        loop {
            if self.is_opener(index) {
                match self.partner[index] {
                    Some(close) => index = close,
                    None => return last,
                }
            } else if self.tokens[index].kind == TokenKind::Punct {
                match self.text_at(index) {
                    ";" => return index,
                    ")" | "]" | "}" => return index.saturating_sub(1).max(start),
                    "," if stop_at_comma && index > start => return index - 1,
                    _ => {}
                }
            }
            if index >= last {
                return last;
            }
            if self.newline_between(index, index + 1)
                && self.ends_statement(index)
                && !self.continues_statement(index + 1)
            {
                return index;
            }
            index += 1;
        }
    }

    fn ends_statement(&self, index: usize) -> bool {
        let token = self.tokens[index];
        match token.kind {
            TokenKind::Ident
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::Template
            | TokenKind::Regex => true,
            TokenKind::Keyword => matches!(
                token.text(&self.text),
                "this" | "true" | "false" | "null" | "super" | "return" | "break" | "continue"
            ),
            TokenKind::Punct => matches!(token.text(&self.text), ")" | "]" | "}" | "++" | "--"),
        }
    }

    fn continues_statement(&self, index: usize) -> bool {
        let token = self.tokens[index];
        let text = token.text(&self.text);
        match token.kind {
            TokenKind::Punct => !matches!(
                text,
                "(" | "[" | "{" | "!" | "~" | "++" | "--" | "..." | ";" | ")" | "]" | "}"
            ),
            TokenKind::Keyword => matches!(text, "in" | "instanceof"),
            TokenKind::Ident => matches!(text, "as" | "satisfies"),
            _ => false,
        }
    }

    /// Whether the token at `index` starts an expression rather than a
    /// statement.
    fn is_expression_position(&self, index: usize) -> bool {
        let Some(previous) = index.checked_sub(1) else {
            return false;
        };
        let text = self.text_at(previous);
        match self.tokens[previous].kind {
            TokenKind::Punct => !matches!(text, ";" | "{" | "}" | ")"),
            TokenKind::Keyword => matches!(
                text,
                "return" | "typeof" | "new" | "void" | "delete" | "throw" | "yield" | "await" | "in"
            ),
            _ => false,
        }
    }

    /// Whether the token at `index` sits directly inside the parentheses of
    /// a call.
    fn in_call_argument(&self, index: usize) -> bool {
        let Some(previous) = index.checked_sub(1) else {
            return false;
        };
        if !(self.is_punct(previous, "(") || self.is_punct(previous, ",")) {
            return false;
        }
        let mut cursor = previous;
        loop {
            if self.is_punct(cursor, "(") {
                return cursor
                    .checked_sub(1)
                    .is_some_and(|callee| self.is_ident(callee) || self.is_punct(callee, ")"));
            }
            if self.is_closer(cursor) {
                match self.partner[cursor] {
                    Some(open) => cursor = open,
                    None => return false,
                }
            } else if self.is_opener(cursor) {
                return false;
            }
            match cursor.checked_sub(1) {
                Some(next) => cursor = next,
                None => return false,
            }
        }
    }

    /// Whether any enclosing bracket of the token at `index` is a `(`.
    fn enclosed_by_parens(&self, index: usize) -> bool {
        let mut cursor = index;
        while let Some(previous) = cursor.checked_sub(1) {
            cursor = previous;
            if self.is_closer(cursor) {
                match self.partner[cursor] {
                    Some(open) => cursor = open,
                    None => return false,
                }
            } else if self.is_punct(cursor, "(") {
                return true;
            }
        }
        false
    }

    /// Skip a return type annotation after a parameter list and return the
    /// index of the body's `{`.
    fn body_after(&self, close: usize) -> Option<usize> {
        let mut index = close + 1;
        if self.is_punct(index, "{") {
            return Some(index);
        }
        if !self.is_punct(index, ":") {
            return None;
        }
        while index < self.tokens.len() {
            match self.text_at(index) {
                "{" if self.tokens[index].kind == TokenKind::Punct => {
                    // `(): { a: number } {` has an object type before the body
                    let close = self.partner[index]?;
                    if self.is_punct(close + 1, "{") {
                        return Some(close + 1);
                    }
                    return Some(index);
                }
                ";" | "=>" | "," | "=" => return None,
                "(" | "[" => index = self.partner[index]?,
                _ => {}
            }
            index += 1;
        }
        None
    }

    fn skip_generics(&self, mut index: usize) -> usize {
        if !self.is_punct(index, "<") {
            return index;
        }
        let mut depth = 0usize;
        while index < self.tokens.len() {
            match self.text_at(index) {
                "<" => depth += 1,
                ">" => depth = depth.saturating_sub(1),
                ">>" => depth = depth.saturating_sub(2),
                _ => {}
            }
            index += 1;
            if depth == 0 {
                break;
            }
        }
        index
    }

    fn annotation_span(&self, start: usize, limit: usize) -> Option<Span> {
        if start > limit || start >= self.tokens.len() {
            return None;
        }
        let mut end = start;
        let mut index = start;
        let mut angle = 0usize;
        while index <= limit && index < self.tokens.len() {
            if self.is_opener(index) {
                index = self.partner[index].unwrap_or(limit).min(limit);
            } else if self.is_punct(index, "<") {
                angle += 1;
            } else if angle > 0 && matches!(self.text_at(index), ">" | ">>" | ">>>") {
                angle = angle.saturating_sub(self.text_at(index).len());
            } else if angle == 0 && matches!(self.text_at(index), "=" | "," | ";") {
                break;
            }
            end = index;
            index += 1;
        }
        Some(Span::from_bounds(
            self.tokens[start].span.start_usize(),
            self.tokens[end].span.end_usize(),
        ))
    }

    /// Identifiers bound by a destructuring pattern opened at `open`.
    fn pattern_names(&self, open: usize) -> Vec<usize> {
        let close = self.partner[open].unwrap_or(self.tokens.len());
        (open + 1..close)
            .filter(|&index| {
                self.is_ident(index)
                    && matches!(self.text_at(index - 1), "{" | "[" | "," | ":" | "...")
                    && matches!(self.text_at(index + 1), "," | "}" | "]" | "=")
            })
            .collect()
    }

    // ---- collection ----------------------------------------------------

    fn collect_imports(&self, out: &mut Collected) {
        for index in 0..self.tokens.len() {
            if self.is_keyword(index, "import")
                && !self.is_punct(index + 1, "(")
                && !self.is_punct(index + 1, ".")
            {
                self.import_statement(index, out);
            }
        }
    }

    fn import_statement(&self, start: usize, out: &mut Collected) {
        let mut index = start + 1;
        let mut type_only = false;
        if self.text_at(index) == "type"
            && !matches!(self.text_at(index + 1), "from" | ",")
            && self.tokens.get(index + 1).is_some()
        {
            type_only = true;
            index += 1;
        }

        let mut bindings: Vec<(usize, ImportedName, Span, bool)> = Vec::new();
        if self.tokens.get(index).map(|t| t.kind) != Some(TokenKind::String) {
            if self.is_ident(index) {
                let span = self.tokens[index].span;
                bindings.push((index, ImportedName::Default, span, false));
                index += 1;
                if self.is_punct(index, ",") {
                    index += 1;
                }
            }
            if self.is_punct(index, "*") && self.text_at(index + 1) == "as" && self.is_ident(index + 2)
            {
                let span = Span::from_bounds(
                    self.tokens[index].span.start_usize(),
                    self.tokens[index + 2].span.end_usize(),
                );
                bindings.push((index + 2, ImportedName::Namespace, span, false));
                index += 3;
            } else if self.is_punct(index, "{") {
                let Some(close) = self.partner[index] else {
                    return;
                };
                let mut cursor = index + 1;
                while cursor < close {
                    let end = self.segment_end(cursor, close);
                    let mut name = cursor;
                    if self.text_at(name) == "type" && name + 1 < end {
                        name += 1;
                    }
                    if name < end && self.tokens[name].is_word() {
                        let imported = self.text_at(name).to_string();
                        let local = if self.text_at(name + 1) == "as" && name + 2 < end {
                            name + 2
                        } else {
                            name
                        };
                        let segment = Span::from_bounds(
                            self.tokens[cursor].span.start_usize(),
                            self.tokens[end - 1].span.end_usize(),
                        );
                        bindings.push((local, ImportedName::Named(imported), segment, true));
                    }
                    cursor = end + 1;
                }
                index = close + 1;
            }
            if self.text_at(index) != "from" {
                return;
            }
            index += 1;
        }

        let Some(specifier_token) = self.tokens.get(index) else {
            return;
        };
        if specifier_token.kind != TokenKind::String {
            return;
        }
        let raw = specifier_token.text(&self.text);
        let specifier = raw.trim_matches(|c| c == '"' || c == '\'').to_string();
        let last_token = if self.is_punct(index + 1, ";") {
            index + 1
        } else {
            index
        };
        let statement = Span::from_bounds(
            self.tokens[start].span.start_usize(),
            self.tokens[last_token].span.end_usize(),
        );

        let import_index = out.imports.len();
        let mut import_bindings = Vec::new();
        for (token, imported, segment, named) in bindings {
            let declaration = out.declarations.len();
            out.declarations.push(Declaration {
                name: self.text_at(token).to_string(),
                kind: SymbolKind::Alias,
                token,
                span: self.tokens[token].span,
                scope: self.file_span(),
                statement,
                exported: false,
                annotation: None,
                has_default: false,
                import: Some((import_index, imported)),
                function: None,
            });
            import_bindings.push(ImportBinding {
                declaration,
                segment,
                named,
            });
        }
        out.imports.push(ImportDecl {
            statement,
            first_token: start,
            last_token,
            specifier,
            specifier_span: specifier_token.span,
            bindings: import_bindings,
            type_only,
        });
    }

    fn collect_declarations(&self, out: &mut Collected) {
        for index in 0..self.tokens.len() {
            let token = self.tokens[index];
            let text = token.text(&self.text);
            match token.kind {
                TokenKind::Keyword => match text {
                    "const" | "let" | "var" => self.variable_statement(index, out),
                    "function" => self.function(index, out),
                    "class" => self.named_declaration(index, SymbolKind::Class, out),
                    "enum" => self.named_declaration(index, SymbolKind::Enum, out),
                    "interface" => self.named_declaration(index, SymbolKind::Interface, out),
                    "catch" => self.catch_clause(index, out),
                    _ => {}
                },
                TokenKind::Ident if text == "type" => {
                    if self.is_ident(index + 1)
                        && (self.is_punct(index + 2, "=") || self.is_punct(index + 2, "<"))
                    {
                        self.named_declaration(index, SymbolKind::Type, out);
                    }
                }
                TokenKind::Punct if text == "=>" => self.arrow(index, out),
                TokenKind::Punct if text == ":" => {
                    if index > 0
                        && self.tokens[index - 1].kind != TokenKind::Punct
                        && matches!(self.text_at(index.wrapping_sub(2)), "{" | ",")
                    {
                        out.property_keys.insert(index - 1);
                    }
                }
                TokenKind::Ident | TokenKind::String => self.method(index, out),
                _ => {}
            }
        }
    }

    fn export_start(&self, index: usize) -> (bool, u32) {
        let mut start = index;
        if index > 0 && self.text_at(index - 1) == "declare" {
            start = index - 1;
        }
        if start > 0 && self.is_keyword(start - 1, "default") {
            start -= 1;
        }
        if start > 0 && self.is_keyword(start - 1, "export") {
            return (true, self.tokens[start - 1].span.start());
        }
        (false, self.tokens[index].span.start())
    }

    fn variable_statement(&self, index: usize, out: &mut Collected) {
        let kind = match self.text_at(index) {
            "const" => SymbolKind::Const,
            "let" => SymbolKind::Let,
            _ => SymbolKind::Variable,
        };
        if self.is_keyword(index + 1, "enum") || index + 1 >= self.tokens.len() {
            return;
        }
        let (exported, statement_start) = self.export_start(index);

        let for_head = index
            .checked_sub(1)
            .filter(|&open| self.is_punct(open, "("))
            .filter(|&open| {
                self.is_keyword(open.wrapping_sub(1), "for")
                    || (self.is_keyword(open.wrapping_sub(1), "await")
                        && self.is_keyword(open.wrapping_sub(2), "for"))
            });

        let (end, scope) = match for_head {
            Some(open) => {
                let close = self.partner[open].unwrap_or(self.tokens.len());
                let scope = if self.is_punct(close + 1, "{") {
                    self.block_span(close + 1)
                } else {
                    self.innermost_block(self.tokens[index].span.start())
                };
                (close.saturating_sub(1), scope)
            }
            None => (
                self.statement_end(index, false),
                self.innermost_block(self.tokens[index].span.start()),
            ),
        };
        let statement = Span::from_bounds(statement_start as usize, self.tokens[end].span.end_usize());

        let mut cursor = index + 1;
        while cursor <= end {
            let (names, after) = if self.is_ident(cursor) {
                (vec![cursor], cursor + 1)
            } else if self.is_punct(cursor, "{") || self.is_punct(cursor, "[") {
                let after = self.partner[cursor].map_or(end + 1, |close| close + 1);
                (self.pattern_names(cursor), after)
            } else {
                break;
            };

            let after = if self.is_punct(after, "!") { after + 1 } else { after };
            let annotation = if self.is_punct(after, ":") {
                self.annotation_span(after + 1, end)
            } else {
                None
            };
            for token in names {
                out.declarations.push(Declaration {
                    name: self.text_at(token).to_string(),
                    kind,
                    token,
                    span: self.tokens[token].span,
                    scope,
                    statement,
                    exported,
                    annotation,
                    has_default: false,
                    import: None,
                    function: None,
                });
            }

            let limit = end + 1;
            let mut next = self.segment_end(after, limit);
            if for_head.is_some() {
                if let Some(keyword) = (after..next).find(|&i| matches!(self.text_at(i), "of" | "in"))
                {
                    next = keyword.max(limit);
                }
            }
            cursor = next + 1;
        }
    }

    fn named_declaration(&self, index: usize, kind: SymbolKind, out: &mut Collected) {
        let name = index + 1;
        if !self.is_ident(name) {
            return;
        }
        if kind == SymbolKind::Class && self.is_expression_position(index) {
            return;
        }
        let (exported, statement_start) = self.export_start(index);
        let end = match kind {
            SymbolKind::Type => self.statement_end(name, false),
            _ => (name..self.tokens.len())
                .find(|&i| self.is_punct(i, "{"))
                .map_or(name, |open| self.partner[open].unwrap_or(self.tokens.len() - 1)),
        };
        out.declarations.push(Declaration {
            name: self.text_at(name).to_string(),
            kind,
            token: name,
            span: self.tokens[name].span,
            scope: self.innermost_block(self.tokens[index].span.start()),
            statement: Span::from_bounds(statement_start as usize, self.tokens[end].span.end_usize()),
            exported,
            annotation: None,
            has_default: false,
            import: None,
            function: None,
        });
    }

    fn catch_clause(&self, index: usize, out: &mut Collected) {
        if !self.is_punct(index + 1, "(") || !self.is_ident(index + 2) {
            return;
        }
        let Some(close) = self.partner[index + 1] else {
            return;
        };
        if !self.is_punct(close + 1, "{") {
            return;
        }
        let token = index + 2;
        out.declarations.push(Declaration {
            name: self.text_at(token).to_string(),
            kind: SymbolKind::Let,
            token,
            span: self.tokens[token].span,
            scope: self.block_span(close + 1),
            statement: self.tokens[token].span,
            exported: false,
            annotation: None,
            has_default: false,
            import: None,
            function: None,
        });
    }

    fn function(&self, index: usize, out: &mut Collected) {
        let mut cursor = index + 1;
        if self.is_punct(cursor, "*") {
            cursor += 1;
        }
        let name = if self.is_ident(cursor) {
            cursor += 1;
            Some(cursor - 1)
        } else {
            None
        };
        cursor = self.skip_generics(cursor);
        if !self.is_punct(cursor, "(") {
            return;
        }
        let open = cursor;
        let Some(close) = self.partner[open] else {
            return;
        };
        let Some(body_open) = self.body_after(close) else {
            return;
        };
        let body = self.block_span(body_open);

        let start = if index > 0 && self.text_at(index - 1) == "async" {
            index - 1
        } else {
            index
        };
        let expression = self.is_expression_position(start);
        let function_index = out.functions.len();

        if let (Some(name), false) = (name, expression) {
            let (exported, statement_start) = self.export_start(start);
            out.declarations.push(Declaration {
                name: self.text_at(name).to_string(),
                kind: SymbolKind::Function,
                token: name,
                span: self.tokens[name].span,
                scope: self.innermost_block(self.tokens[start].span.start()),
                statement: Span::from_bounds(statement_start as usize, body.end_usize()),
                exported,
                annotation: None,
                has_default: false,
                import: None,
                function: Some(function_index),
            });
        }

        let (params, this_binding) = self.parameters(open, close, body, function_index, out);
        out.functions.push(FunctionInfo {
            name: name.map(|name| self.text_at(name).to_string()),
            name_span: name.map(|name| self.tokens[name].span),
            kind: if expression {
                FunctionKind::Expression
            } else {
                FunctionKind::Declaration
            },
            params,
            params_span: self.block_span(open),
            body,
            span: Span::from_bounds(self.tokens[start].span.start_usize(), body.end_usize()),
            this_binding,
            in_argument: self.in_call_argument(start),
        });
    }

    fn method(&self, index: usize, out: &mut Collected) {
        let open = self.skip_generics(index + 1);
        if !self.is_punct(open, "(") {
            return;
        }
        let previous_ok = match index.checked_sub(1) {
            None => true,
            Some(previous) => {
                matches!(self.text_at(previous), "{" | "," | ";" | "}" | "*")
                    || MODIFIERS.contains(&self.text_at(previous))
            }
        };
        if !previous_ok {
            return;
        }
        let Some(close) = self.partner[open] else {
            return;
        };
        let Some(body_open) = self.body_after(close) else {
            return;
        };
        let body = self.block_span(body_open);
        let name = self
            .text_at(index)
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();

        out.property_keys.insert(index);
        let function_index = out.functions.len();
        let (params, this_binding) = self.parameters(open, close, body, function_index, out);
        out.functions.push(FunctionInfo {
            name: Some(name),
            name_span: Some(self.tokens[index].span),
            kind: FunctionKind::Method,
            params,
            params_span: self.block_span(open),
            body,
            span: Span::from_bounds(self.tokens[index].span.start_usize(), body.end_usize()),
            this_binding,
            in_argument: self.enclosed_by_parens(index),
        });
    }

    fn arrow(&self, index: usize, out: &mut Collected) {
        let Some(mut previous) = index.checked_sub(1) else {
            return;
        };
        // `(a): T => ...`
        if previous >= 2 && self.is_punct(previous - 1, ":") && self.is_punct(previous - 2, ")") {
            previous -= 2;
        }

        let body = if self.is_punct(index + 1, "{") {
            self.block_span(index + 1)
        } else if index + 1 < self.tokens.len() {
            let end = self.statement_end(index + 1, true);
            Span::from_bounds(
                self.tokens[index + 1].span.start_usize(),
                self.tokens[end].span.end_usize(),
            )
        } else {
            Span::new(self.tokens[index].span.end(), 0)
        };

        let function_index = out.functions.len();
        let (start, params, params_span) = if self.is_ident(previous) {
            let declaration = out.declarations.len();
            let token = previous;
            out.declarations.push(Declaration {
                name: self.text_at(token).to_string(),
                kind: SymbolKind::Parameter,
                token,
                span: self.tokens[token].span,
                scope: body,
                statement: self.tokens[token].span,
                exported: false,
                annotation: None,
                has_default: false,
                import: None,
                function: Some(function_index),
            });
            (token, vec![declaration], self.tokens[token].span)
        } else if self.is_punct(previous, ")") {
            let Some(open) = self.partner[previous] else {
                return;
            };
            let (params, _) = self.parameters(open, previous, body, function_index, out);
            (open, params, self.block_span(open))
        } else {
            return;
        };

        let start = if start > 0 && self.text_at(start - 1) == "async" {
            start - 1
        } else {
            start
        };
        out.functions.push(FunctionInfo {
            name: None,
            name_span: None,
            kind: FunctionKind::Arrow,
            params,
            params_span,
            body,
            span: Span::from_bounds(self.tokens[start].span.start_usize(), body.end_usize()),
            this_binding: None,
            in_argument: self.in_call_argument(start),
        });
    }

    fn parameters(
        &self,
        open: usize,
        close: usize,
        scope: Span,
        function: usize,
        out: &mut Collected,
    ) -> (Vec<usize>, Option<String>) {
        let mut params = Vec::new();
        let mut this_binding = None;
        let mut cursor = open + 1;

        while cursor < close {
            let end = self.segment_end(cursor, close);
            let mut start = cursor;
            while start < end
                && (self.is_punct(start, "...")
                    || (MODIFIERS.contains(&self.text_at(start)) && self.tokens[start + 1].is_word()))
            {
                start += 1;
            }

            if start < end && self.is_keyword(start, "this") {
                if self.is_punct(start + 1, ":")
                    && self.is_keyword(start + 2, "typeof")
                    && self.is_ident(start + 3)
                {
                    this_binding = Some(self.text_at(start + 3).to_string());
                }
            } else if start < end {
                let (names, after) = if self.is_ident(start) {
                    (vec![start], start + 1)
                } else if self.is_punct(start, "{") || self.is_punct(start, "[") {
                    let after = self.partner[start].map_or(end, |close| close + 1);
                    (self.pattern_names(start), after)
                } else {
                    (Vec::new(), end)
                };
                let after = if self.is_punct(after, "?") { after + 1 } else { after };
                let annotation = if self.is_punct(after, ":") && after + 1 < end {
                    self.annotation_span(after + 1, end - 1)
                } else {
                    None
                };
                let has_default = (after..end).any(|i| self.is_punct(i, "="));
                let statement = Span::from_bounds(
                    self.tokens[cursor].span.start_usize(),
                    self.tokens[end - 1].span.end_usize(),
                );
                for token in names {
                    params.push(out.declarations.len());
                    out.declarations.push(Declaration {
                        name: self.text_at(token).to_string(),
                        kind: SymbolKind::Parameter,
                        token,
                        span: self.tokens[token].span,
                        scope,
                        statement,
                        exported: false,
                        annotation,
                        has_default,
                        import: None,
                        function: Some(function),
                    });
                }
            }
            cursor = end + 1;
        }
        (params, this_binding)
    }

    /// `export { a, b as c }` marks local declarations as exported.
    fn mark_export_clauses(&mut self) {
        let mut exported = Vec::new();
        for index in 0..self.tokens.len() {
            if !(self.is_keyword(index, "export") && self.is_punct(index + 1, "{")) {
                continue;
            }
            let Some(close) = self.partner[index + 1] else {
                continue;
            };
            if self.text_at(close + 1) == "from" {
                continue;
            }
            exported.extend(
                (index + 2..close)
                    .filter(|&i| self.is_ident(i) && matches!(self.text_at(i - 1), "{" | ","))
                    .map(|i| self.text_at(i).to_string()),
            );
        }
        let file = self.file_span();
        for declaration in &mut self.declarations {
            if declaration.scope == file && exported.contains(&declaration.name) {
                declaration.exported = true;
            }
        }
    }

    // ---- component -----------------------------------------------------

    fn collect_component(&mut self) {
        let Some(default) = (0..self.tokens.len())
            .find(|&i| self.is_keyword(i, "export") && self.is_keyword(i + 1, "default"))
            .map(|i| i + 1)
        else {
            return;
        };
        self.default_export = Some(self.tokens[default].span);
        let Some(object) = self.component_object(default + 1) else {
            return;
        };
        self.component = Some(self.component_shape(object));
    }

    fn component_object(&self, start: usize) -> Option<usize> {
        if self.is_punct(start, "{") {
            return Some(start);
        }
        let mut cursor = start;
        while self.is_ident(cursor) || self.is_punct(cursor, ".") {
            cursor += 1;
        }
        if cursor == start {
            return None;
        }
        if self.is_punct(cursor, "(") {
            // `defineComponent({...})`, `Vue.component('name', {...})`
            let close = self.partner[cursor]?;
            let mut argument = cursor + 1;
            while argument < close {
                if self.is_punct(argument, "{") {
                    return Some(argument);
                }
                argument = self.segment_end(argument, close) + 1;
            }
            return None;
        }
        if cursor == start + 1 {
            // `export default Component` naming a local object
            let name = self.text_at(start);
            let declaration = self
                .declarations
                .iter()
                .find(|d| d.name == name && d.scope == self.file_span() && d.import.is_none())?;
            let assign = declaration.token + 1;
            let value = (assign..self.tokens.len()).find(|&i| self.is_punct(i, "="))? + 1;
            return self.component_object(value);
        }
        None
    }

    pub(crate) fn object_entries(&self, open: usize) -> Vec<ObjectEntry> {
        let close = self.partner[open].unwrap_or(self.tokens.len());
        let mut entries = Vec::new();
        let mut cursor = open + 1;

        while cursor < close {
            let end = self.segment_end(cursor, close);
            if self.is_punct(cursor, "...") {
                entries.push(ObjectEntry {
                    key: None,
                    key_token: cursor,
                    value: EntryValue::Spread,
                });
                cursor = end + 1;
                continue;
            }

            let mut key = cursor;
            while key + 1 < end
                && (MODIFIERS.contains(&self.text_at(key)) || self.is_punct(key, "*"))
                && !matches!(self.text_at(key + 1), "(" | ":" | "," | "<")
            {
                key += 1;
            }
            let (key_text, next) = match self.tokens.get(key).map(|t| t.kind) {
                Some(TokenKind::Ident | TokenKind::Keyword | TokenKind::Number) => {
                    (Some(self.text_at(key).to_string()), key + 1)
                }
                Some(TokenKind::String) => (
                    Some(
                        self.text_at(key)
                            .trim_matches(|c| c == '"' || c == '\'')
                            .to_string(),
                    ),
                    key + 1,
                ),
                Some(TokenKind::Punct) if self.is_punct(key, "[") => {
                    (None, self.partner[key].map_or(end, |c| c + 1))
                }
                _ => {
                    cursor = end + 1;
                    continue;
                }
            };

            let params_open = self.skip_generics(next);
            let value = if self.is_punct(params_open, "(") {
                match self.partner[params_open].and_then(|c| self.body_after(c)) {
                    Some(body_open) => EntryValue::Method { body_open },
                    None => EntryValue::Shorthand,
                }
            } else if self.is_punct(next, ":") {
                EntryValue::Value(next + 1)
            } else {
                EntryValue::Shorthand
            };

            entries.push(ObjectEntry {
                key: key_text,
                key_token: key,
                value,
            });
            cursor = end + 1;
        }
        entries
    }

    /// The object literal a `data`/`setup` style option returns.
    fn returned_object(&self, body_open: usize) -> Option<usize> {
        let close = self.partner[body_open].unwrap_or(self.tokens.len());
        let mut cursor = body_open + 1;
        while cursor < close {
            if self.is_keyword(cursor, "return") {
                if self.is_punct(cursor + 1, "{") {
                    return Some(cursor + 1);
                }
                if self.is_punct(cursor + 1, "(") && self.is_punct(cursor + 2, "{") {
                    return Some(cursor + 2);
                }
            }
            if self.is_opener(cursor) {
                cursor = self.partner[cursor]?;
            }
            cursor += 1;
        }
        None
    }

    fn value_object(&self, value: usize) -> Option<usize> {
        if self.is_punct(value, "{") {
            return Some(value);
        }
        let start = if self.text_at(value) == "async" {
            value + 1
        } else {
            value
        };
        if self.is_keyword(start, "function") {
            let open = (start..self.tokens.len()).find(|&i| self.is_punct(i, "("))?;
            let body = self.body_after(self.partner[open]?)?;
            return self.returned_object(body);
        }
        let limit = self.segment_end(start, self.tokens.len());
        let arrow = (start..limit).find(|&i| self.is_punct(i, "=>"))?;
        if self.is_punct(arrow + 1, "(") && self.is_punct(arrow + 2, "{") {
            return Some(arrow + 2);
        }
        if self.is_punct(arrow + 1, "{") {
            return self.returned_object(arrow + 1);
        }
        None
    }

    fn function_at(&self, token: usize) -> Option<usize> {
        let start = self.tokens.get(token)?.span.start();
        self.functions.iter().position(|function| {
            function.span.start() == start || function.name_span.is_some_and(|s| s.start() == start)
        })
    }

    fn component_shape(&self, object: usize) -> ComponentShape {
        let mut shape = ComponentShape {
            name: None,
            object: self.block_span(object),
            members: Vec::new(),
            open: false,
        };

        for entry in self.object_entries(object) {
            let Some(key) = entry.key.as_deref() else {
                continue;
            };
            match (key, &entry.value) {
                ("name", EntryValue::Value(value)) => {
                    if self.tokens.get(*value).map(|t| t.kind) == Some(TokenKind::String) {
                        shape.name = Some(
                            self.text_at(*value)
                                .trim_matches(|c| c == '"' || c == '\'')
                                .to_string(),
                        );
                    }
                }
                ("mixins" | "extends", _) => shape.open = true,
                ("props" | "inject", EntryValue::Value(value)) => {
                    let kind = if key == "props" {
                        MemberKind::Prop
                    } else {
                        MemberKind::Inject
                    };
                    if self.is_punct(*value, "[") {
                        let close = self.partner[*value].unwrap_or(self.tokens.len());
                        for index in *value + 1..close {
                            if self.tokens[index].kind == TokenKind::String {
                                shape.members.push(ComponentMember {
                                    name: self
                                        .text_at(index)
                                        .trim_matches(|c| c == '"' || c == '\'')
                                        .to_string(),
                                    kind,
                                    span: self.tokens[index].span,
                                    function: None,
                                });
                            }
                        }
                    } else if self.is_punct(*value, "{") {
                        self.push_members(*value, kind, &mut shape);
                    } else {
                        shape.open = true;
                    }
                }
                ("computed" | "methods", EntryValue::Value(value)) => {
                    let kind = if key == "computed" {
                        MemberKind::Computed
                    } else {
                        MemberKind::Method
                    };
                    if self.is_punct(*value, "{") {
                        self.push_members(*value, kind, &mut shape);
                    } else {
                        shape.open = true;
                    }
                }
                ("data" | "setup", value) => {
                    let kind = if key == "data" {
                        MemberKind::Data
                    } else {
                        MemberKind::Setup
                    };
                    let object = match value {
                        EntryValue::Method { body_open } => self.returned_object(*body_open),
                        EntryValue::Value(value) => self.value_object(*value),
                        _ => None,
                    };
                    match object {
                        Some(object) => self.push_members(object, kind, &mut shape),
                        None => shape.open = true,
                    }
                }
                _ => {}
            }
        }
        shape
    }

    fn push_members(&self, object: usize, kind: MemberKind, shape: &mut ComponentShape) {
        for entry in self.object_entries(object) {
            match (entry.key, &entry.value) {
                (_, EntryValue::Spread) | (None, _) => shape.open = true,
                (Some(name), value) => {
                    let function = match value {
                        EntryValue::Method { .. } => self.function_at(entry.key_token),
                        EntryValue::Value(value) => self.function_at(*value),
                        _ => None,
                    };
                    shape.members.push(ComponentMember {
                        name,
                        kind,
                        span: self.tokens[entry.key_token].span,
                        function,
                    });
                }
            }
        }
    }

    // ---- queries -------------------------------------------------------

    /// The token touching `offset`, preferring identifiers when the offset
    /// sits between two tokens.
    pub(crate) fn token_at(&self, offset: Offset) -> Option<usize> {
        let offset = offset.get();
        let after = self
            .tokens
            .partition_point(|token| token.span.start() <= offset);
        let current = after.checked_sub(1)?;
        let token = self.tokens[current];
        if token.span.contains(Offset::new(offset)) {
            if offset == token.span.start() && current > 0 && !token.is_word() {
                let previous = current - 1;
                if self.tokens[previous].is_word()
                    && self.tokens[previous].span.end() == offset
                {
                    return Some(previous);
                }
            }
            return Some(current);
        }
        None
    }

    pub(crate) fn word_at(&self, offset: Offset) -> Option<usize> {
        self.token_at(offset)
            .filter(|&index| self.tokens[index].is_word())
    }

    pub(crate) fn is_member_name(&self, index: usize) -> bool {
        index > 0 && (self.is_punct(index - 1, ".") || self.is_punct(index - 1, "?."))
    }

    pub(crate) fn is_this_member(&self, index: usize) -> bool {
        self.is_member_name(index) && index > 1 && self.is_keyword(index - 2, "this")
    }

    pub(crate) fn is_reference_candidate(&self, index: usize) -> bool {
        self.is_ident(index) && !self.is_member_name(index) && !self.property_keys.contains(&index)
    }

    /// Declaration named `name` visible at `offset`.
    pub(crate) fn lookup(&self, name: &str, offset: u32) -> Option<usize> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.name == name && d.scope.contains(Offset::new(offset)))
            .min_by_key(|(_, d)| d.scope.length())
            .map(|(index, _)| index)
    }

    pub(crate) fn resolve(&self, token: usize) -> Option<usize> {
        if let Some(index) = self.declarations.iter().position(|d| d.token == token) {
            return Some(index);
        }
        if !self.is_reference_candidate(token) {
            return None;
        }
        self.lookup(self.text_at(token), self.tokens[token].span.start())
    }

    pub(crate) fn references(&self, declaration: usize) -> Vec<usize> {
        let target = &self.declarations[declaration];
        (0..self.tokens.len())
            .filter(|&index| {
                index != target.token
                    && self.text_at(index) == target.name
                    && self.is_reference_candidate(index)
                    && self.resolve(index) == Some(declaration)
            })
            .collect()
    }

    /// Declarations visible at `offset`, innermost first, one per name.
    pub(crate) fn visible(&self, offset: u32) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.scope.contains(Offset::new(offset)))
            .map(|(index, _)| index)
            .collect();
        found.sort_by_key(|&index| self.declarations[index].scope.length());
        let mut seen = FxHashSet::default();
        found.retain(|&index| seen.insert(self.declarations[index].name.clone()));
        found
    }

    /// Innermost function with a `this: typeof binding` parameter whose body
    /// contains `offset`.
    pub(crate) fn typed_this_function_at(&self, offset: u32) -> Option<&FunctionInfo> {
        self.functions
            .iter()
            .filter(|f| f.this_binding.is_some() && f.body.contains(Offset::new(offset)))
            .min_by_key(|f| f.body.length())
    }

    pub(crate) fn in_literal_or_comment(&self, offset: Offset) -> bool {
        let strictly_inside =
            |span: Span| span.start() < offset.get() && offset.get() < span.end();
        self.comments.iter().any(|comment| {
            strictly_inside(comment.span)
                || (!comment.block && comment.span.contains(offset) && offset.get() > comment.span.start())
        }) || self
            .tokens
            .iter()
            .any(|token| token.is_literal() && strictly_inside(token.span))
    }

    /// Text of a `/** ... */` comment directly preceding `position`.
    pub(crate) fn jsdoc_before(&self, position: u32) -> Option<String> {
        let comment = self
            .comments
            .iter()
            .rev()
            .find(|comment| comment.span.end() <= position)?;
        let gap = self
            .text
            .get(comment.span.end_usize()..position as usize)?;
        if !gap.trim().is_empty() && !matches!(gap.trim(), "export" | "export default") {
            return None;
        }
        let raw = comment.span.slice(&self.text)?;
        let body = raw.strip_prefix("/**")?.strip_suffix("*/")?;
        let lines: Vec<&str> = body
            .lines()
            .map(|line| line.trim().trim_start_matches('*').trim())
            .filter(|line| !line.is_empty())
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// Source text of `span` with runs of whitespace collapsed.
    pub(crate) fn compact(&self, span: Span) -> String {
        span.slice(&self.text)
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

//! Template expressions rewritten as a type-checkable script.
//!
//! The output imports the component's own default export and wraps every
//! expression found in the template inside a function whose `this` is typed
//! as that component:
//!
//! ```text
//! import __vlsComponent from "./App.vue";
//! function __vlsRender(this: typeof __vlsComponent) {
//!   (this.message);
//!   for (const item of (this.items)) {
//!     (item.label);
//!   }
//! }
//! ```
//!
//! Free identifiers become `this.` member accesses so that the script engine
//! reports unknown members. Every token copied from the template gets a
//! mapping node back to its original offset.

use rustc_hash::FxHashSet;
use vls_script::lexer;
use vls_script::lexer::Token;
use vls_script::lexer::TokenKind;
use vls_source::Span;

use crate::markup::find_close_tag;
use crate::markup::scan_open_tag;
use crate::markup::Attribute;
use crate::markup::Tag;
use crate::markup::VOID_ELEMENTS;
use crate::source_map::MappingNode;

pub const COMPONENT_BINDING: &str = "__vlsComponent";
pub const RENDER_FUNCTION: &str = "__vlsRender";

/// Names a template may reference without going through the component.
const GLOBALS: &[&str] = &[
    "Infinity",
    "undefined",
    "NaN",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "Math",
    "Number",
    "Date",
    "Array",
    "Object",
    "Boolean",
    "String",
    "RegExp",
    "Map",
    "Set",
    "JSON",
    "Intl",
    "BigInt",
    "require",
    "console",
];

/// Elements whose content is never markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Directives that never carry an expression.
const STATIC_DIRECTIVES: &[&str] = &["v-else", "v-cloak", "v-once", "v-pre"];

const HANDLER_LOCALS: &[&str] = &["$event", "arguments"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateScript {
    pub text: String,
    pub nodes: Vec<MappingNode>,
}

/// Rewrite the template whose content occupies `content` within `source`.
/// `component` is the import specifier of the component module.
#[must_use]
pub fn transform(source: &str, content: Span, component: &str) -> TemplateScript {
    let mut emitter = Emitter {
        source,
        out: String::new(),
        nodes: Vec::new(),
        scopes: Vec::new(),
    };
    emitter.out.push_str(&format!(
        "import {COMPONENT_BINDING} from \"{component}\";\nfunction {RENDER_FUNCTION}(this: typeof {COMPONENT_BINDING}) {{\n"
    ));
    emitter.walk(content);
    emitter.out.push_str("}\n");

    TemplateScript {
        text: emitter.out,
        nodes: emitter.nodes,
    }
}

struct OpenElement {
    name: String,
    blocks: usize,
}

struct Emitter<'a> {
    source: &'a str,
    out: String,
    nodes: Vec<MappingNode>,
    /// One entry per open block, holding the names it declares.
    scopes: Vec<Vec<String>>,
}

impl Emitter<'_> {
    fn walk(&mut self, content: Span) {
        let source = self.source;
        let end = content.end_usize().min(source.len());
        let mut pos = content.start_usize();
        let mut open: Vec<OpenElement> = Vec::new();

        while pos < end {
            let window = &source[pos..end];
            let tag_at = window.find('<');
            let interpolation_at = window.find("{{");
            let next = match (tag_at, interpolation_at) {
                (Some(tag), Some(interpolation)) => tag.min(interpolation),
                (Some(at), None) | (None, Some(at)) => at,
                (None, None) => break,
            };
            let start = pos + next;
            let rest = &source[start..end];

            if rest.starts_with("{{") {
                let expression_start = start + 2;
                let close = source[expression_start..end]
                    .find("}}")
                    .map(|index| expression_start + index);
                let expression_end = close.unwrap_or(end);
                self.interpolation(Span::from_bounds(expression_start, expression_end));
                pos = close.map_or(end, |close| close + 2);
            } else if rest.starts_with("<!--") {
                pos = rest.find("-->").map_or(end, |close| start + close + 3);
            } else if rest.starts_with("</") {
                let name_end = rest[2..]
                    .find(|c: char| c == '>' || c.is_whitespace())
                    .map_or(rest.len(), |index| index + 2);
                self.close_element(&mut open, &rest[2..name_end]);
                pos = rest.find('>').map_or(end, |close| start + close + 1);
            } else if let Some(tag) = scan_open_tag(source, start, end) {
                pos = self.open_element(&tag, &mut open, end);
            } else {
                pos = start + 1;
            }
        }

        while let Some(element) = open.pop() {
            self.close_blocks(element.blocks);
        }
    }

    /// Handle one opening tag and return where scanning resumes.
    fn open_element(&mut self, tag: &Tag, open: &mut Vec<OpenElement>, end: usize) -> usize {
        let source = self.source;
        let name = tag.name(source).to_ascii_lowercase();

        if tag.attribute(source, "v-pre").is_some() {
            return if tag.self_closing || !tag.terminated {
                tag.end
            } else {
                skip_element(source, &name, tag.end, end)
            };
        }

        let blocks = self.attributes(tag);
        if tag.self_closing || !tag.terminated || VOID_ELEMENTS.contains(&name.as_str()) {
            self.close_blocks(blocks);
            return tag.end;
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.close_blocks(blocks);
            return find_close_tag(source, &name, tag.end)
                .map_or(end, |(_, close_end)| close_end.min(end));
        }
        open.push(OpenElement { name, blocks });
        tag.end
    }

    fn close_element(&mut self, open: &mut Vec<OpenElement>, name: &str) {
        let Some(index) = open
            .iter()
            .rposition(|element| element.name.eq_ignore_ascii_case(name))
        else {
            return;
        };
        while open.len() > index {
            if let Some(element) = open.pop() {
                self.close_blocks(element.blocks);
            }
        }
    }

    fn close_blocks(&mut self, blocks: usize) {
        for _ in 0..blocks {
            self.scopes.pop();
            self.begin_line();
            self.out.push_str("}\n");
        }
    }

    /// Emit the expressions of `tag`'s attributes. Returns the number of
    /// blocks opened, which stay open until the element closes.
    fn attributes(&mut self, tag: &Tag) -> usize {
        let source = self.source;
        let mut blocks = 0;

        if let Some(value) = tag.attribute(source, "v-for").and_then(|a| a.value) {
            if self.for_block(value) {
                blocks += 1;
            }
        }

        for attribute in &tag.attributes {
            let name = attribute.name.slice(source).unwrap_or_default();
            if is_slot_attribute(name) {
                if let Some(value) = attribute.value.filter(|value| !value.is_empty()) {
                    self.slot_block(value);
                    blocks += 1;
                }
            }
        }

        for attribute in &tag.attributes {
            self.directive(attribute);
        }
        blocks
    }

    fn directive(&mut self, attribute: &Attribute) {
        let source = self.source;
        let name = attribute.name.slice(source).unwrap_or_default();
        let Some(value) = attribute.value else {
            return;
        };
        let directive = name.split([':', '.']).next().unwrap_or_default();
        if name == "v-for" || is_slot_attribute(name) || STATIC_DIRECTIVES.contains(&directive) {
            return;
        }
        if value.slice(source).map_or(true, |text| text.trim().is_empty()) {
            return;
        }

        if name.starts_with('@') || directive == "v-on" {
            if is_simple_path(value.slice(source).unwrap_or_default()) {
                self.begin_line();
                self.expression(value, HANDLER_LOCALS);
                self.anchor(";\n", value.end());
            } else {
                self.begin_line();
                self.out.push_str("{ ");
                self.expression(value, HANDLER_LOCALS);
                self.anchor("; }\n", value.end());
            }
        } else if name.starts_with(':') || name.starts_with("v-") {
            self.begin_line();
            self.out.push('(');
            self.expression(value, &[]);
            self.anchor(");\n", value.end());
        }
    }

    fn interpolation(&mut self, span: Span) {
        self.begin_line();
        self.out.push('(');
        self.expression(span, &[]);
        self.anchor(");\n", span.end());
    }

    /// `v-for="(item, index) in items"` opens `for (const [item, index] of (items)) {`.
    fn for_block(&mut self, value: Span) -> bool {
        let source = self.source;
        let text = value.slice(source).unwrap_or_default();
        let lexed = lexer::tokenize(text);
        let mut depth = 0i32;
        let separator = lexed.tokens.iter().find(|token| {
            match token.text(text) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => {}
            }
            depth == 0 && token.is_word() && matches!(token.text(text), "in" | "of")
        });
        let Some(separator) = separator else {
            return false;
        };

        let mut alias = trim_span(source, Span::new(value.start(), separator.span.start()));
        let trimmed = alias.slice(source).unwrap_or_default();
        let parenthesized = trimmed.starts_with('(') && trimmed.ends_with(')');
        if parenthesized {
            alias = Span::from_parts(alias.start_usize() + 1, trimmed.len().saturating_sub(2));
        }
        let iterable = trim_span(
            source,
            Span::from_bounds(
                value.start_usize() + separator.span.end_usize(),
                value.end_usize(),
            ),
        );

        let alias_text = alias.slice(source).unwrap_or_default();
        let names = pattern_names(alias_text);
        let tuple = parenthesized && has_top_level_comma(alias_text);

        self.begin_line();
        self.out.push_str("for (const ");
        if tuple {
            self.out.push('[');
        }
        self.verbatim(alias);
        if tuple {
            self.out.push(']');
        }
        self.out.push_str(" of (");
        self.expression(iterable, &[]);
        self.anchor(")) {\n", iterable.end());
        self.scopes.push(names);
        true
    }

    /// Slot props become block-scoped names visible to the element's content.
    fn slot_block(&mut self, pattern: Span) {
        let names = pattern_names(pattern.slice(self.source).unwrap_or_default());
        self.begin_line();
        self.out.push_str("{ const ");
        self.verbatim(pattern);
        self.out.push_str(" = {} as any;\n");
        self.scopes.push(names);
    }

    fn begin_line(&mut self) {
        for _ in 0..=self.scopes.len() {
            self.out.push_str("  ");
        }
    }

    /// Copy `span` from the template unchanged under one mapping node.
    fn verbatim(&mut self, span: Span) {
        let text = span.slice(self.source).unwrap_or_default();
        self.push_mapped(text, span);
    }

    fn push_mapped(&mut self, text: &str, original: Span) {
        let start = self.out.len();
        self.out.push_str(text);
        self.nodes.push(MappingNode {
            virtual_span: Span::from_bounds(start, self.out.len()),
            original_span: original,
        });
    }

    /// Emit `text`, mapping its first character to the empty span at
    /// `original_end` so that findings about a missing operand still land
    /// inside the template.
    fn anchor(&mut self, text: &str, original_end: u32) {
        let start = self.out.len();
        self.out.push_str(text);
        if !text.is_empty() {
            self.nodes.push(MappingNode {
                virtual_span: Span::from_parts(start, 1),
                original_span: Span::new(original_end, 0),
            });
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.iter().any(|local| local == name))
    }

    /// Copy the expression at `span`, prefixing free identifiers with
    /// `this.`.
    fn expression(&mut self, span: Span, extra_locals: &[&str]) {
        let source = self.source;
        let text = span.slice(source).unwrap_or_default();
        let lexed = lexer::tokenize(text);
        let tokens = &lexed.tokens;
        let arrow_params = arrow_parameters(text, tokens);
        // open brackets, flagged when the brace opens an arrow body
        let mut brackets: Vec<(&str, bool)> = Vec::new();
        let mut cursor = 0;

        for (index, token) in tokens.iter().enumerate() {
            self.out.push_str(&text[cursor..token.span.start_usize()]);
            cursor = token.span.end_usize();
            let word = token.text(text);
            let original = Span::new(span.start() + token.span.start(), token.span.length());
            let previous = index.checked_sub(1).map(|i| tokens[i].text(text));
            let next = tokens.get(index + 1).map(|t| t.text(text));

            let free = token.kind == TokenKind::Ident
                && !matches!(previous, Some("." | "?."))
                && !arrow_params.contains(word)
                && !extra_locals.contains(&word)
                && !GLOBALS.contains(&word)
                && !self.is_local(word);
            let in_object = matches!(brackets.last(), Some(("{", false)))
                && matches!(previous, Some("{" | ","));

            if free && in_object && next == Some(":") {
                // object key
                self.push_mapped(word, original);
            } else if free && in_object && matches!(next, Some("," | "}")) {
                self.push_mapped(word, original);
                self.out.push_str(": this.");
                self.push_mapped(word, original);
            } else if free {
                self.out.push_str("this.");
                self.push_mapped(word, original);
            } else {
                self.push_mapped(word, original);
            }

            if token.kind == TokenKind::Punct {
                match word {
                    "(" | "[" => brackets.push((word, false)),
                    "{" => brackets.push(("{", previous == Some("=>"))),
                    ")" | "]" | "}" => {
                        brackets.pop();
                    }
                    _ => {}
                }
            }
        }
        self.out.push_str(&text[cursor.min(text.len())..]);
        if lexed.comments.iter().any(|comment| !comment.block) {
            self.out.push('\n');
        }
    }
}

fn trim_span(source: &str, span: Span) -> Span {
    let text = span.slice(source).unwrap_or_default();
    let leading = text.len() - text.trim_start().len();
    Span::from_parts(span.start_usize() + leading, text.trim().len())
}

fn is_slot_attribute(name: &str) -> bool {
    name.starts_with('#')
        || name == "v-slot"
        || name.starts_with("v-slot:")
        || name == "slot-scope"
        || name == "scope"
}

/// `handler` or `a.b.c`, as opposed to an inline statement.
fn is_simple_path(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c == '$' || c == '_' || c.is_alphabetic())
                && chars.all(|c| c == '$' || c == '_' || c.is_alphanumeric())
        })
}

fn has_top_level_comma(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Names bound by a destructuring pattern or a plain list of aliases.
fn pattern_names(text: &str) -> Vec<String> {
    let lexed = lexer::tokenize(text);
    let tokens = &lexed.tokens;
    let mut names = Vec::new();
    let mut in_default = false;
    for (index, token) in tokens.iter().enumerate() {
        let word = token.text(text);
        if token.kind == TokenKind::Punct {
            match word {
                "=" => in_default = true,
                "," | "}" | "]" => in_default = false,
                _ => {}
            }
            continue;
        }
        if token.kind != TokenKind::Ident || in_default {
            continue;
        }
        let next = tokens.get(index + 1).map(|t| t.text(text));
        if next != Some(":") {
            names.push(word.to_string());
        }
    }
    names
}

/// Identifiers bound as arrow function parameters anywhere in the
/// expression.
fn arrow_parameters<'t>(text: &'t str, tokens: &[Token]) -> FxHashSet<&'t str> {
    let mut names = FxHashSet::default();
    for (index, token) in tokens.iter().enumerate() {
        if !token.is_punct(text, "=>") || index == 0 {
            continue;
        }
        let previous = &tokens[index - 1];
        if previous.kind == TokenKind::Ident {
            names.insert(previous.text(text));
            continue;
        }
        if !previous.is_punct(text, ")") {
            continue;
        }
        let mut depth = 0;
        for inner in (0..index - 1).rev() {
            let candidate = &tokens[inner];
            match candidate.text(text) {
                ")" if candidate.kind == TokenKind::Punct => depth += 1,
                "(" if candidate.kind == TokenKind::Punct => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                word if candidate.kind == TokenKind::Ident
                    && tokens.get(inner + 1).map(|t| t.text(text)) != Some(":") =>
                {
                    names.insert(word);
                }
                _ => {}
            }
        }
    }
    names
}

/// Skip past the element opened just before `from`, honouring nested
/// elements of the same name.
fn skip_element(source: &str, name: &str, from: usize, end: usize) -> usize {
    let mut depth = 1usize;
    let mut pos = from;
    while pos < end {
        let Some(index) = source[pos..end].find('<') else {
            break;
        };
        let start = pos + index;
        if let Some(tag) = scan_open_tag(source, start, end) {
            if tag.name(source).eq_ignore_ascii_case(name) && !tag.self_closing {
                depth += 1;
            }
            pos = tag.end.max(start + 1);
            continue;
        }
        if let Some((close_start, close_end)) = find_close_tag(source, name, start) {
            if close_start == start {
                depth -= 1;
                if depth == 0 {
                    return close_end.min(end);
                }
                pos = close_end;
                continue;
            }
        }
        pos = start + 1;
    }
    end
}

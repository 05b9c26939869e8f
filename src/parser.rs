//! Scanning recursive-descent parser for declaration files.
//!
//! The parser pulls tokens from the [`Lexer`] one at a time and only
//! interprets the shapes it cares about: `declare module` blocks, the classes
//! inside them, and the members at the top brace level of each class. Anything
//! else is scanned past. Malformed input never fails the parse; the production
//! that hit it gives up with a [`Skip`] and the enclosing loop carries on.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::model::*;

/// Why a production gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("expected an identifier, found {found}")]
    ExpectedIdentifier { found: TokenKind },
    #[error("module `{module}` has no body")]
    MissingModuleBody { module: String },
    #[error("parameter list is not closed")]
    UnterminatedParameters,
    #[error("signature has no return type")]
    MissingReturnType,
    #[error("member cannot start with {found}")]
    UnrecognizedMember { found: TokenKind },
    #[error("class `{class}` extends `{target}`, which is not declared earlier in module `{module}`")]
    UnresolvedExtends {
        module: String,
        class: String,
        target: String,
    },
    #[error("input ended inside a declaration")]
    UnexpectedEnd,
}

/// A structured record of a construct the parser abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{reason} (at byte {offset})")]
pub struct Skip {
    pub reason: SkipReason,
    pub offset: usize,
}

/// A production either yields its node or the skip that stopped it.
pub type Step<T> = Result<T, Skip>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Resolve `extends` targets declared later in the same module.
    pub resolve_forward_extends: bool,
}

/// Parse a declaration source string into an [`Outline`].
pub fn parse(src: &str) -> Outline {
    parse_with_options(src, &ParseOptions::default())
}

#[instrument(skip_all, fields(len = src.len()))]
pub fn parse_with_options(src: &str, options: &ParseOptions) -> Outline {
    let mut parser = Parser::new(src);
    parser.parse_declarations();
    let mut outline = parser.finish();

    if options.resolve_forward_extends {
        let resolved = outline.resolve_forward_extends();
        debug!(resolved, "resolved forward extends");
    }

    debug!(
        modules = outline.modules.len(),
        skips = outline.skips.len(),
        "parsed declarations"
    );
    outline
}

enum Member {
    Property(Property),
    Function(Function),
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    /// Hand `current` out again on the next pull instead of lexing.
    replay: bool,
    modules: IndexMap<String, Module>,
    skips: Vec<Skip>,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str) -> Self {
        Self {
            lexer: Lexer::new(src),
            current: Token::new(TokenKind::EndOfInput, "", 0, 0),
            replay: false,
            modules: IndexMap::new(),
            skips: Vec::new(),
        }
    }

    fn finish(self) -> Outline {
        Outline {
            modules: self.modules.into_values().collect(),
            skips: self.skips,
        }
    }

    fn bump(&mut self) -> TokenKind {
        if self.replay {
            self.replay = false;
        } else {
            self.current = self.lexer.next_token();
        }
        self.current.kind
    }

    /// Leave `current` for whoever pulls next.
    fn replay_current(&mut self) {
        self.replay = true;
    }

    fn next_identifier(&mut self) -> Option<&'src str> {
        if std::mem::take(&mut self.replay) && self.current.kind == TokenKind::Identifier {
            return Some(self.current.text);
        }
        match self.lexer.next_identifier() {
            Some(token) => {
                self.current = token;
                Some(token.text)
            }
            None => {
                let end = self.lexer.offset();
                self.current = Token::new(TokenKind::EndOfInput, "", end, end);
                None
            }
        }
    }

    fn keyword(&self) -> Option<Keyword> {
        self.current.keyword()
    }

    fn skip(&self, reason: SkipReason) -> Skip {
        Skip {
            reason,
            offset: self.current.start,
        }
    }

    fn expected_identifier(&self) -> Skip {
        match self.current.kind {
            TokenKind::EndOfInput => self.skip(SkipReason::UnexpectedEnd),
            found => self.skip(SkipReason::ExpectedIdentifier { found }),
        }
    }

    fn record(&mut self, step: Step<()>) {
        if let Err(skip) = step {
            debug!(%skip, "skipped");
            self.skips.push(skip);
        }
    }

    /// Top level: scan for `declare module` and ignore everything else.
    fn parse_declarations(&mut self) {
        while let Some(ident) = self.next_identifier() {
            if Keyword::from_ident(ident) != Some(Keyword::Declare) {
                continue;
            }
            match self.next_identifier() {
                Some(next) if Keyword::from_ident(next) == Some(Keyword::Module) => {
                    let step = self.parse_module();
                    self.record(step);
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    fn parse_module(&mut self) -> Step<()> {
        if self.bump() != TokenKind::Identifier {
            return Err(self.expected_identifier());
        }
        let name = self.current.text;
        let entry = self.modules.entry(name.to_string());
        let module = entry.index();
        entry.or_insert_with(|| Module::new(name));
        debug!(module = name, "module");

        if self.bump() != TokenKind::BracketOpen {
            self.replay_current();
            return Err(self.skip(SkipReason::MissingModuleBody {
                module: name.to_string(),
            }));
        }
        self.parse_module_body(module)
    }

    fn parse_module_body(&mut self, module: usize) -> Step<()> {
        let mut depth = 1usize;
        let mut exported = false;

        loop {
            match self.bump() {
                TokenKind::EndOfInput => return Err(self.skip(SkipReason::UnexpectedEnd)),
                TokenKind::BracketOpen => depth += 1,
                TokenKind::BracketClose => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Identifier => {
                    if self.keyword() == Some(Keyword::Export) {
                        if self.bump() != TokenKind::Identifier {
                            self.replay_current();
                            continue;
                        }
                        exported = true;
                    }
                    match self.keyword() {
                        Some(Keyword::Class) => {
                            let step = self.parse_class(module, exported);
                            self.record(step);
                            exported = false;
                        }
                        // `export declare abstract class` keeps the flag until `class` shows up.
                        Some(Keyword::Declare | Keyword::Default | Keyword::Abstract) => {}
                        _ => exported = false,
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_class(&mut self, module: usize, exported: bool) -> Step<()> {
        if self.bump() != TokenKind::Identifier {
            self.replay_current();
            return Err(self.expected_identifier());
        }
        let name = self.current.text;
        let class = self.modules[module].get_or_insert_class(name, exported);
        debug!(class = name, exported, "class");
        self.parse_class_body(module, class)
    }

    /// Class header and body.
    ///
    /// Before the opening brace only `extends` is recognized. At depth 1 each
    /// identifier starts a member; deeper blocks are scanned past. A `}` seen
    /// before the class opens ends it and is left for the enclosing module.
    fn parse_class_body(&mut self, module: usize, class: ClassRef) -> Step<()> {
        let mut depth = 0usize;

        loop {
            match self.bump() {
                TokenKind::EndOfInput => return Err(self.skip(SkipReason::UnexpectedEnd)),
                TokenKind::BracketOpen => depth += 1,
                TokenKind::BracketClose if depth == 0 => {
                    self.replay_current();
                    return Ok(());
                }
                TokenKind::BracketClose => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Identifier if depth == 0 => {
                    if self.keyword() == Some(Keyword::Extends) {
                        let step = self.parse_extends(module, class);
                        self.record(step);
                    }
                }
                TokenKind::Identifier if depth == 1 => match self.parse_member() {
                    Ok(Member::Property(property)) => {
                        trace!(property = %property.name, "property");
                        self.modules[module][class].properties.push(property);
                    }
                    Ok(Member::Function(function)) => {
                        trace!(function = %function.name, "function");
                        self.modules[module][class].functions.push(function);
                    }
                    Err(skip) => self.record(Err(skip)),
                },
                _ => {}
            }
        }
    }

    fn parse_extends(&mut self, module: usize, class: ClassRef) -> Step<()> {
        if self.bump() != TokenKind::Identifier {
            self.replay_current();
            return Err(self.expected_identifier());
        }
        let target = self.current.text;
        let module = &mut self.modules[module];
        match module.class_ref(target) {
            Some(parent) => {
                module[class].extends.push(parent);
                Ok(())
            }
            None => {
                let reason = SkipReason::UnresolvedExtends {
                    module: module.name.clone(),
                    class: module[class].name.clone(),
                    target: target.to_string(),
                };
                Err(self.skip(reason))
            }
        }
    }

    /// One member at class depth 1; `current` is its first identifier.
    fn parse_member(&mut self) -> Step<Member> {
        let mut name = self.current.text;
        let mut is_static = false;
        let mut accessor = AccessorType::Public;

        // A modifier only counts when another identifier follows it;
        // otherwise it is the member name, as in `static: boolean;`.
        let mut shape = loop {
            let modifier = Keyword::from_ident(name);
            if !matches!(
                modifier,
                Some(Keyword::Static | Keyword::Public | Keyword::Private | Keyword::Protected)
            ) {
                break self.bump();
            }
            let next = self.bump();
            if next != TokenKind::Identifier {
                break next;
            }
            match modifier {
                Some(Keyword::Static) => is_static = true,
                Some(Keyword::Private) => accessor = AccessorType::Private,
                Some(Keyword::Protected) => accessor = AccessorType::Protected,
                _ => accessor = AccessorType::Public,
            }
            name = self.current.text;
        };

        let mut optional = false;
        if shape == TokenKind::Interrogation {
            optional = true;
            shape = self.bump();
        }

        match shape {
            TokenKind::Definer => match self.bump() {
                TokenKind::ParenthesisOpen => {
                    let mut lambda = self.parse_lambda(name)?;
                    lambda.is_static = is_static;
                    lambda.accessor = accessor;
                    let mut property = Property::new(name);
                    property.is_static = is_static;
                    property.accessor = accessor;
                    property.optional = optional;
                    property.ty = "function".to_string();
                    property.lambda = Some(lambda);
                    Ok(Member::Property(property))
                }
                TokenKind::Identifier => {
                    let mut property = Property::new(name);
                    property.is_static = is_static;
                    property.accessor = accessor;
                    property.optional = optional;
                    property.ty = self.current.text.to_string();
                    property.value = self.parse_property_value();
                    if self.current.kind != TokenKind::InstructionEnd {
                        self.replay_current();
                        return Err(self.skip(SkipReason::UnrecognizedMember {
                            found: self.current.kind,
                        }));
                    }
                    Ok(Member::Property(property))
                }
                _ => {
                    self.replay_current();
                    Err(self.expected_identifier())
                }
            },
            TokenKind::InstructionEnd => {
                let mut property = Property::new(name);
                property.is_static = is_static;
                property.accessor = accessor;
                property.optional = optional;
                Ok(Member::Property(property))
            }
            TokenKind::ParenthesisOpen => {
                let mut function = Function::new(name);
                function.is_static = is_static;
                function.accessor = accessor;
                function.parameters = self.parse_parameters()?;
                if self.bump() == TokenKind::Definer {
                    if self.bump() != TokenKind::Identifier {
                        self.replay_current();
                        return Err(self.skip(SkipReason::MissingReturnType));
                    }
                    function.return_type = self.current.text.to_string();
                } else {
                    self.replay_current();
                }
                Ok(Member::Function(function))
            }
            found => {
                self.replay_current();
                Err(self.skip(SkipReason::UnrecognizedMember { found }))
            }
        }
    }

    /// `= <number>` after a property type. Other initializers are scanned
    /// past without a value. Leaves `current` on the token that ends the
    /// declaration.
    fn parse_property_value(&mut self) -> Option<Literal> {
        if self.bump() != TokenKind::Equality {
            return None;
        }
        let value = match self.bump() {
            TokenKind::Number => Some(self.number_literal()),
            _ => None,
        };
        while !matches!(
            self.current.kind,
            TokenKind::InstructionEnd
                | TokenKind::BracketOpen
                | TokenKind::BracketClose
                | TokenKind::EndOfInput
        ) {
            self.bump();
        }
        value
    }

    /// Move up to the `,` or `)` that ends the current parameter.
    fn skip_to_parameter_end(&mut self) {
        let mut nesting = 0usize;
        loop {
            match self.current.kind {
                TokenKind::EndOfInput => return,
                TokenKind::Comma | TokenKind::ParenthesisClose if nesting == 0 => return,
                TokenKind::ParenthesisOpen => nesting += 1,
                TokenKind::ParenthesisClose => nesting -= 1,
                _ => {}
            }
            self.bump();
        }
    }

    /// `(params) => ReturnType` with the opening parenthesis consumed.
    fn parse_lambda(&mut self, name: &str) -> Step<Function> {
        let mut lambda = Function::new(name);
        lambda.parameters = self.parse_parameters()?;
        if self.bump() != TokenKind::LambdaFunction || self.bump() != TokenKind::Identifier {
            self.replay_current();
            return Err(self.skip(SkipReason::MissingReturnType));
        }
        lambda.return_type = self.current.text.to_string();
        Ok(lambda)
    }

    /// Parameter list with the opening parenthesis already consumed.
    fn parse_parameters(&mut self) -> Step<Vec<Parameter>> {
        let mut depth = 1usize;
        let mut params = Vec::new();

        while depth > 0 {
            match self.bump() {
                TokenKind::EndOfInput => {
                    return Err(self.skip(SkipReason::UnterminatedParameters));
                }
                TokenKind::ParenthesisOpen => depth += 1,
                TokenKind::ParenthesisClose => depth -= 1,
                TokenKind::Identifier => {
                    let param = self.parse_parameter()?;
                    // Type syntax past the first identifier (`Array<T>`, `a | b`) is opaque.
                    self.skip_to_parameter_end();
                    match self.current.kind {
                        TokenKind::Comma => params.push(param),
                        TokenKind::ParenthesisClose => {
                            params.push(param);
                            depth -= 1;
                        }
                        _ => return Err(self.skip(SkipReason::UnterminatedParameters)),
                    }
                }
                _ => {}
            }
        }

        Ok(params)
    }

    /// `name[?][: type][= literal]`. Leaves `current` on the first token it did not use.
    fn parse_parameter(&mut self) -> Step<Parameter> {
        let mut param = Parameter::new(self.current.text);
        let mut kind = self.bump();

        if kind == TokenKind::Interrogation {
            param.optional = true;
            kind = self.bump();
        }

        if kind == TokenKind::Definer {
            match self.bump() {
                TokenKind::Identifier => param.ty = self.current.text.to_string(),
                TokenKind::ParenthesisOpen => {
                    let lambda = self.parse_lambda(&param.name)?;
                    param.ty = "function".to_string();
                    param.lambda = Some(lambda);
                }
                TokenKind::EndOfInput => {
                    return Err(self.skip(SkipReason::UnterminatedParameters));
                }
                _ => {
                    self.replay_current();
                    return Err(self.expected_identifier());
                }
            }
            kind = self.bump();
        }

        if kind == TokenKind::Equality {
            param.default_value = match self.bump() {
                TokenKind::Number => Some(self.number_literal()),
                TokenKind::String => Some(Literal::String {
                    raw: self.current.text.to_string(),
                }),
                _ => None,
            };
            if param.default_value.is_some() {
                self.bump();
            }
        }

        Ok(param)
    }

    fn number_literal(&self) -> Literal {
        Literal::Number {
            raw: self.current.text.to_string(),
            value: self.current.number_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser_at(src: &str) -> Parser<'_> {
        let mut parser = Parser::new(src);
        parser.bump();
        parser
    }

    #[test]
    fn test_parse_parameters_production() {
        let mut parser = parser_at("(a: string, b?: number = 2, c = \"x\") rest");
        let params = parser.parse_parameters().unwrap();

        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].ty, "string");
        assert!(params[1].optional);
        assert_eq!(params[1].default_value.as_ref().and_then(Literal::as_f64), Some(2.0));
        assert_eq!(params[2].ty, "any");
        assert_eq!(params[2].default_value.as_ref().map(Literal::raw), Some("\"x\""));
        assert_eq!(parser.bump(), TokenKind::Identifier);
        assert_eq!(parser.current.text, "rest");
    }

    #[test]
    fn test_parse_parameters_empty() {
        let mut parser = parser_at("()");
        assert_eq!(parser.parse_parameters().unwrap(), Vec::new());
    }

    #[test]
    fn test_parse_parameters_unterminated() {
        let mut parser = parser_at("(a: string, b");
        let skip = parser.parse_parameters().unwrap_err();
        assert_eq!(skip.reason, SkipReason::UnterminatedParameters);
    }

    #[test]
    fn test_parse_parameters_function_typed() {
        let mut parser = parser_at("(done: (err: Error, count?: number) => void, retries: number)");
        let params = parser.parse_parameters().unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].ty, "function");
        let lambda = params[0].lambda.as_ref().unwrap();
        assert_eq!(lambda.return_type, "void");
        assert_eq!(lambda.parameters.len(), 2);
        assert!(lambda.parameters[1].optional);
        assert_eq!(params[1].name, "retries");
    }

    #[test]
    fn test_parse_parameters_compound_types_are_opaque() {
        let mut parser = parser_at("(items: Array<string>, owner: Node | null, mask = -1)");
        let params = parser.parse_parameters().unwrap();

        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["items", "owner", "mask"]);
        assert_eq!(params[0].ty, "Array");
        assert_eq!(params[1].ty, "Node");
        assert_eq!(params[2].default_value, None);
    }

    #[test]
    fn test_parse_member_modifiers_either_order() {
        let mut parser = Parser::new("private static count: number;");
        parser.bump();
        let Ok(Member::Property(p)) = parser.parse_member() else {
            panic!("expected property");
        };
        assert_eq!(p.name, "count");
        assert!(p.is_static);
        assert_eq!(p.accessor, AccessorType::Private);
    }

    #[test]
    fn test_parse_member_modifier_as_name() {
        let mut parser = Parser::new("static: boolean;");
        parser.bump();
        let Ok(Member::Property(p)) = parser.parse_member() else {
            panic!("expected property");
        };
        assert_eq!(p.name, "static");
        assert!(!p.is_static);
        assert_eq!(p.ty, "boolean");
    }

    #[test]
    fn test_parse_member_method_without_return_type() {
        let mut parser = Parser::new("dispose() next: number;");
        parser.bump();
        let Ok(Member::Function(f)) = parser.parse_member() else {
            panic!("expected function");
        };
        assert_eq!(f.name, "dispose");
        assert_eq!(f.return_type, "void");
        // The token after the signature is left for the class loop.
        assert_eq!(parser.bump(), TokenKind::Identifier);
        assert_eq!(parser.current.text, "next");
    }

    #[test]
    fn test_parse_member_unrecognized() {
        let mut parser = Parser::new("items[]: string;");
        parser.bump();
        let skip = parser.parse_member().err().unwrap();
        assert_eq!(
            skip.reason,
            SkipReason::UnrecognizedMember {
                found: TokenKind::Unknown
            }
        );
    }

    #[test]
    fn test_parse_module_without_body() {
        let outline = parse("declare module Empty; declare module Full { class A {} }");

        assert_eq!(outline.modules.len(), 2);
        assert!(outline.modules[0].classes.is_empty());
        assert_eq!(outline.modules[1].classes[0].name, "A");
        assert_eq!(
            outline.skips[0].reason,
            SkipReason::MissingModuleBody {
                module: "Empty".to_string()
            }
        );
    }

    #[test]
    fn test_export_flag_is_deferred_to_class() {
        let outline = parse("declare module M { export declare class A {} class B {} }");
        let module = outline.module("M").unwrap();
        assert!(module.class("A").unwrap().exported);
        assert!(!module.class("B").unwrap().exported);
    }

    #[test]
    fn test_export_flag_survives_class_modifiers() {
        let src = r#"
            declare module M {
                export abstract class A { x: number; }
                export default class B {}
                export declare abstract class C {}
                abstract class D {}
            }
        "#;
        let outline = parse(src);
        let module = outline.module("M").unwrap();

        assert!(module.class("A").unwrap().exported);
        assert_eq!(module.class("A").unwrap().properties[0].name, "x");
        assert!(module.class("B").unwrap().exported);
        assert!(module.class("C").unwrap().exported);
        assert!(!module.class("D").unwrap().exported);
    }

    #[test]
    fn test_export_function_does_not_mark_next_class() {
        let outline = parse("declare module M { export function f(): void; class A {} }");
        assert!(!outline.module("M").unwrap().class("A").unwrap().exported);
    }

    #[test]
    fn test_close_brace_before_class_body_ends_class() {
        let outline = parse("declare module M { class A } declare module N { class B { y: string; } }");

        assert!(outline.module("M").unwrap().class("A").unwrap().properties.is_empty());
        let n = outline.module("N").unwrap();
        assert_eq!(n.class("B").unwrap().properties[0].name, "y");
        assert!(outline.is_complete());
    }

    #[test]
    fn test_export_of_other_declarations() {
        let src = "declare module M { export var x: number; class A {} export { A }; class B {} }";
        let outline = parse(src);
        let module = outline.module("M").unwrap();

        assert!(!module.class("A").unwrap().exported);
        assert!(!module.class("B").unwrap().exported);
        assert!(outline.is_complete());
    }

    #[test]
    fn test_nested_blocks_are_opaque() {
        let src = r#"
            declare module M {
                class A {
                    run(): void { var inner: number; }
                    after: string;
                }
            }
        "#;
        let outline = parse(src);
        let class = outline.module("M").unwrap().class("A").unwrap();

        assert_eq!(class.functions.len(), 1);
        assert_eq!(class.properties.len(), 1);
        assert_eq!(class.properties[0].name, "after");
    }

    #[test]
    fn test_skip_display() {
        let skip = Skip {
            reason: SkipReason::ExpectedIdentifier {
                found: TokenKind::Comma,
            },
            offset: 7,
        };
        assert_eq!(skip.to_string(), "expected an identifier, found comma (at byte 7)");
    }
}

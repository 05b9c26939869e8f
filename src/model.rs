//! Outline model built while parsing a declaration file.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::parser::Skip;

/// The result of parsing one declaration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outline {
    pub modules: Vec<Module>,
    /// Constructs the parser gave up on, in the order it met them.
    pub skips: Vec<Skip>,
}

impl Outline {
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// True when no production had to be abandoned.
    pub fn is_complete(&self) -> bool {
        self.skips.is_empty()
    }
}

/// A `declare module Name { ... }` block, merged across reopenings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub name: String,
    pub classes: Vec<Class>,
}

/// Index of a class within its owning [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassRef(pub(crate) usize);

impl ClassRef {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
        }
    }

    pub fn class_ref(&self, name: &str) -> Option<ClassRef> {
        self.classes.iter().position(|c| c.name == name).map(ClassRef)
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn get(&self, class: ClassRef) -> Option<&Class> {
        self.classes.get(class.0)
    }

    /// Look up a class by name, creating it when this is its first mention.
    ///
    /// `exported` only applies on creation; reopening keeps the first flag.
    pub(crate) fn get_or_insert_class(&mut self, name: &str, exported: bool) -> ClassRef {
        if let Some(existing) = self.class_ref(name) {
            return existing;
        }
        self.classes.push(Class::new(name, exported));
        ClassRef(self.classes.len() - 1)
    }

    /// Direct superclasses of `class`, in declaration order.
    pub fn superclasses(&self, class: ClassRef) -> impl Iterator<Item = &Class> + '_ {
        self.get(class)
            .into_iter()
            .flat_map(|c| c.extends.iter())
            .filter_map(move |parent| self.get(*parent))
    }

    /// All transitive superclasses of `class`, nearest first.
    ///
    /// Each class appears once even when the `extends` graph has a cycle,
    /// and `class` itself is never included.
    pub fn ancestors(&self, class: ClassRef) -> Vec<ClassRef> {
        let mut seen = HashSet::from([class]);
        let mut order = Vec::new();
        let mut frontier = vec![class];

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                let Some(c) = self.get(current) else { continue };
                for parent in &c.extends {
                    if seen.insert(*parent) {
                        order.push(*parent);
                        next.push(*parent);
                    }
                }
            }
            frontier = next;
        }

        order
    }
}

impl Index<ClassRef> for Module {
    type Output = Class;

    fn index(&self, class: ClassRef) -> &Class {
        &self.classes[class.0]
    }
}

impl IndexMut<ClassRef> for Module {
    fn index_mut(&mut self, class: ClassRef) -> &mut Class {
        &mut self.classes[class.0]
    }
}

/// A class declared inside a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub name: String,
    pub exported: bool,
    pub properties: Vec<Property>,
    pub functions: Vec<Function>,
    /// Superclasses from the same module.
    pub extends: Vec<ClassRef>,
}

impl Class {
    pub fn new(name: impl Into<String>, exported: bool) -> Self {
        Self {
            name: name.into(),
            exported,
            properties: Vec::new(),
            functions: Vec::new(),
            extends: Vec::new(),
        }
    }
}

/// Visibility modifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessorType {
    #[default]
    Public,
    Private,
    Protected,
}

impl fmt::Display for AccessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorType::Public => write!(f, "public"),
            AccessorType::Private => write!(f, "private"),
            AccessorType::Protected => write!(f, "protected"),
        }
    }
}

/// A literal default value, kept as the text written in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Literal {
    /// A digit/dot run; `value` is `None` when it is not a valid float.
    Number { raw: String, value: Option<f64> },
    /// A double-quoted string, quotes included.
    String { raw: String },
}

impl Literal {
    pub fn raw(&self) -> &str {
        match self {
            Literal::Number { raw, .. } | Literal::String { raw } => raw,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number { value, .. } => *value,
            Literal::String { .. } => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// A data member. Function-typed members carry their signature in `lambda`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub is_static: bool,
    pub accessor: AccessorType,
    pub optional: bool,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Option<Literal>,
    pub lambda: Option<Function>,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            accessor: AccessorType::Public,
            optional: false,
            ty: "any".to_string(),
            value: None,
            lambda: None,
        }
    }

    pub fn is_lambda(&self) -> bool {
        self.lambda.is_some()
    }
}

/// A method signature, or the signature of a lambda-typed member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub is_static: bool,
    pub accessor: AccessorType,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            accessor: AccessorType::Public,
            return_type: "void".to_string(),
            parameters: Vec::new(),
        }
    }
}

impl Function {
    fn write_parameters(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        self.write_parameters(f)?;
        write!(f, ": {}", self.return_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub optional: bool,
    #[serde(rename = "type")]
    pub ty: String,
    pub default_value: Option<Literal>,
    /// Signature of a function-typed parameter: `cb: (err: Error) => void`.
    pub lambda: Option<Function>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            ty: "any".to_string(),
            default_value: None,
            lambda: None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, ": ")?;
        match &self.lambda {
            Some(lambda) => {
                lambda.write_parameters(f)?;
                write!(f, " => {}", lambda.return_type)?;
            }
            None => write!(f, "{}", self.ty)?,
        }
        if let Some(default) = &self.default_value {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(module: &mut Module, child: &str, parent: &str) {
        let c = module.get_or_insert_class(child, false);
        let p = module.get_or_insert_class(parent, false);
        module[c].extends.push(p);
    }

    #[test]
    fn test_classes_are_deduplicated() {
        let mut module = Module::new("M");
        let a = module.get_or_insert_class("A", true);
        let again = module.get_or_insert_class("A", false);

        assert_eq!(a, again);
        assert_eq!(module.classes.len(), 1);
        assert!(module[a].exported);
    }

    #[test]
    fn test_superclasses_and_ancestors() {
        let mut module = Module::new("M");
        chain(&mut module, "C", "B");
        chain(&mut module, "B", "A");

        let c = module.class_ref("C").unwrap();
        let names: Vec<_> = module.superclasses(c).map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);

        let ancestors: Vec<_> = module
            .ancestors(c)
            .into_iter()
            .map(|r| module[r].name.as_str())
            .collect();
        assert_eq!(ancestors, vec!["B", "A"]);
    }

    #[test]
    fn test_ancestors_survive_cycles() {
        let mut module = Module::new("M");
        chain(&mut module, "A", "B");
        chain(&mut module, "B", "A");
        chain(&mut module, "S", "S");

        let a = module.class_ref("A").unwrap();
        assert_eq!(module.ancestors(a), vec![module.class_ref("B").unwrap()]);

        let s = module.class_ref("S").unwrap();
        assert!(module.ancestors(s).is_empty());
    }

    #[test]
    fn test_function_display() {
        let mut function = Function::new("foo");
        let mut a = Parameter::new("a");
        a.ty = "string".to_string();
        let mut b = Parameter::new("b");
        b.optional = true;
        b.default_value = Some(Literal::Number {
            raw: "5".to_string(),
            value: Some(5.0),
        });
        function.parameters = vec![a, b];

        assert_eq!(function.to_string(), "foo(a: string, b?: any = 5): void");
    }

    #[test]
    fn test_function_typed_parameter_display() {
        let mut err = Parameter::new("err");
        err.ty = "Error".to_string();
        let mut callback = Function::new("done");
        callback.parameters = vec![err];

        let mut done = Parameter::new("done");
        done.optional = true;
        done.ty = "function".to_string();
        done.lambda = Some(callback);

        assert_eq!(done.to_string(), "done?: (err: Error) => void");
    }

    #[test]
    fn test_literal_accessors() {
        let number = Literal::Number {
            raw: "1.5".to_string(),
            value: Some(1.5),
        };
        let string = Literal::String {
            raw: "\"x\"".to_string(),
        };
        assert_eq!(number.as_f64(), Some(1.5));
        assert_eq!(string.as_f64(), None);
        assert_eq!(string.raw(), "\"x\"");
    }
}

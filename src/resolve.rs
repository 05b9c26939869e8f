//! Second pass over `extends` clauses.
//!
//! The parser links a class only to superclasses it has already seen, so
//! `class B extends A` placed before `class A` records nothing. This pass
//! revisits those clauses once every class in the module is known.

use crate::model::Outline;
use crate::parser::SkipReason;

impl Outline {
    /// Link `extends` targets that were declared later in the same module.
    ///
    /// Resolved clauses are appended to the child's `extends` in source order
    /// and their skips are dropped. Targets in other modules, or not declared
    /// anywhere, stay unresolved. Returns the number of links added.
    pub fn resolve_forward_extends(&mut self) -> usize {
        let mut resolved = 0;
        let modules = &mut self.modules;

        self.skips.retain(|skip| {
            let SkipReason::UnresolvedExtends {
                module,
                class,
                target,
            } = &skip.reason
            else {
                return true;
            };
            let Some(module) = modules.iter_mut().find(|m| &m.name == module) else {
                return true;
            };
            match (module.class_ref(class), module.class_ref(target)) {
                (Some(child), Some(parent)) => {
                    module[child].extends.push(parent);
                    resolved += 1;
                    false
                }
                _ => true,
            }
        });

        resolved
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{parse, parse_with_options, ParseOptions, SkipReason};

    const FORWARD: &str = r#"
        declare module M {
            class B extends A { }
            class A { }
            class C extends Missing { }
        }
        declare module N {
            class D extends A { }
        }
    "#;

    #[test]
    fn test_single_pass_leaves_forward_extends_empty() {
        let outline = parse(FORWARD);
        let m = outline.module("M").unwrap();

        assert!(m.class("B").unwrap().extends.is_empty());
        assert_eq!(outline.skips.len(), 3);
    }

    #[test]
    fn test_resolve_links_later_classes_in_same_module() {
        let mut outline = parse(FORWARD);
        let resolved = outline.resolve_forward_extends();

        assert_eq!(resolved, 1);
        let m = outline.module("M").unwrap();
        let b = m.class_ref("B").unwrap();
        let names: Vec<_> = m.superclasses(b).map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);

        // Unknown and cross-module targets are still reported.
        let targets: Vec<_> = outline
            .skips
            .iter()
            .filter_map(|s| match &s.reason {
                SkipReason::UnresolvedExtends { target, .. } => Some(target.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec!["Missing", "A"]);
        assert!(outline.module("N").unwrap().class("D").unwrap().extends.is_empty());
    }

    #[test]
    fn test_option_runs_resolution() {
        let options = ParseOptions {
            resolve_forward_extends: true,
        };
        let outline = parse_with_options(FORWARD, &options);
        assert_eq!(outline.module("M").unwrap().class("B").unwrap().extends.len(), 1);
        assert_eq!(outline.skips.len(), 2);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut outline = parse(FORWARD);
        outline.resolve_forward_extends();
        assert_eq!(outline.resolve_forward_extends(), 0);
        assert_eq!(outline.module("M").unwrap().class("B").unwrap().extends.len(), 1);
    }
}

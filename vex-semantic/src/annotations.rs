//! Annotation Validator (C6): checks `@name(...)` tags against a fixed schema
//! of known annotations, their accepted parameter shapes, the AST contexts
//! they're legal on, and which other annotations they conflict with.
//!
//! This does not interpret what an annotation *means* downstream (an AI
//! annotation processor consumes that), only whether it is syntactically and
//! contextually well-formed here.

use bitflags::bitflags;
use std::collections::HashMap;
use std::sync::OnceLock;

use vex_ast::{Annotation, AnnotationValue};
use vex_diagnostics::{error_codes, Diagnostic, Span};

bitflags! {
    /// Which AST positions an annotation is legal on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AnnotationContext: u16 {
        const FUNCTION       = 0b0000_0001;
        const RETURN_TYPE    = 0b0000_0010;
        const PARAMETER      = 0b0000_0100;
        const STRUCT         = 0b0000_1000;
        const ENUM           = 0b0001_0000;
        const CONST          = 0b0010_0000;
        const STATEMENT      = 0b0100_0000;
        const EXPRESSION     = 0b1000_0000;
        /// Only valid when the target function/parameter/return type belongs
        /// to an `extern` declaration.
        const EXTERN_ONLY    = 0b0001_0000_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// No parameters: `@gpu_kernel`
    None,
    /// Exactly one positional parameter of any kind: `@unroll(4)`
    OnePositional,
    /// Any number of named-or-positional parameters: `@contract(min = 0, max = 100)`
    AnyNamed,
}

pub struct AnnotationSchema {
    pub name: &'static str,
    pub contexts: AnnotationContext,
    pub params: ParamShape,
    /// Names of annotations that may not co-occur with this one on the same target.
    pub conflicts_with: &'static [&'static str],
}

static SCHEMA: OnceLock<HashMap<&'static str, AnnotationSchema>> = OnceLock::new();

fn schema() -> &'static HashMap<&'static str, AnnotationSchema> {
    SCHEMA.get_or_init(|| {
        let entries = [
            AnnotationSchema {
                name: "gpu_kernel",
                contexts: AnnotationContext::FUNCTION,
                params: ParamShape::None,
                conflicts_with: &["inline"],
            },
            AnnotationSchema {
                name: "inline",
                contexts: AnnotationContext::FUNCTION,
                params: ParamShape::None,
                conflicts_with: &["gpu_kernel", "no_inline"],
            },
            AnnotationSchema {
                name: "no_inline",
                contexts: AnnotationContext::FUNCTION,
                params: ParamShape::None,
                conflicts_with: &["inline"],
            },
            AnnotationSchema {
                name: "deprecated",
                contexts: AnnotationContext::from_bits_truncate(
                    AnnotationContext::FUNCTION.bits()
                        | AnnotationContext::STRUCT.bits()
                        | AnnotationContext::ENUM.bits()
                        | AnnotationContext::CONST.bits(),
                ),
                params: ParamShape::AnyNamed,
                conflicts_with: &[],
            },
            AnnotationSchema {
                name: "repr",
                contexts: AnnotationContext::STRUCT,
                params: ParamShape::OnePositional,
                conflicts_with: &[],
            },
            AnnotationSchema {
                name: "unroll",
                contexts: AnnotationContext::STATEMENT,
                params: ParamShape::OnePositional,
                conflicts_with: &[],
            },
            AnnotationSchema {
                name: "nonnull",
                contexts: AnnotationContext::from_bits_truncate(
                    AnnotationContext::PARAMETER.bits() | AnnotationContext::RETURN_TYPE.bits(),
                ),
                params: ParamShape::None,
                conflicts_with: &[],
            },
            // FFI-transfer annotations: only meaningful on an extern
            // parameter or return type (spec rule: transfer annotations
            // require an extern target).
            AnnotationSchema {
                name: "transfer",
                contexts: AnnotationContext::from_bits_truncate(
                    AnnotationContext::PARAMETER.bits()
                        | AnnotationContext::RETURN_TYPE.bits()
                        | AnnotationContext::EXTERN_ONLY.bits(),
                ),
                params: ParamShape::OnePositional,
                conflicts_with: &[],
            },
        ];
        entries.into_iter().map(|e| (e.name, e)).collect()
    })
}

/// Facts about the target the annotation list was attached to, gathered by
/// the caller (declaration analyzer / walker) before validation.
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub context: AnnotationContext,
    pub is_extern: bool,
}

/// Validate one annotation against the schema, given what it's attached to.
/// Returns diagnostics; an empty vec means the annotation is well-formed.
pub fn validate(annotation: &Annotation, target: TargetInfo, span: Span) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let Some(entry) = schema().get(annotation.name.as_str()) else {
        diags.push(
            Diagnostic::warning(
                error_codes::NOT_IMPLEMENTED,
                format!("unknown annotation `@{}`", annotation.name),
                span.clone(),
            )
            .with_help("this annotation isn't recognized and will be ignored".to_string()),
        );
        return diags;
    };

    let requires_extern = entry.contexts.contains(AnnotationContext::EXTERN_ONLY);
    let allowed_contexts = entry.contexts & !AnnotationContext::EXTERN_ONLY;

    if !allowed_contexts.intersects(target.context) {
        diags.push(Diagnostic::error(
            error_codes::NOT_IMPLEMENTED,
            format!(
                "`@{}` is not valid in this position",
                annotation.name
            ),
            span.clone(),
        ));
    }

    if requires_extern && !target.is_extern {
        diags.push(
            Diagnostic::error(
                error_codes::NOT_IMPLEMENTED,
                format!(
                    "`@{}` is only valid on an extern parameter or return type",
                    annotation.name
                ),
                span.clone(),
            )
            .with_help("move this annotation onto a declaration inside an extern block".to_string()),
        );
    }

    match (entry.params, annotation.params.len()) {
        (ParamShape::None, 0) => {}
        (ParamShape::OnePositional, 1) if annotation.params[0].name.is_none() => {}
        (ParamShape::AnyNamed, _) => {}
        _ => diags.push(Diagnostic::error(
            error_codes::ARGUMENT_COUNT,
            format!(
                "`@{}` does not accept these parameters",
                annotation.name
            ),
            span,
        )),
    }

    diags
}

/// Validate an entire annotation list attached to one target, checking both
/// individual schemas and pairwise conflicts.
pub fn validate_all(annotations: &[Annotation], target: TargetInfo, span: Span) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for annotation in annotations {
        diags.extend(validate(annotation, target, span.clone()));
    }

    let names: Vec<&str> = annotations.iter().map(|a| a.name.as_str()).collect();
    for (i, name) in names.iter().enumerate() {
        let Some(entry) = schema().get(*name) else {
            continue;
        };
        for other in &names[i + 1..] {
            if entry.conflicts_with.contains(other) {
                diags.push(Diagnostic::error(
                    error_codes::CONFLICTING_IMPL,
                    format!("`@{name}` conflicts with `@{other}` on the same target"),
                    span.clone(),
                ));
            }
        }
    }

    diags
}

/// Helper for building an `AnnotationValue` literal in tests.
#[cfg(test)]
fn positional(value: AnnotationValue) -> vex_ast::AnnotationParam {
    vex_ast::AnnotationParam { name: None, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(name: &str, params: Vec<vex_ast::AnnotationParam>) -> Annotation {
        Annotation {
            name: name.to_string(),
            params,
            span_id: None,
        }
    }

    #[test]
    fn unknown_annotation_warns_but_does_not_error() {
        let a = annotation("made_up", vec![]);
        let diags = validate(
            &a,
            TargetInfo {
                context: AnnotationContext::FUNCTION,
                is_extern: false,
            },
            Span::unknown(),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].level, vex_diagnostics::ErrorLevel::Warning);
    }

    #[test]
    fn wrong_context_errors() {
        let a = annotation("gpu_kernel", vec![]);
        let diags = validate(
            &a,
            TargetInfo {
                context: AnnotationContext::STRUCT,
                is_extern: false,
            },
            Span::unknown(),
        );
        assert!(!diags.is_empty());
    }

    #[test]
    fn transfer_requires_extern_target() {
        let a = annotation("transfer", vec![positional(AnnotationValue::Ident("full".into()))]);
        let diags = validate(
            &a,
            TargetInfo {
                context: AnnotationContext::PARAMETER,
                is_extern: false,
            },
            Span::unknown(),
        );
        assert!(diags.iter().any(|d| d.message.contains("extern")));
    }

    #[test]
    fn transfer_on_extern_parameter_is_clean() {
        let a = annotation("transfer", vec![positional(AnnotationValue::Ident("full".into()))]);
        let diags = validate(
            &a,
            TargetInfo {
                context: AnnotationContext::PARAMETER,
                is_extern: true,
            },
            Span::unknown(),
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn conflicting_annotations_on_the_same_target_error() {
        let anns = vec![annotation("inline", vec![]), annotation("gpu_kernel", vec![])];
        let diags = validate_all(
            &anns,
            TargetInfo {
                context: AnnotationContext::FUNCTION,
                is_extern: false,
            },
            Span::unknown(),
        );
        assert!(diags
            .iter()
            .any(|d| d.code == error_codes::CONFLICTING_IMPL));
    }
}

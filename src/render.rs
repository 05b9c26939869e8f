//! Text and JSON renderings of an [`Outline`].

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, WriteColor};
use thiserror::Error;

use crate::model::{AccessorType, Class, Function, Module, Outline, Property};

/// Errors that can occur while writing an outline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write outline: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize outline: {0}")]
    Json(#[from] serde_json::Error),
}

fn keyword_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Magenta));
    spec
}

fn name_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Cyan)).set_bold(true);
    spec
}

fn type_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Green));
    spec
}

fn write_styled<W: WriteColor>(out: &mut W, spec: &ColorSpec, text: &str) -> io::Result<()> {
    out.set_color(spec)?;
    write!(out, "{text}")?;
    out.reset()
}

/// `(a: string, b?: number) => void`
pub fn lambda_signature(lambda: &Function) -> String {
    let params: Vec<String> = lambda.parameters.iter().map(|p| p.to_string()).collect();
    format!("({}) => {}", params.join(", "), lambda.return_type)
}

fn write_modifiers<W: WriteColor>(
    out: &mut W,
    is_static: bool,
    accessor: AccessorType,
) -> io::Result<()> {
    if is_static {
        write_styled(out, &keyword_spec(), "static")?;
        write!(out, " ")?;
    }
    if accessor != AccessorType::Public {
        write_styled(out, &keyword_spec(), &accessor.to_string())?;
        write!(out, " ")?;
    }
    Ok(())
}

fn write_property<W: WriteColor>(out: &mut W, property: &Property) -> io::Result<()> {
    write!(out, "  ")?;
    write_modifiers(out, property.is_static, property.accessor)?;
    write!(out, "{}", property.name)?;
    if property.optional {
        write!(out, "?")?;
    }
    write!(out, ": ")?;
    match &property.lambda {
        Some(lambda) => write_styled(out, &type_spec(), &lambda_signature(lambda))?,
        None => write_styled(out, &type_spec(), &property.ty)?,
    }
    if let Some(value) = &property.value {
        write!(out, " = {value}")?;
    }
    writeln!(out)
}

fn write_function<W: WriteColor>(out: &mut W, function: &Function) -> io::Result<()> {
    write!(out, "  ")?;
    write_modifiers(out, function.is_static, function.accessor)?;
    let params: Vec<String> = function.parameters.iter().map(|p| p.to_string()).collect();
    write!(out, "{}({}): ", function.name, params.join(", "))?;
    write_styled(out, &type_spec(), &function.return_type)?;
    writeln!(out)
}

fn write_class<W: WriteColor>(out: &mut W, module: &Module, class: &Class) -> io::Result<()> {
    if class.exported {
        write_styled(out, &keyword_spec(), "export")?;
        write!(out, " ")?;
    }
    write_styled(out, &keyword_spec(), "class")?;
    write!(out, " ")?;
    write_styled(out, &name_spec(), &class.name)?;
    if !class.extends.is_empty() {
        let parents: Vec<&str> = class
            .extends
            .iter()
            .filter_map(|r| module.get(*r))
            .map(|c| c.name.as_str())
            .collect();
        write!(out, " ")?;
        write_styled(out, &keyword_spec(), "extends")?;
        write!(out, " {}", parents.join(", "))?;
    }
    writeln!(out)?;

    for property in &class.properties {
        write_property(out, property)?;
    }
    for function in &class.functions {
        write_function(out, function)?;
    }
    Ok(())
}

/// Write one line per module, class and member.
pub fn render_text<W: WriteColor>(out: &mut W, outline: &Outline) -> Result<(), RenderError> {
    for module in &outline.modules {
        write_styled(out, &keyword_spec(), "module")?;
        write!(out, " ")?;
        write_styled(out, &name_spec(), &module.name)?;
        writeln!(out)?;
        for class in &module.classes {
            write_class(out, module, class)?;
        }
    }
    Ok(())
}

/// Write one line per skip record.
pub fn render_skips<W: WriteColor>(out: &mut W, outline: &Outline) -> Result<(), RenderError> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Yellow));
    for skip in &outline.skips {
        write_styled(out, &spec, "skipped")?;
        writeln!(out, ": {skip}")?;
    }
    Ok(())
}

pub fn render_json<W: Write>(mut out: W, outline: &Outline, pretty: bool) -> Result<(), RenderError> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, outline)?;
    } else {
        serde_json::to_writer(&mut out, outline)?;
    }
    writeln!(out)?;
    Ok(())
}

//! Minimal CLI: convert tokens against an annotation, or describe one.
use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::descriptor;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// convert raw argument tokens into typed values, or inspect a type annotation
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// convert one or more tokens, optionally against a type annotation
    Convert(ConvertTokens),
    /// resolve a type annotation and print its canonical descriptor
    Describe(DescribeAnnotation),
}

#[derive(Args, Debug, Clone)]
struct ConvertTokens {
    /// type annotation for the parameter (e.g. 'dict<str, int | none>')
    #[arg(long = "type", short = 't', value_name = "ANNOT")]
    annot: Option<String>,

    /// raw argument tokens, one conversion each
    #[arg(num_args = 1.., required = true, allow_hyphen_values = true)]
    token: Vec<String>,

    /// one line of JSON per token instead of pretty-printed output
    #[arg(long)]
    compact: bool,

    /// wrap each result in a {token, value} report object
    #[arg(long)]
    report: bool,
}

#[derive(Args, Debug, Clone)]
struct DescribeAnnotation {
    /// type annotation to resolve
    annot: String,

    /// also print the descriptor tree
    #[arg(long)]
    tree: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
struct TokenReport<'a> {
    token: &'a str,
    value: &'a crate::value::Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Convert(target) => {
                // resolve once per parameter, convert once per token
                let ty = match target.annot.as_deref() {
                    Some(annot) => Some(
                        descriptor::resolve(annot)
                            .with_context(|| format!("bad type annotation `{annot}`"))?,
                    ),
                    None => None,
                };
                for raw in &target.token {
                    let value = crate::convert_arg(ty.as_ref(), raw)?;
                    let rendered = if target.report {
                        let report = TokenReport { token: raw, value: &value };
                        render_json(&report, target.compact)?
                    } else {
                        render_json(&value, target.compact)?
                    };
                    println!("{rendered}");
                }
                Ok(())
            }
            Command::Describe(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let ty = descriptor::resolve(&target.annot)
                    .with_context(|| format!("bad type annotation `{}`", target.annot))?;
                println!("{ty}");
                if target.tree {
                    println!("{ty:#?}");
                }
                Ok(())
            }
        }
    }
}

fn render_json<T: serde::Serialize>(value: &T, compact: bool) -> anyhow::Result<String> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(rendered)
}

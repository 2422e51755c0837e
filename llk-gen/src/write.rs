// Human-readable dumps of built tables.

use crate::ladfa::{Else, LaDfaNode};
use crate::tables::Tables;
use llk::TokenId;
use std::io::{self, Write};

fn token<'a>(tables: &'a Tables, t: TokenId) -> &'a str {
    tables.tokens.get(t).map_or("?", |t| t.as_str())
}

/// Writes the FIRST and FOLLOW sets of every symbol.
///
/// # Output Format
/// ```text
/// FIRST,<symbol>,{`empty', <token>, ...}
/// FOLLOW,<symbol>,{<token>, ...}
/// ```
pub fn write_first_follow<W: Write>(out: &mut W, tables: &Tables) -> io::Result<()> {
    for (s, name) in tables.symbols.iter().enumerate() {
        write!(out, "FIRST,{},{{", name)?;
        if tables.nullable[s] {
            write!(out, "`empty', ")?;
        }
        for &t in &tables.first[s] {
            write!(out, "{}, ", token(tables, t))?;
        }
        writeln!(out, "}}")?;
    }
    writeln!(out)?;
    for (s, name) in tables.symbols.iter().enumerate() {
        write!(out, "FOLLOW,{},{{", name)?;
        for &t in &tables.follow[s] {
            write!(out, "{}, ", token(tables, t))?;
        }
        writeln!(out, "}}")?;
    }
    Ok(())
}

/// Writes the non-empty parse table entries.
///
/// # Output Format
/// ```text
/// T,<symbol>,<token>,<production or LaDfa(root)>
/// ```
pub fn write_table<W: Write>(out: &mut W, tables: &Tables) -> io::Result<()> {
    for (s, name) in tables.symbols.iter().enumerate() {
        for t in 0..tables.n_tokens() {
            if let Some(node) = tables.entry(s, t) {
                writeln!(out, "T,{},{},{}", name, token(tables, t), tables.describe(node))?;
            }
        }
    }
    Ok(())
}

/// Writes every lookahead-DFA node.
///
/// # Output Format
/// ```text
/// D,<id>,leaf,<production>
/// D,<id>,switch,<token>:<id> ...,default=<production>
/// D,<id>,resolve,<resolver>,priority=<n>,then=<production>,else=<target>
/// ```
pub fn write_dfas<W: Write>(out: &mut W, tables: &Tables) -> io::Result<()> {
    writeln!(out, "DS,{}", tables.dfas.len())?;
    for (d, node) in tables.dfas.iter().enumerate() {
        write!(out, "D,{},", d)?;
        match node {
            LaDfaNode::Leaf { production } => {
                writeln!(out, "leaf,{}", tables.describe(*production))?;
            }
            LaDfaNode::Internal {
                transitions,
                default,
            } => {
                write!(out, "switch,")?;
                for (t, next) in transitions {
                    write!(out, "{}:{} ", token(tables, *t), next)?;
                }
                match default {
                    Some(p) => writeln!(out, ",default={}", tables.describe(*p))?,
                    None => writeln!(out, ",default=")?,
                }
            }
            LaDfaNode::Resolver {
                resolver,
                priority,
                then,
                otherwise,
            } => {
                write!(
                    out,
                    "resolve,{},priority={},then={},else=",
                    tables.describe(*resolver),
                    priority,
                    tables.describe(*then)
                )?;
                match otherwise {
                    Some(Else::Dfa(next)) => writeln!(out, "D{}", next)?,
                    Some(Else::Production(p)) => writeln!(out, "{}", tables.describe(*p))?,
                    None => writeln!(out)?,
                }
            }
        }
    }
    Ok(())
}

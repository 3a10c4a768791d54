//! nom grammar for the OpenQASM 2.0 subset.
//!
//! Gate bodies in `gate` definitions are skipped: the interaction
//! extractor only sees gate *calls*, and the standard library gates are
//! built in.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace1};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

use crate::ast::{Argument, QasmProgram, Statement};
use crate::error::{QasmError, Result};

/// A parsed top-level item; includes and opaque declarations parse but
/// carry nothing.
#[derive(Clone)]
enum Item {
    Stmt(Statement),
    Skip,
}

fn comment(i: &str) -> IResult<&str, ()> {
    value((), pair(tag("//"), take_while(|c| c != '\n')))(i)
}

fn ws(i: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), comment))))(i)
}

fn ident(i: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        str::to_string,
    )(i)
}

fn integer(i: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse)(i)
}

fn bracketed_index(i: &str) -> IResult<&str, usize> {
    delimited(
        pair(char('['), ws),
        integer,
        pair(ws, char(']')),
    )(i)
}

fn argument(i: &str) -> IResult<&str, Argument> {
    map(
        pair(ident, opt(preceded(ws, bracketed_index))),
        |(name, idx)| match idx {
            Some(idx) => Argument::Indexed(name, idx),
            None => Argument::Whole(name),
        },
    )(i)
}

fn argument_list(i: &str) -> IResult<&str, Vec<Argument>> {
    separated_list1(tuple((ws, char(','), ws)), argument)(i)
}

/// Parameter expressions (`pi/2`, `0.3`, `-theta`) are kept as raw text;
/// the extractor never evaluates them.
fn param_raw(i: &str) -> IResult<&str, String> {
    map(take_while1(|c: char| c != ',' && c != ')'), |s: &str| {
        s.trim().to_string()
    })(i)
}

fn param_list(i: &str) -> IResult<&str, Vec<String>> {
    delimited(
        char('('),
        separated_list1(char(','), param_raw),
        char(')'),
    )(i)
}

fn version_decl(i: &str) -> IResult<&str, String> {
    delimited(
        tuple((ws, tag("OPENQASM"), ws)),
        map(
            recognize(tuple((digit1, char('.'), digit1))),
            str::to_string,
        ),
        tuple((ws, char(';'))),
    )(i)
}

fn reg_decl(i: &str) -> IResult<&str, Item> {
    map(
        tuple((
            alt((tag("qreg"), tag("creg"))),
            ws,
            ident,
            ws,
            bracketed_index,
            ws,
            char(';'),
        )),
        |(kind, _, name, _, size, _, _)| {
            Item::Stmt(if kind == "qreg" {
                Statement::QReg { name, size }
            } else {
                Statement::CReg { name, size }
            })
        },
    )(i)
}

fn gate_def(i: &str) -> IResult<&str, Item> {
    map(
        tuple((
            tag("gate"),
            ws,
            ident,
            take_while(|c| c != '{'),
            char('{'),
            take_while(|c| c != '}'),
            char('}'),
        )),
        |(_, _, name, _, _, _, _)| Item::Stmt(Statement::GateDef { name }),
    )(i)
}

fn opaque_decl(i: &str) -> IResult<&str, Item> {
    value(
        Item::Skip,
        tuple((tag("opaque"), take_while(|c| c != ';'), char(';'))),
    )(i)
}

fn include_decl(i: &str) -> IResult<&str, Item> {
    value(
        Item::Skip,
        tuple((
            tag("include"),
            ws,
            char('"'),
            take_while(|c| c != '"'),
            char('"'),
            ws,
            char(';'),
        )),
    )(i)
}

fn measure_stmt(i: &str) -> IResult<&str, Item> {
    map(
        tuple((
            tag("measure"),
            ws,
            argument,
            ws,
            tag("->"),
            ws,
            argument,
            ws,
            char(';'),
        )),
        |(_, _, qubit, _, _, _, target, _, _)| Item::Stmt(Statement::Measure { qubit, target }),
    )(i)
}

fn reset_stmt(i: &str) -> IResult<&str, Item> {
    map(
        tuple((tag("reset"), ws, argument, ws, char(';'))),
        |(_, _, qubit, _, _)| Item::Stmt(Statement::Reset { qubit }),
    )(i)
}

fn barrier_stmt(i: &str) -> IResult<&str, Item> {
    map(
        tuple((tag("barrier"), ws, argument_list, ws, char(';'))),
        |(_, _, args, _, _)| Item::Stmt(Statement::Barrier { args }),
    )(i)
}

/// Classical conditions are dropped: the guarded interaction still has to
/// be routed.
fn if_stmt(i: &str) -> IResult<&str, Item> {
    preceded(
        tuple((
            tag("if"),
            ws,
            char('('),
            ws,
            ident,
            ws,
            tag("=="),
            ws,
            integer,
            ws,
            char(')'),
            ws,
        )),
        item,
    )(i)
}

fn gate_call(i: &str) -> IResult<&str, Item> {
    map(
        tuple((
            ident,
            ws,
            opt(param_list),
            ws,
            argument_list,
            ws,
            char(';'),
        )),
        |(name, _, params, _, args, _, _)| {
            Item::Stmt(Statement::GateCall {
                name,
                params: params.unwrap_or_default(),
                args,
            })
        },
    )(i)
}

fn item(i: &str) -> IResult<&str, Item> {
    preceded(
        ws,
        alt((
            reg_decl,
            gate_def,
            opaque_decl,
            include_decl,
            measure_stmt,
            reset_stmt,
            barrier_stmt,
            if_stmt,
            gate_call, // last: it matches any identifier
        )),
    )(i)
}

/// Parses a full source file.
pub fn parse_qasm_str(input: &str) -> Result<QasmProgram> {
    let (rest, version) =
        opt(version_decl)(input).map_err(|e| QasmError::Parse(e.to_string()))?;
    let (rest, items) = many0(item)(rest).map_err(|e| QasmError::Parse(e.to_string()))?;
    let rest = ws(rest).map(|(i, _)| i).unwrap_or(rest);
    if !rest.is_empty() {
        return Err(QasmError::Parse(format!(
            "unparsed input near: {}",
            rest.chars().take(40).collect::<String>()
        )));
    }

    Ok(QasmProgram {
        version,
        statements: items
            .into_iter()
            .filter_map(|item| match item {
                Item::Stmt(stmt) => Some(stmt),
                Item::Skip => None,
            })
            .collect(),
    })
}

//! The SQL+fn front-end is an external collaborator (spec Non-goals: "SQL
//! standards conformance" is out of scope). `SourceParser` is the seam;
//! `MiniParser` is a hand-rolled recognizer for exactly the surface spec §8's
//! literal scenarios exercise — not a general grammar.

use tablet_irgen::{BinOp, ConstValue, Expr, FnDef, IfStmt, IrType, Param, Stmt, UnaryOp};

use crate::error::SqlError;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Column(String),
    Call { name: String, args: Vec<SelectItem> },
    WindowedAgg { agg: String, column: String, window: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WherePred {
    pub column: String,
    pub op: CmpOp,
    pub literal: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub name: String,
    pub partition_by: String,
    pub order_by: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub table: String,
    pub select: Vec<SelectItem>,
    pub filter: Option<WherePred>,
    pub window: Option<WindowSpec>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSource {
    pub fn_defs: Vec<FnDef>,
    pub query: Option<ParsedQuery>,
}

pub trait SourceParser: Send + Sync {
    fn parse(&self, src: &str) -> Result<ParsedSource, SqlError>;
}

#[derive(Default)]
pub struct MiniParser;

impl SourceParser for MiniParser {
    fn parse(&self, src: &str) -> Result<ParsedSource, SqlError> {
        let (fn_src, sql_src) = match src.find("%%sql") {
            Some(at) => {
                let fn_part = src[..at].trim().strip_prefix("%%fun").unwrap_or(&src[..at]).trim();
                (Some(fn_part), src[at + "%%sql".len()..].trim())
            }
            None => (None, src.trim()),
        };

        let fn_defs = match fn_src {
            Some(s) if !s.is_empty() => parse_fn_defs(s)?,
            _ => Vec::new(),
        };
        let query = if sql_src.is_empty() { None } else { Some(parse_query(sql_src)?) };
        Ok(ParsedSource { fn_defs, query })
    }
}

fn tokenize(src: &str) -> Vec<String> {
    let mut toks = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphabetic() || c == '_' {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    s.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            toks.push(s);
        } else if c.is_ascii_digit() {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() || c == '.' {
                    s.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            toks.push(s);
        } else if "()+-*/,:=!<>".contains(c) {
            // Two-char operators first.
            chars.next();
            if let Some(&next) = chars.peek() {
                if (c == '!' || c == '<' || c == '>' || c == '=') && next == '=' {
                    chars.next();
                    toks.push(format!("{c}{next}"));
                    continue;
                }
            }
            toks.push(c.to_string());
        } else if c == '\'' || c == '"' {
            let quote = c;
            chars.next();
            let mut s = String::new();
            for c in chars.by_ref() {
                if c == quote {
                    break;
                }
                s.push(c);
            }
            toks.push(format!("\"{s}\""));
        } else {
            chars.next();
        }
    }
    toks
}

struct TokStream {
    toks: Vec<String>,
    pos: usize,
}

impl TokStream {
    fn peek(&self) -> Option<&str> {
        self.toks.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let t = self.toks.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: &'static str) -> Result<(), SqlError> {
        match self.next() {
            Some(t) if t.eq_ignore_ascii_case(want) => Ok(()),
            Some(t) => Err(SqlError::UnexpectedToken { found: t, expected: want }),
            None => Err(SqlError::UnexpectedEof(want)),
        }
    }

    fn eat(&mut self, want: &str) -> bool {
        if self.peek().is_some_and(|t| t.eq_ignore_ascii_case(want)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, SqlError> {
        self.next().ok_or(SqlError::UnexpectedEof("identifier"))
    }
}

fn parse_query(src: &str) -> Result<ParsedQuery, SqlError> {
    let mut ts = TokStream { toks: tokenize(src), pos: 0 };
    ts.expect("SELECT")?;
    let mut select = Vec::new();
    loop {
        select.push(parse_select_item(&mut ts)?);
        if !ts.eat(",") {
            break;
        }
    }
    ts.expect("FROM")?;
    let table = ts.ident()?;

    let mut filter = None;
    if ts.eat("WHERE") {
        let column = ts.ident()?;
        let op_tok = ts.next().ok_or(SqlError::UnexpectedEof("comparison operator"))?;
        let op = match op_tok.as_str() {
            "=" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::Le,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::Ge,
            other => return Err(SqlError::UnexpectedToken { found: other.to_string(), expected: "comparison operator" }),
        };
        let literal = parse_literal(&mut ts)?;
        filter = Some(WherePred { column, op, literal });
    }

    let mut window = None;
    if ts.eat("WINDOW") {
        let name = ts.ident()?;
        ts.expect("AS")?;
        ts.expect("(")?;
        ts.expect("PARTITION")?;
        ts.expect("BY")?;
        let partition_by = ts.ident()?;
        ts.expect("ORDER")?;
        ts.expect("BY")?;
        let order_by = ts.ident()?;
        ts.expect(")")?;
        window = Some(WindowSpec { name, partition_by, order_by });
    }

    let mut limit = None;
    if ts.eat("LIMIT") {
        let n = ts.next().ok_or(SqlError::UnexpectedEof("limit count"))?;
        limit = Some(n.parse().map_err(|_| SqlError::BadLiteral(n))?);
    }

    Ok(ParsedQuery { table, select, filter, window, limit })
}

fn parse_select_item(ts: &mut TokStream) -> Result<SelectItem, SqlError> {
    let name = ts.ident()?;
    if ts.eat("(") {
        let mut args = Vec::new();
        if ts.peek() != Some(")") {
            loop {
                args.push(parse_select_item(ts)?);
                if !ts.eat(",") {
                    break;
                }
            }
        }
        ts.expect(")")?;
        if ts.eat("OVER") {
            let window = ts.ident()?;
            let column = match args.into_iter().next() {
                Some(SelectItem::Column(c)) => c,
                _ => return Err(SqlError::UnexpectedToken { found: "<expr>".to_string(), expected: "a bare column in an OVER aggregate" }),
            };
            return Ok(SelectItem::WindowedAgg { agg: name, column, window });
        }
        return Ok(SelectItem::Call { name, args });
    }
    Ok(SelectItem::Column(name))
}

fn parse_literal(ts: &mut TokStream) -> Result<Literal, SqlError> {
    let t = ts.next().ok_or(SqlError::UnexpectedEof("literal"))?;
    if let Some(s) = t.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(Literal::Str(s.to_string()));
    }
    if t.contains('.') {
        t.parse::<f64>().map(Literal::Float).map_err(|_| SqlError::BadLiteral(t))
    } else {
        t.parse::<i64>().map(Literal::Int).map_err(|_| SqlError::BadLiteral(t))
    }
}

// --- %%fun body parsing -----------------------------------------------

fn parse_fn_defs(src: &str) -> Result<Vec<FnDef>, SqlError> {
    let mut ts = TokStream { toks: tokenize(src), pos: 0 };
    let mut defs = Vec::new();
    while ts.peek().is_some() {
        defs.push(parse_fn_def(&mut ts)?);
    }
    Ok(defs)
}

fn parse_ty(name: &str) -> Result<IrType, SqlError> {
    Ok(match name {
        "bool" => IrType::Bool,
        "i16" => IrType::I16,
        "i32" => IrType::I32,
        "i64" => IrType::I64,
        "f32" => IrType::F32,
        "f64" => IrType::F64,
        other => return Err(SqlError::BadLiteral(other.to_string())),
    })
}

fn parse_fn_def(ts: &mut TokStream) -> Result<FnDef, SqlError> {
    ts.expect("def")?;
    let name = ts.ident()?;
    ts.expect("(")?;
    let mut params = Vec::new();
    if ts.peek() != Some(")") {
        loop {
            let pname = ts.ident()?;
            ts.expect(":")?;
            let ty = parse_ty(&ts.ident()?)?;
            params.push(Param { name: pname, ty });
            if !ts.eat(",") {
                break;
            }
        }
    }
    ts.expect(")")?;
    ts.expect(":")?;
    let ret = parse_ty(&ts.ident()?)?;
    let body = parse_stmts(ts, &["end"])?;
    ts.expect("end")?;
    Ok(FnDef { name, params, ret, body })
}

fn parse_stmts(ts: &mut TokStream, terminators: &[&str]) -> Result<Vec<Stmt>, SqlError> {
    let mut stmts = Vec::new();
    loop {
        match ts.peek() {
            Some(t) if terminators.iter().any(|term| t.eq_ignore_ascii_case(term)) => break,
            None => break,
            _ => {}
        }
        stmts.push(parse_stmt(ts)?);
    }
    Ok(stmts)
}

fn parse_stmt(ts: &mut TokStream) -> Result<Stmt, SqlError> {
    if ts.eat("return") {
        return Ok(Stmt::Return(parse_expr(ts)?));
    }
    if ts.eat("if") {
        return parse_if(ts);
    }
    if ts.eat("for") {
        let var = ts.ident()?;
        ts.expect("in")?;
        let iterable = parse_expr(ts)?;
        let body = parse_stmts(ts, &["end"])?;
        ts.expect("end")?;
        return Ok(Stmt::ForIn { var, iterable, body });
    }
    let name = ts.ident()?;
    ts.expect("=")?;
    let expr = parse_expr(ts)?;
    Ok(Stmt::Assign { name, expr })
}

fn parse_if(ts: &mut TokStream) -> Result<Stmt, SqlError> {
    let cond = parse_expr(ts)?;
    let body = parse_stmts(ts, &["elif", "else", "end"])?;
    let mut elifs = Vec::new();
    while ts.eat("elif") {
        let econd = parse_expr(ts)?;
        let ebody = parse_stmts(ts, &["elif", "else", "end"])?;
        elifs.push((econd, ebody));
    }
    let else_body = if ts.eat("else") { Some(parse_stmts(ts, &["end"])?) } else { None };
    ts.expect("end")?;
    Ok(Stmt::If(IfStmt { cond, body, elifs, else_body }))
}

fn parse_expr(ts: &mut TokStream) -> Result<Expr, SqlError> {
    parse_cmp(ts)
}

fn parse_cmp(ts: &mut TokStream) -> Result<Expr, SqlError> {
    let lhs = parse_add(ts)?;
    let op = match ts.peek() {
        Some("=") => Some(BinOp::Eq),
        Some("!=") => Some(BinOp::Ne),
        Some("<") => Some(BinOp::Lt),
        Some("<=") => Some(BinOp::Le),
        Some(">") => Some(BinOp::Gt),
        Some(">=") => Some(BinOp::Ge),
        _ => None,
    };
    if let Some(op) = op {
        ts.next();
        let rhs = parse_add(ts)?;
        return Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) });
    }
    Ok(lhs)
}

fn parse_add(ts: &mut TokStream) -> Result<Expr, SqlError> {
    let mut lhs = parse_mul(ts)?;
    loop {
        let op = match ts.peek() {
            Some("+") => BinOp::Add,
            Some("-") => BinOp::Sub,
            _ => break,
        };
        ts.next();
        let rhs = parse_mul(ts)?;
        lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
    }
    Ok(lhs)
}

fn parse_mul(ts: &mut TokStream) -> Result<Expr, SqlError> {
    let mut lhs = parse_unary(ts)?;
    loop {
        let op = match ts.peek() {
            Some("*") => BinOp::Mul,
            Some("/") => BinOp::Div,
            _ => break,
        };
        ts.next();
        let rhs = parse_unary(ts)?;
        lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
    }
    Ok(lhs)
}

fn parse_unary(ts: &mut TokStream) -> Result<Expr, SqlError> {
    if ts.eat("-") {
        return Ok(Expr::Unary { op: UnaryOp::Neg, expr: Box::new(parse_unary(ts)?) });
    }
    if ts.eat("not") {
        return Ok(Expr::Unary { op: UnaryOp::Not, expr: Box::new(parse_unary(ts)?) });
    }
    parse_atom(ts)
}

fn parse_atom(ts: &mut TokStream) -> Result<Expr, SqlError> {
    if ts.eat("(") {
        let e = parse_expr(ts)?;
        ts.expect(")")?;
        return Ok(e);
    }
    let t = ts.next().ok_or(SqlError::UnexpectedEof("expression"))?;
    if t.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Ok(Expr::Const(if t.contains('.') {
            ConstValue::F64(t.parse().map_err(|_| SqlError::BadLiteral(t.clone()))?)
        } else {
            ConstValue::I32(t.parse().map_err(|_| SqlError::BadLiteral(t.clone()))?)
        }));
    }
    if t.eq_ignore_ascii_case("true") {
        return Ok(Expr::Const(ConstValue::Bool(true)));
    }
    if t.eq_ignore_ascii_case("false") {
        return Ok(Expr::Const(ConstValue::Bool(false)));
    }
    if ts.eat("(") {
        let mut args = Vec::new();
        if ts.peek() != Some(")") {
            loop {
                args.push(parse_expr(ts)?);
                if !ts.eat(",") {
                    break;
                }
            }
        }
        ts.expect(")")?;
        return Ok(Expr::Call { name: t, args });
    }
    Ok(Expr::Ident(t))
}

// src/query/parse.rs

use crate::error::DafError;
use crate::query::registry::{ParamMap, ParamValue};

/// What a query starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Scalar(String),
    Vector { axis: String, name: String },
    Matrix { rows: String, cols: String, name: String },
    Axis(String),
}

/// One pipeline stage applied to the running value.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Project along an axis: keep a single entry.
    At { args: Vec<String> },
    /// Subset by a list of axis entries.
    Slice { args: Vec<String> },
    /// Subset by a boolean vector stored in the dataset.
    Mask { args: Vec<String> },
    /// A registered element-wise or reduction operation.
    Op { name: String, params: ParamMap },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub selection: Selection,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Open,
    Close,
    Comma,
    Pipe,
    Equals,
}

fn parse_error(message: impl Into<String>, query: &str) -> DafError {
    DafError::QueryParse {
        message: message.into(),
        query: query.to_string(),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, DafError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equals);
            }
            '\'' => {
                chars.next();
                let mut word = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(parse_error("unterminated quoted string", text)),
                    }
                }
                tokens.push(Token::Word(word));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || "(),|='".contains(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    query: &'a str,
    tokens: Vec<Token>,
    at: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.at).cloned();
        if token.is_some() {
            self.at += 1;
        }
        token
    }

    fn expect_word(&mut self, what: &str) -> Result<String, DafError> {
        match self.next() {
            Some(Token::Word(word)) => Ok(word),
            _ => Err(parse_error(format!("expected {}", what), self.query)),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), DafError> {
        match self.next() {
            Some(found) if found == token => Ok(()),
            _ => Err(parse_error(format!("expected {}", what), self.query)),
        }
    }

    /// Parses a parenthesized, comma-separated list of words.
    fn word_list(&mut self) -> Result<Vec<String>, DafError> {
        self.expect(Token::Open, "'('")?;
        let mut words = Vec::new();
        loop {
            words.push(self.expect_word("a name")?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => break,
                _ => return Err(parse_error("expected ',' or ')'", self.query)),
            }
        }
        Ok(words)
    }

    fn selection(&mut self) -> Result<Selection, DafError> {
        let keyword = self.expect_word("a selection")?;
        match keyword.as_str() {
            "scalar" => {
                let args = self.word_list()?;
                match args.as_slice() {
                    [name] => Ok(Selection::Scalar(name.clone())),
                    _ => Err(parse_error("scalar(...) takes one name", self.query)),
                }
            }
            "vec" => {
                let args = self.word_list()?;
                match args.as_slice() {
                    [axis, name] => Ok(Selection::Vector {
                        axis: axis.clone(),
                        name: name.clone(),
                    }),
                    _ => Err(parse_error("vec(...) takes an axis and a name", self.query)),
                }
            }
            "mat" => {
                let args = self.word_list()?;
                match args.as_slice() {
                    [rows, cols, name] => Ok(Selection::Matrix {
                        rows: rows.clone(),
                        cols: cols.clone(),
                        name: name.clone(),
                    }),
                    _ => Err(parse_error(
                        "mat(...) takes a rows axis, a columns axis and a name",
                        self.query,
                    )),
                }
            }
            "axis" => {
                let args = self.word_list()?;
                match args.as_slice() {
                    [name] => Ok(Selection::Axis(name.clone())),
                    _ => Err(parse_error("axis(...) takes one name", self.query)),
                }
            }
            other => Err(parse_error(
                format!("unknown selection: {}", other),
                self.query,
            )),
        }
    }

    fn param_value(&mut self) -> Result<ParamValue, DafError> {
        let word = self.expect_word("a parameter value")?;
        if word == "true" {
            return Ok(ParamValue::Bool(true));
        }
        if word == "false" {
            return Ok(ParamValue::Bool(false));
        }
        if let Ok(number) = word.parse::<f64>() {
            return Ok(ParamValue::Number(number));
        }
        Ok(ParamValue::Str(word))
    }

    fn op_params(&mut self, op: &str) -> Result<ParamMap, DafError> {
        let mut params = ParamMap::new();
        if self.peek() != Some(&Token::Open) {
            return Ok(params);
        }
        self.next();
        loop {
            let name = self.expect_word("a parameter name")?;
            self.expect(Token::Equals, "'='")?;
            let value = self.param_value()?;
            if params.insert(name.clone(), value).is_some() {
                return Err(parse_error(
                    format!("duplicate parameter: {} of the operation: {}", name, op),
                    self.query,
                ));
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => break,
                _ => return Err(parse_error("expected ',' or ')'", self.query)),
            }
        }
        Ok(params)
    }

    fn stage(&mut self) -> Result<Stage, DafError> {
        let keyword = self.expect_word("a stage")?;
        match keyword.as_str() {
            "at" => Ok(Stage::At {
                args: self.word_list()?,
            }),
            "slice" => Ok(Stage::Slice {
                args: self.word_list()?,
            }),
            "mask" => Ok(Stage::Mask {
                args: self.word_list()?,
            }),
            name => Ok(Stage::Op {
                params: self.op_params(name)?,
                name: name.to_string(),
            }),
        }
    }
}

/// Parses a query: a selection followed by pipe-separated stages, e.g.
/// `vec(cell, age) | Abs | Sum` or `mat(cell, gene, umis) | slice(cell, c0, c2) | Mean`.
pub fn parse_query(text: &str) -> Result<Query, DafError> {
    let mut parser = Parser {
        query: text,
        tokens: tokenize(text)?,
        at: 0,
    };
    let selection = parser.selection()?;
    let mut stages = Vec::new();
    loop {
        match parser.next() {
            None => break,
            Some(Token::Pipe) => stages.push(parser.stage()?),
            Some(_) => return Err(parse_error("expected '|' between stages", text)),
        }
    }
    Ok(Query { selection, stages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_selection_with_op() {
        let query = parse_query("vec(cell, signed) | Abs").unwrap();
        assert_eq!(
            query.selection,
            Selection::Vector {
                axis: "cell".to_string(),
                name: "signed".to_string(),
            }
        );
        assert_eq!(query.stages.len(), 1);
        match &query.stages[0] {
            Stage::Op { name, params } => {
                assert_eq!(name, "Abs");
                assert!(params.is_empty());
            }
            other => panic!("unexpected stage: {:?}", other),
        }
    }

    #[test]
    fn test_parse_op_params() {
        let query = parse_query("vec(cell, age) | Clamp(min=0, max=9.5)").unwrap();
        match &query.stages[0] {
            Stage::Op { name, params } => {
                assert_eq!(name, "Clamp");
                assert_eq!(params.get("min"), Some(&ParamValue::Number(0.0)));
                assert_eq!(params.get("max"), Some(&ParamValue::Number(9.5)));
            }
            other => panic!("unexpected stage: {:?}", other),
        }
    }

    #[test]
    fn test_parse_matrix_pipeline() {
        let query =
            parse_query("mat(cell, gene, umis) | slice(cell, c0, c2) | at(gene, g1)").unwrap();
        assert_eq!(
            query.selection,
            Selection::Matrix {
                rows: "cell".to_string(),
                cols: "gene".to_string(),
                name: "umis".to_string(),
            }
        );
        assert_eq!(query.stages.len(), 2);
    }

    #[test]
    fn test_parse_quoted_entries() {
        let query = parse_query("vec(cell, age) | at('entry with spaces')").unwrap();
        match &query.stages[0] {
            Stage::At { args } => assert_eq!(args, &vec!["entry with spaces".to_string()]),
            other => panic!("unexpected stage: {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_query("").is_err());
        assert!(parse_query("vec(cell)").is_err());
        assert!(parse_query("scalar(x) garbage").is_err());
        assert!(parse_query("vec(cell, age) | Clamp(min=0").is_err());
        assert!(parse_query("vec(cell, 'unterminated)").is_err());
    }
}

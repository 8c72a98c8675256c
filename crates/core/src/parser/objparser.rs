//! Token-to-object assembly.
//!
//! Builds `Object` values out of lexer tokens, recognizing `N G R`
//! indirect references by lookahead. Indirect-object framing
//! (`N G obj ... endobj`) and stream bodies are handled by the document
//! layer, which owns /Length resolution.

use super::lexer::{Keyword, Lexer, Token};
use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjRef, Object};

pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    /// Push-back stack for lookahead tokens.
    lookahead: Vec<(usize, Token)>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            lookahead: Vec::new(),
        }
    }

    pub fn new_at(data: &'a [u8], pos: usize) -> Self {
        let mut parser = Self::new(data);
        parser.lexer.set_pos(pos);
        parser
    }

    /// Position of the next unconsumed byte (accounting for pushed-back
    /// tokens).
    pub fn pos(&self) -> usize {
        match self.lookahead.last() {
            Some((pos, _)) => *pos,
            None => self.lexer.pos(),
        }
    }

    fn next_token(&mut self) -> Result<Option<(usize, Token)>> {
        if let Some(entry) = self.lookahead.pop() {
            return Ok(Some(entry));
        }
        match self.lexer.next_token() {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn push_back(&mut self, pos: usize, token: Token) {
        self.lookahead.push((pos, token));
    }

    /// Parse the next object.
    pub fn parse_object(&mut self) -> Result<Object> {
        let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(pos, token)
    }

    fn token_to_object(&mut self, pos: usize, token: Token) -> Result<Object> {
        match token {
            Token::Int(n) => {
                // Possible indirect reference: objnum genno R
                if let Ok(Some((pos2, tok2))) = self.next_token() {
                    if let Token::Int(g) = tok2 {
                        if let Ok(Some((pos3, tok3))) = self.next_token() {
                            if matches!(tok3, Token::Kw(Keyword::R))
                                && n >= 0
                                && g >= 0
                                && n <= i64::from(u32::MAX)
                                && g <= i64::from(u32::MAX)
                            {
                                return Ok(Object::Ref(ObjRef::new(n as u32, g as u32)));
                            }
                            self.push_back(pos3, tok3);
                        }
                        self.push_back(pos2, Token::Int(g));
                    } else {
                        self.push_back(pos2, tok2);
                    }
                }
                Ok(Object::Int(n))
            }
            Token::Real(v) => Ok(Object::Real(v)),
            Token::Bool(b) => Ok(Object::Bool(b)),
            Token::Name(name) => Ok(Object::Name(name)),
            Token::Str(bytes) => Ok(Object::String(bytes)),
            Token::Kw(Keyword::Null) => Ok(Object::Null),
            Token::Kw(Keyword::DictStart) => self.parse_dict(),
            Token::Kw(Keyword::ArrayStart) => self.parse_array(),
            Token::Kw(kw) => Err(PdfError::SyntaxError(format!(
                "unexpected keyword {kw:?} at {pos}"
            ))),
        }
    }

    fn parse_dict(&mut self) -> Result<Object> {
        let mut dict = Dict::new();
        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            match token {
                Token::Kw(Keyword::DictEnd) => return Ok(Object::Dict(dict)),
                Token::Name(key) => {
                    let value = self.parse_object()?;
                    dict.insert(key, value);
                }
                other => {
                    return Err(PdfError::SyntaxError(format!(
                        "expected name key in dict, got {other:?} at {pos}"
                    )));
                }
            }
        }
    }

    fn parse_array(&mut self) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            match token {
                Token::Kw(Keyword::ArrayEnd) => return Ok(Object::Array(items)),
                other => items.push(self.token_to_object(pos, other)?),
            }
        }
    }
}

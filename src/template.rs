// Display-name template rendering
// Expands {{ expression }} placeholders against the current track

use std::fmt;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};

use crate::provider::Track;

/// The evaluator accepts a deliberately small grammar: track fields, string
/// and integer literals, and `+`. The template is the local user's own
/// configuration text, so a failed expression renders as its error
/// description instead of aborting the whole render.
pub fn render(template: &str, track: &Track) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            match eval(caps[1].trim(), track) {
                Ok(value) => value.to_string(),
                Err(e) => e.to_string(),
            }
        })
        .into_owned()
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(.+?)\}\}").expect("placeholder pattern is valid"))
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Plus,
}

fn eval(expr: &str, track: &Track) -> Result<Value> {
    let mut tokens = tokenize(expr)?.into_iter();
    let first = tokens.next().context("empty expression")?;
    let mut acc = operand(first, track)?;
    while let Some(token) = tokens.next() {
        if token != Token::Plus {
            bail!("expected `+` between values");
        }
        let rhs = tokens.next().context("expected a value after `+`")?;
        acc = add(acc, operand(rhs, track)?);
    }
    Ok(acc)
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => bail!("unterminated string literal"),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Int(s.parse().context("number out of range")?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(s));
            }
            other => bail!("unexpected character `{other}`"),
        }
    }
    Ok(tokens)
}

fn operand(token: Token, track: &Track) -> Result<Value> {
    match token {
        Token::Ident(name) => field(track, &name),
        Token::Str(s) => Ok(Value::Str(s)),
        Token::Int(n) => Ok(Value::Int(n)),
        Token::Plus => bail!("expected a value, found `+`"),
    }
}

fn field(track: &Track, name: &str) -> Result<Value> {
    Ok(match name {
        "name" => Value::Str(track.name.clone()),
        "artist" => Value::Str(track.artist.clone()),
        "album" => Value::Str(track.album.clone()),
        "albumArt" | "album_art" => Value::Str(track.album_art.clone().unwrap_or_default()),
        "url" | "identity" => Value::Str(track.identity.clone()),
        "nowPlaying" | "now_playing" => Value::Bool(track.now_playing),
        _ => bail!("unknown field `{name}`"),
    })
}

fn add(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (a, b) => Value::Str(format!("{a}{b}")),
    }
}

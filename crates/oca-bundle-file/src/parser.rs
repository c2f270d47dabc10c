//! OCAfile parser.
//!
//! Grammar, one statement per logical line (a physical line ending in `\`
//! continues on the next one):
//!
//! ```text
//! --name=<schema name>                 first statement only
//! ADD CLASSIFICATION <value>
//! ADD ATTRIBUTE <name>=<Type> ...
//! ADD OVERLAY <Name>
//!   key=value | key=["a", "b"] | key     indented block, any depth
//!     nested=value
//! ```
//!
//! Keywords are case-insensitive. Lines whose first non-space character is
//! `#` are comments. Only syntax is checked here; attribute references and
//! overlay names are resolved by the assembler.

use oca_bundle_core::NestedAttrType;

use crate::ast::{Command, CommandKind, OcaFile, Property, PropertyValue};
use crate::error::{Result, SyntaxError, SyntaxErrorKind};

/// Parse OCAfile text.
pub fn parse(text: &str) -> Result<OcaFile> {
    let mut parser = Parser::default();
    for line in logical_lines(text) {
        parser.line(&line)?;
    }
    parser.finish()
}

struct LogicalLine {
    number: usize,
    text: String,
}

/// Join `\`-continued physical lines. A comment line never continues.
fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (index, raw) in text.lines().enumerate() {
        if pending.is_none() && raw.trim_start().starts_with('#') {
            continue;
        }
        let (content, continues) = match raw.trim_end().strip_suffix('\\') {
            Some(head) => (head, true),
            None => (raw, false),
        };
        match pending.as_mut() {
            Some(open) => {
                open.text.push(' ');
                open.text.push_str(content.trim());
            }
            None => {
                pending = Some(LogicalLine {
                    number: index + 1,
                    text: content.to_string(),
                })
            }
        }
        if !continues {
            out.extend(pending.take());
        }
    }
    out.extend(pending.take());
    out
}

#[derive(Default)]
struct Parser {
    name: Option<String>,
    commands: Vec<Command>,
    open: Option<OpenOverlay>,
    seen_statement: bool,
}

struct OpenOverlay {
    line: usize,
    name: String,
    lines: Vec<BlockLine>,
}

struct BlockLine {
    number: usize,
    indent: usize,
    key: String,
    value: PropertyValue,
}

impl Parser {
    fn line(&mut self, line: &LogicalLine) -> Result<()> {
        let content = line.text.trim_start();
        if content.is_empty() || content.starts_with('#') {
            return Ok(());
        }

        let leading = &line.text[..line.text.len() - content.len()];
        if let Some(pos) = leading.find('\t') {
            return Err(SyntaxError {
                line: line.number,
                column: pos + 1,
                kind: SyntaxErrorKind::TabIndentation,
            });
        }

        let indent = leading.len();
        if indent > 0 {
            return self.block_line(line.number, indent, content);
        }

        self.close_overlay()?;
        let mut cursor = Cursor::new(content, line.number, 1);
        if content.starts_with("--") {
            self.header(&mut cursor)?;
        } else {
            self.statement(&mut cursor)?;
        }
        self.seen_statement = true;
        Ok(())
    }

    fn header(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let word = cursor.take_while(|c| c != '=' && !c.is_whitespace());
        if !word.eq_ignore_ascii_case("--name") || !cursor.eat('=') {
            return Err(cursor.error_at(0, SyntaxErrorKind::UnknownKeyword(word.to_string())));
        }
        if self.name.is_some() {
            return Err(cursor.error_at(0, SyntaxErrorKind::DuplicateHeader));
        }
        if self.seen_statement {
            return Err(cursor.error_at(0, SyntaxErrorKind::MisplacedHeader));
        }

        let name = cursor.scalar("schema name")?;
        cursor.expect_end()?;
        self.name = Some(name);
        Ok(())
    }

    fn statement(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.pos;
        let keyword = cursor.word();
        if !keyword.eq_ignore_ascii_case("ADD") {
            return Err(cursor.error_at(start, SyntaxErrorKind::UnknownKeyword(keyword.to_string())));
        }
        cursor.skip_ws();
        let start = cursor.pos;
        let object = cursor.word();
        cursor.skip_ws();

        let kind = match object.to_ascii_uppercase().as_str() {
            "ATTRIBUTE" => CommandKind::AddAttribute(attributes(cursor)?),
            "CLASSIFICATION" => {
                let value = cursor.scalar("classification")?;
                cursor.expect_end()?;
                CommandKind::AddClassification(value)
            }
            "OVERLAY" => {
                let name = cursor.scalar("overlay name")?;
                cursor.expect_end()?;
                self.open = Some(OpenOverlay {
                    line: cursor.line,
                    name,
                    lines: Vec::new(),
                });
                return Ok(());
            }
            "" => return Err(cursor.error(SyntaxErrorKind::MissingValue("ADD target"))),
            _ => {
                return Err(cursor.error_at(
                    start,
                    SyntaxErrorKind::UnknownKeyword(format!("ADD {object}")),
                ))
            }
        };

        self.commands.push(Command {
            line: cursor.line,
            kind,
        });
        Ok(())
    }

    fn block_line(&mut self, number: usize, indent: usize, content: &str) -> Result<()> {
        let Some(open) = self.open.as_mut() else {
            return Err(SyntaxError {
                line: number,
                column: indent + 1,
                kind: SyntaxErrorKind::IndentOutsideBlock,
            });
        };

        let mut cursor = Cursor::new(content, number, indent + 1);
        let key = if cursor.peek() == Some('"') {
            cursor.quoted()?
        } else {
            let key = cursor.take_while(|c| c != '=' && !c.is_whitespace());
            key.to_string()
        };
        cursor.skip_ws();

        let value = if cursor.eat('=') {
            cursor.value()?
        } else if cursor.at_end() {
            PropertyValue::Empty
        } else {
            return Err(cursor.error(SyntaxErrorKind::MissingEquals));
        };
        if key.is_empty() {
            return Err(cursor.error_at(0, SyntaxErrorKind::MissingEquals));
        }

        open.lines.push(BlockLine {
            number,
            indent,
            key,
            value,
        });
        Ok(())
    }

    fn close_overlay(&mut self) -> Result<()> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        let properties = match open.lines.first() {
            None => Vec::new(),
            Some(first) => {
                let mut pos = 0;
                let properties = build_block(&open.lines, &mut pos, first.indent)?;
                if let Some(stray) = open.lines.get(pos) {
                    return Err(SyntaxError {
                        line: stray.number,
                        column: stray.indent + 1,
                        kind: SyntaxErrorKind::InconsistentDedent,
                    });
                }
                properties
            }
        };

        self.commands.push(Command {
            line: open.line,
            kind: CommandKind::AddOverlay {
                name: open.name,
                properties,
            },
        });
        Ok(())
    }

    fn finish(mut self) -> Result<OcaFile> {
        self.close_overlay()?;
        Ok(OcaFile {
            name: self.name,
            commands: self.commands,
        })
    }
}

/// Build the property tree for lines at `indent`, starting at `pos`.
fn build_block(lines: &[BlockLine], pos: &mut usize, indent: usize) -> Result<Vec<Property>> {
    let mut properties = Vec::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(SyntaxError {
                line: line.number,
                column: line.indent + 1,
                kind: SyntaxErrorKind::IndentUnderValue,
            });
        }
        *pos += 1;

        let mut value = line.value.clone();
        if let Some(child) = lines.get(*pos).filter(|next| next.indent > indent) {
            if value != PropertyValue::Empty {
                return Err(SyntaxError {
                    line: child.number,
                    column: child.indent + 1,
                    kind: SyntaxErrorKind::IndentUnderValue,
                });
            }
            let children = build_block(lines, pos, child.indent)?;
            if let Some(next) = lines.get(*pos).filter(|next| next.indent > indent) {
                return Err(SyntaxError {
                    line: next.number,
                    column: next.indent + 1,
                    kind: SyntaxErrorKind::InconsistentDedent,
                });
            }
            value = PropertyValue::Block(children);
        }

        properties.push(Property {
            key: line.key.clone(),
            value,
            line: line.number,
        });
    }

    Ok(properties)
}

/// `name=Type` pairs up to the end of the statement.
fn attributes(cursor: &mut Cursor<'_>) -> Result<Vec<(String, NestedAttrType)>> {
    let mut attrs = Vec::new();
    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }

        let start = cursor.pos;
        let name = cursor.take_while(|c| c != '=' && !c.is_whitespace());
        if name.is_empty() || !cursor.eat('=') {
            let token = cursor.word();
            return Err(cursor.error_at(
                start,
                SyntaxErrorKind::MalformedAttribute(format!("{name}{token}")),
            ));
        }

        let type_start = cursor.pos;
        let ty = cursor.word();
        let ty = ty.parse::<NestedAttrType>().map_err(|_| {
            cursor.error_at(type_start, SyntaxErrorKind::UnknownAttributeType(ty.to_string()))
        })?;
        attrs.push((name.to_string(), ty));
    }

    if attrs.is_empty() {
        return Err(cursor.error(SyntaxErrorKind::EmptyAttributeList));
    }
    Ok(attrs)
}

/// Character cursor over one logical line.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    /// Column of `src[0]`.
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, line: usize, column: usize) -> Self {
        Self {
            src,
            pos: 0,
            line,
            column,
        }
    }

    fn error_at(&self, pos: usize, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.column + self.src[..pos].chars().count(),
            kind,
        }
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        self.error_at(self.pos, kind)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.rest().trim().is_empty()
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn word(&mut self) -> &'a str {
        self.take_while(|c| !c.is_whitespace())
    }

    fn expect_end(&mut self) -> Result<()> {
        self.skip_ws();
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error(SyntaxErrorKind::TrailingCharacters))
        }
    }

    /// A quoted string or the trimmed remainder of the line.
    fn scalar(&mut self, what: &'static str) -> Result<String> {
        self.skip_ws();
        if self.peek() == Some('"') {
            return self.quoted();
        }
        let text = self.rest().trim();
        self.pos = self.src.len();
        if text.is_empty() {
            return Err(self.error(SyntaxErrorKind::MissingValue(what)));
        }
        Ok(text.to_string())
    }

    /// Right-hand side of `key=`.
    fn value(&mut self) -> Result<PropertyValue> {
        self.skip_ws();
        let value = match self.peek() {
            Some('"') => PropertyValue::Text(self.quoted()?),
            Some('[') => PropertyValue::Array(self.array()?),
            _ => {
                let text = self.rest().trim().to_string();
                self.pos = self.src.len();
                PropertyValue::Text(text)
            }
        };
        self.expect_end()?;
        Ok(value)
    }

    /// A `"..."` string with `\" \\ \n \t` escapes.
    fn quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, SyntaxErrorKind::UnterminatedString)),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => {
                        return Err(self.error_at(start, SyntaxErrorKind::UnterminatedString))
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    /// `[elem, elem, ...]` with quoted or bare elements.
    fn array(&mut self) -> Result<Vec<String>> {
        let start = self.pos;
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.error_at(start, SyntaxErrorKind::UnterminatedArray)),
                Some(']') => {
                    self.bump();
                    return Ok(items);
                }
                Some('"') => items.push(self.quoted()?),
                Some(_) => {
                    let item = self.take_while(|c| c != ',' && c != ']').trim();
                    if item.is_empty() {
                        return Err(self.error(SyntaxErrorKind::MissingValue("array element")));
                    }
                    items.push(item.to_string());
                }
            }

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {}
                None => return Err(self.error_at(start, SyntaxErrorKind::UnterminatedArray)),
                Some(_) => return Err(self.error(SyntaxErrorKind::TrailingCharacters)),
            }
        }
    }
}

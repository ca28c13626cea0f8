//! Topology loader for the plain-text input format.
//!
//! ```text
//! <num_nodes> [ <lambda> ]
//! <id> ( <deg> ) <n1> <n2> … <n_deg> [ <s1> <s2> … ]
//! …
//! ```
//!
//! `#` starts a comment to end of line; arbitrary whitespace separates
//! tokens, so a record may span lines. The bracketed frame length is
//! optional and defaults to the node count; the bracketed preferred-slot
//! list is optional and values above λ are reduced modulo λ at load.

use loosemac_protocol::{Frame, NodeId};

use crate::error::{Error, Result};
use crate::graph::{NodeSpec, Topology};

/// Parse a complete topology description.
pub fn parse(input: &str) -> Result<Topology> {
    let mut cursor = Cursor::tokenize(input);

    let (_, num_nodes) = cursor.expect_number("node count")?;
    if num_nodes < 1 {
        return Err(Error::InvalidNodeCount(num_nodes));
    }

    let lambda = if cursor.eat("[") {
        let (_, lambda) = cursor.expect_number("frame length")?;
        cursor.expect_punct("]")?;
        lambda
    } else {
        num_nodes
    };
    if lambda < 1 {
        return Err(Error::InvalidFrame(lambda));
    }
    let frame = Frame::new(lambda);

    let mut nodes = Vec::with_capacity(num_nodes as usize);
    for _ in 0..num_nodes {
        nodes.push(parse_node(&mut cursor, frame)?);
    }

    if let Some((line, token)) = cursor.peek() {
        return Err(Error::Parse {
            line,
            reason: format!("unexpected trailing token '{token}'"),
        });
    }

    Topology::new(frame, nodes)
}

fn parse_node(cursor: &mut Cursor, frame: Frame) -> Result<NodeSpec> {
    let (_, id) = cursor.expect_number("node id")?;

    cursor.expect_punct("(")?;
    let (_, degree) = cursor.expect_number("neighbor count")?;
    cursor.expect_punct(")")?;

    let mut neighbors = Vec::with_capacity(degree as usize);
    for _ in 0..degree {
        let (_, neighbor) = cursor.expect_number("neighbor id")?;
        neighbors.push(NodeId(neighbor));
    }

    let mut default_slots = Vec::new();
    if cursor.eat("[") {
        while !cursor.eat("]") {
            let (line, slot) = cursor.expect_number("preferred slot")?;
            if slot < 1 {
                return Err(Error::Parse {
                    line,
                    reason: "preferred slot must be at least 1".into(),
                });
            }
            default_slots.push(frame.wrap(slot));
        }
    }

    Ok(NodeSpec {
        id: NodeId(id),
        neighbors,
        default_slots,
    })
}

/// A line-tracking token stream. Punctuation (`(`, `)`, `[`, `]`) splits
/// into its own tokens regardless of surrounding whitespace.
struct Cursor {
    tokens: Vec<(usize, String)>,
    pos: usize,
    last_line: usize,
}

impl Cursor {
    fn tokenize(input: &str) -> Self {
        let mut tokens = Vec::new();
        let mut last_line = 1;
        for (idx, raw) in input.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("");
            let mut word = String::new();
            for ch in content.chars() {
                match ch {
                    '(' | ')' | '[' | ']' => {
                        if !word.is_empty() {
                            tokens.push((line, std::mem::take(&mut word)));
                        }
                        tokens.push((line, ch.to_string()));
                    }
                    c if c.is_whitespace() => {
                        if !word.is_empty() {
                            tokens.push((line, std::mem::take(&mut word)));
                        }
                    }
                    c => word.push(c),
                }
            }
            if !word.is_empty() {
                tokens.push((line, word));
            }
            last_line = line;
        }
        Self {
            tokens,
            pos: 0,
            last_line,
        }
    }

    fn peek(&self) -> Option<(usize, &str)> {
        self.tokens
            .get(self.pos)
            .map(|(line, token)| (*line, token.as_str()))
    }

    fn next(&mut self) -> Option<(usize, &str)> {
        let item = self.tokens.get(self.pos);
        if item.is_some() {
            self.pos += 1;
        }
        item.map(|(line, token)| (*line, token.as_str()))
    }

    /// Consume the next token if it equals `punct`.
    fn eat(&mut self, punct: &str) -> bool {
        if let Some((_, token)) = self.peek() {
            if token == punct {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        match self.next() {
            Some((_, token)) if token == punct => Ok(()),
            Some((line, token)) => Err(Error::Parse {
                line,
                reason: format!("expected '{punct}', found '{token}'"),
            }),
            None => Err(Error::Parse {
                line: self.last_line,
                reason: format!("expected '{punct}', found end of input"),
            }),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<(usize, u64)> {
        match self.next() {
            Some((line, token)) => match token.parse::<u64>() {
                Ok(value) => Ok((line, value)),
                Err(_) => Err(Error::Parse {
                    line,
                    reason: format!("expected {what}, found '{token}'"),
                }),
            },
            None => Err(Error::Parse {
                line: self.last_line,
                reason: format!("expected {what}, found end of input"),
            }),
        }
    }
}

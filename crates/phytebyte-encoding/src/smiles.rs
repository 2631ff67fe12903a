//! Minimal SMILES tokenizer.
//!
//! Splits a structure string into atoms, bonds, branches and ring closures and
//! rejects strings that are structurally malformed: unbalanced branches or
//! brackets, unpaired ring-closure labels, characters outside the SMILES
//! alphabet. Chemistry (valence, aromaticity) is not checked.

use std::collections::HashSet;

use crate::error::{EncodingError, EncodingResult};

/// One lexical unit of a SMILES string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Organic-subset symbol (`C`, `Cl`, `c`) or full bracket atom (`[NH4+]`).
    Atom(String),
    /// Explicit bond: `-`, `=`, `#`, `$`, `:`, `/`, `\`.
    Bond(char),
    BranchOpen,
    BranchClose,
    /// Ring-closure label, `0..=99`.
    RingClosure(u8),
    /// Disconnected-fragment separator `.`.
    Dot,
}

impl Token {
    /// Label used for feature hashing. Ring labels are collapsed so that
    /// renumbering rings does not change the fingerprint.
    pub fn label(&self) -> &str {
        match self {
            Token::Atom(symbol) => symbol,
            Token::Bond('-') => "-",
            Token::Bond('=') => "=",
            Token::Bond('#') => "#",
            Token::Bond('$') => "$",
            Token::Bond(':') => ":",
            Token::Bond('/') => "/",
            Token::Bond(_) => "\\",
            Token::BranchOpen => "(",
            Token::BranchClose => ")",
            Token::RingClosure(_) => "R",
            Token::Dot => ".",
        }
    }

    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self, Token::Atom(_))
    }
}

const ORGANIC: &[char] = &['B', 'C', 'N', 'O', 'P', 'S', 'F', 'I', 'b', 'c', 'n', 'o', 'p', 's', '*'];
const BONDS: &[char] = &['-', '=', '#', '$', ':', '/', '\\'];

/// Tokenize and validate a SMILES string.
///
/// # Errors
/// `UnencodableStructure` describing the first structural defect found.
pub fn tokenize(smiles: &str) -> EncodingResult<Vec<Token>> {
    let fail = |reason: String| EncodingError::unencodable(smiles, reason);

    if smiles.trim().is_empty() {
        return Err(fail("empty structure string".to_string()));
    }

    let chars: Vec<char> = smiles.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut depth = 0usize;
    let mut open_rings: HashSet<u8> = HashSet::new();
    let mut seen_atom = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .ok_or_else(|| fail(format!("unclosed bracket atom at position {}", i)))?;
                let inner: String = chars[i + 1..i + 1 + close].iter().collect();
                if inner.is_empty() || inner.contains('[') {
                    return Err(fail(format!("malformed bracket atom at position {}", i)));
                }
                tokens.push(Token::Atom(format!("[{}]", inner)));
                seen_atom = true;
                i += close + 2;
                continue;
            }
            'C' if chars.get(i + 1) == Some(&'l') => {
                tokens.push(Token::Atom("Cl".to_string()));
                seen_atom = true;
                i += 2;
                continue;
            }
            'B' if chars.get(i + 1) == Some(&'r') => {
                tokens.push(Token::Atom("Br".to_string()));
                seen_atom = true;
                i += 2;
                continue;
            }
            _ if ORGANIC.contains(&c) => {
                tokens.push(Token::Atom(c.to_string()));
                seen_atom = true;
            }
            _ if BONDS.contains(&c) => tokens.push(Token::Bond(c)),
            '(' => {
                if !seen_atom {
                    return Err(fail("branch opened before any atom".to_string()));
                }
                depth += 1;
                tokens.push(Token::BranchOpen);
            }
            ')' => {
                if depth == 0 {
                    return Err(fail(format!("unmatched ')' at position {}", i)));
                }
                depth -= 1;
                tokens.push(Token::BranchClose);
            }
            '.' => tokens.push(Token::Dot),
            '0'..='9' | '%' => {
                if !seen_atom {
                    return Err(fail("ring closure before any atom".to_string()));
                }
                let (label, width) = if c == '%' {
                    let digits: String = chars.iter().skip(i + 1).take(2).collect();
                    if digits.len() != 2 || !digits.chars().all(|d| d.is_ascii_digit()) {
                        return Err(fail(format!("malformed '%' ring label at position {}", i)));
                    }
                    (digits.parse::<u8>().map_err(|e| fail(e.to_string()))?, 3)
                } else {
                    (c as u8 - b'0', 1)
                };
                if !open_rings.remove(&label) {
                    open_rings.insert(label);
                }
                tokens.push(Token::RingClosure(label));
                i += width;
                continue;
            }
            other => {
                return Err(fail(format!("unexpected character '{}' at position {}", other, i)));
            }
        }
        i += 1;
    }

    if depth != 0 {
        return Err(fail(format!("{} unclosed branch(es)", depth)));
    }
    if let Some(label) = open_rings.iter().min() {
        return Err(fail(format!("unclosed ring bond {}", label)));
    }
    if !seen_atom {
        return Err(fail("no atoms".to_string()));
    }

    Ok(tokens)
}

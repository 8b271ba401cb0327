//! Regular-expression engine: a Perl-flavor subset compiled to a small AST
//! and executed by a recursive backtracking matcher.
//!
//! Supported syntax: literals, `.`, character classes with ranges and the
//! `\d \D \w \W \s \S` shortcuts, greedy quantifiers `* + ? {n} {n,} {n,m}`,
//! capturing groups, alternation, anchors `^ $`, word boundaries `\b \B`,
//! and backreferences `\1`–`\9`. Flags: `g` (tracks `lastIndex`) and `i`
//! (case-insensitive via a fixed Latin/Greek/Cyrillic simple casefold).
//!
//! The matcher saves and restores capture state per alternation branch and
//! per repetition step; repeats extend greedily to their maximum and then
//! unwind, trying the continuation at each count. An empty body match stops
//! repetition to keep loops finite.

use crate::types::str::JsString;

type ReSeq = Vec<ReNode>;

#[derive(Debug)]
enum ReNode {
    Literal(u32),
    Dot,
    Class {
        negate: bool,
        ranges: Vec<(u32, u32)>,
    },
    Alt(ReSeq, ReSeq),
    Repeat {
        child: Box<ReNode>,
        min: u32,
        max: Option<u32>,
    },
    Group {
        child: ReSeq,
        index: usize,
    },
    AnchorStart,
    AnchorEnd,
    WordBoundary,
    NotWordBoundary,
    Backref(usize),
}

#[derive(Debug)]
pub(crate) struct JsRegExp {
    pub source: Box<str>,
    pub global: bool,
    pub ignore_case: bool,
    root: ReSeq,
    /// Number of capturing groups (group 0, the whole match, excluded).
    pub group_count: usize,
}

/// One successful match; all offsets are glyph indices into the input.
#[derive(Debug, Clone)]
pub(crate) struct ReMatch {
    pub start: usize,
    pub end: usize,
    /// Slot `i` holds capture group `i`; slot 0 is unused.
    pub groups: Vec<Option<(usize, usize)>>,
}

impl JsRegExp {
    pub fn compile(pattern: &str, flags: &str) -> Result<Self, String> {
        let mut global = false;
        let mut ignore_case = false;
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' => ignore_case = true,
                other => return Err(format!("Invalid regular expression flag '{other}'")),
            }
        }
        let chars: Vec<char> = pattern.chars().collect();
        let mut parser = ReParser {
            chars: &chars,
            pos: 0,
            group_count: 0,
        };
        let root = parser.parse_alternation()?;
        if parser.pos != parser.chars.len() {
            return Err("Unmatched ')' in regular expression".to_owned());
        }
        Ok(Self {
            source: Box::from(pattern),
            global,
            ignore_case,
            root,
            group_count: parser.group_count,
        })
    }

    /// Scans for the leftmost match at or after glyph `start`.
    pub fn find_at(&self, input: &JsString, start: usize) -> Option<ReMatch> {
        let len = input.len();
        if start > len {
            return None;
        }
        let matcher = Matcher {
            input,
            len,
            ignore_case: self.ignore_case,
        };
        for pos in start..=len {
            let mut caps = vec![None; self.group_count + 1];
            if let Some(end) = matcher.run(&self.root, None, pos, &mut caps) {
                return Some(ReMatch {
                    start: pos,
                    end,
                    groups: caps,
                });
            }
        }
        None
    }
}

// ----------------------------------------------------------------------
// Parser
// ----------------------------------------------------------------------

struct ReParser<'a> {
    chars: &'a [char],
    pos: usize,
    group_count: usize,
}

impl ReParser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn parse_alternation(&mut self) -> Result<ReSeq, String> {
        let left = self.parse_sequence()?;
        if self.peek() != Some('|') {
            return Ok(left);
        }
        self.next();
        let right = self.parse_alternation()?;
        Ok(vec![ReNode::Alt(left, right)])
    }

    fn parse_sequence(&mut self) -> Result<ReSeq, String> {
        let mut seq = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            seq.push(self.parse_term()?);
        }
        Ok(seq)
    }

    fn parse_term(&mut self) -> Result<ReNode, String> {
        let atom = self.parse_atom()?;
        let (min, max) = match self.peek() {
            Some('*') => {
                self.next();
                (0, None)
            }
            Some('+') => {
                self.next();
                (1, None)
            }
            Some('?') => {
                self.next();
                (0, Some(1))
            }
            Some('{') => {
                self.next();
                let min = self.parse_number()?;
                match self.next() {
                    Some('}') => (min, Some(min)),
                    Some(',') => {
                        if self.peek() == Some('}') {
                            self.next();
                            (min, None)
                        } else {
                            let max = self.parse_number()?;
                            if self.next() != Some('}') {
                                return Err("Unterminated quantifier".to_owned());
                            }
                            if max < min {
                                return Err("Quantifier range out of order".to_owned());
                            }
                            (min, Some(max))
                        }
                    }
                    _ => return Err("Unterminated quantifier".to_owned()),
                }
            }
            _ => return Ok(atom),
        };
        if matches!(
            atom,
            ReNode::AnchorStart | ReNode::AnchorEnd | ReNode::WordBoundary | ReNode::NotWordBoundary
        ) {
            return Err("Quantifier after assertion".to_owned());
        }
        Ok(ReNode::Repeat {
            child: Box::new(atom),
            min,
            max,
        })
    }

    fn parse_number(&mut self) -> Result<u32, String> {
        let mut value: u32 = 0;
        let mut any = false;
        while let Some(c) = self.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            value = value.saturating_mul(10).saturating_add(digit);
            any = true;
            self.next();
        }
        if any {
            Ok(value)
        } else {
            Err("Expected number in quantifier".to_owned())
        }
    }

    fn parse_atom(&mut self) -> Result<ReNode, String> {
        match self.next() {
            Some('(') => {
                self.group_count += 1;
                let index = self.group_count;
                let child = self.parse_alternation()?;
                if self.next() != Some(')') {
                    return Err("Unterminated group".to_owned());
                }
                Ok(ReNode::Group { child, index })
            }
            Some('[') => self.parse_class(),
            Some('.') => Ok(ReNode::Dot),
            Some('^') => Ok(ReNode::AnchorStart),
            Some('$') => Ok(ReNode::AnchorEnd),
            Some('\\') => self.parse_escape(),
            Some(c @ ('*' | '+' | '?')) => Err(format!("Nothing to repeat before '{c}'")),
            Some(c) => Ok(ReNode::Literal(u32::from(c))),
            None => Err("Unexpected end of pattern".to_owned()),
        }
    }

    fn parse_escape(&mut self) -> Result<ReNode, String> {
        let Some(c) = self.next() else {
            return Err("Trailing backslash".to_owned());
        };
        let node = match c {
            'd' => class_node(false, digit_ranges()),
            'D' => class_node(true, digit_ranges()),
            'w' => class_node(false, word_ranges()),
            'W' => class_node(true, word_ranges()),
            's' => class_node(false, space_ranges()),
            'S' => class_node(true, space_ranges()),
            'b' => ReNode::WordBoundary,
            'B' => ReNode::NotWordBoundary,
            '1'..='9' => ReNode::Backref(c as usize - '0' as usize),
            'n' => ReNode::Literal(u32::from('\n')),
            'r' => ReNode::Literal(u32::from('\r')),
            't' => ReNode::Literal(u32::from('\t')),
            'f' => ReNode::Literal(0x0C),
            'v' => ReNode::Literal(0x0B),
            '0' => ReNode::Literal(0),
            'x' => ReNode::Literal(self.parse_hex(2)?),
            'u' => ReNode::Literal(self.parse_hex(4)?),
            other => ReNode::Literal(u32::from(other)),
        };
        Ok(node)
    }

    fn parse_hex(&mut self, digits: usize) -> Result<u32, String> {
        let mut value = 0u32;
        for _ in 0..digits {
            let Some(d) = self.next().and_then(|c| c.to_digit(16)) else {
                return Err("Invalid hexadecimal escape".to_owned());
            };
            value = value * 16 + d;
        }
        Ok(value)
    }

    fn parse_class(&mut self) -> Result<ReNode, String> {
        let negate = if self.peek() == Some('^') {
            self.next();
            true
        } else {
            false
        };
        let mut ranges = Vec::new();
        loop {
            let Some(c) = self.next() else {
                return Err("Unterminated character class".to_owned());
            };
            if c == ']' {
                break;
            }
            let start = if c == '\\' {
                match self.class_escape()? {
                    ClassEscape::Shortcut(shortcut) => {
                        ranges.extend(shortcut);
                        continue;
                    }
                    ClassEscape::Literal(cp) => cp,
                }
            } else {
                u32::from(c)
            };
            if self.peek() == Some('-')
                && self.chars.get(self.pos + 1).is_some_and(|&c| c != ']')
            {
                self.next();
                let Some(end_char) = self.next() else {
                    return Err("Unterminated character class".to_owned());
                };
                let end = if end_char == '\\' {
                    match self.class_escape()? {
                        ClassEscape::Shortcut(_) => {
                            return Err("Invalid range in character class".to_owned());
                        }
                        ClassEscape::Literal(cp) => cp,
                    }
                } else {
                    u32::from(end_char)
                };
                if end < start {
                    return Err("Range out of order in character class".to_owned());
                }
                ranges.push((start, end));
            } else {
                ranges.push((start, start));
            }
        }
        Ok(ReNode::Class { negate, ranges })
    }

    /// Handles the escape after a `\` inside a class, where the preceding
    /// backslash has already been consumed by the caller.
    fn class_escape(&mut self) -> Result<ClassEscape, String> {
        let Some(c) = self.next() else {
            return Err("Trailing backslash".to_owned());
        };
        let escape = match c {
            'd' => ClassEscape::Shortcut(digit_ranges()),
            'w' => ClassEscape::Shortcut(word_ranges()),
            's' => ClassEscape::Shortcut(space_ranges()),
            'D' => ClassEscape::Shortcut(complement(&digit_ranges())),
            'W' => ClassEscape::Shortcut(complement(&word_ranges())),
            'S' => ClassEscape::Shortcut(complement(&space_ranges())),
            'n' => ClassEscape::Literal(u32::from('\n')),
            'r' => ClassEscape::Literal(u32::from('\r')),
            't' => ClassEscape::Literal(u32::from('\t')),
            'f' => ClassEscape::Literal(0x0C),
            'v' => ClassEscape::Literal(0x0B),
            '0' => ClassEscape::Literal(0),
            'x' => ClassEscape::Literal(self.parse_hex(2)?),
            'u' => ClassEscape::Literal(self.parse_hex(4)?),
            other => ClassEscape::Literal(u32::from(other)),
        };
        Ok(escape)
    }
}

enum ClassEscape {
    Literal(u32),
    Shortcut(Vec<(u32, u32)>),
}

fn class_node(negate: bool, ranges: Vec<(u32, u32)>) -> ReNode {
    ReNode::Class { negate, ranges }
}

fn digit_ranges() -> Vec<(u32, u32)> {
    vec![(u32::from('0'), u32::from('9'))]
}

fn word_ranges() -> Vec<(u32, u32)> {
    vec![
        (u32::from('0'), u32::from('9')),
        (u32::from('A'), u32::from('Z')),
        (u32::from('_'), u32::from('_')),
        (u32::from('a'), u32::from('z')),
    ]
}

fn space_ranges() -> Vec<(u32, u32)> {
    vec![(0x09, 0x0D), (0x20, 0x20), (0xA0, 0xA0)]
}

fn complement(ranges: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut sorted = ranges.to_vec();
    sorted.sort_unstable();
    let mut out = Vec::new();
    let mut next = 0u32;
    for &(start, end) in &sorted {
        if start > next {
            out.push((next, start - 1));
        }
        next = end + 1;
    }
    out.push((next, 0x0010_FFFF));
    out
}

// ----------------------------------------------------------------------
// Case folding: fixed simple mappings over Latin, Greek, and Cyrillic
// ----------------------------------------------------------------------

pub(crate) fn simple_lower(ch: u32) -> u32 {
    match ch {
        0x41..=0x5A => ch + 0x20,
        0xC0..=0xD6 | 0xD8..=0xDE => ch + 0x20,
        0x100..=0x137 | 0x14A..=0x177 if ch % 2 == 0 => ch + 1,
        0x139..=0x148 | 0x179..=0x17E if ch % 2 == 1 => ch + 1,
        0x178 => 0xFF,
        0x17F => 0x73,
        0x391..=0x3A1 | 0x3A3..=0x3AB => ch + 0x20,
        0x3C2 => 0x3C3,
        0x400..=0x40F => ch + 0x50,
        0x410..=0x42F => ch + 0x20,
        0x1E9E => 0xDF,
        0x212A => 0x6B,
        0x212B => 0xE5,
        _ => ch,
    }
}

pub(crate) fn simple_upper(ch: u32) -> u32 {
    match ch {
        0x61..=0x7A => ch - 0x20,
        0xE0..=0xF6 | 0xF8..=0xFE => ch - 0x20,
        0xFF => 0x178,
        0x101..=0x138 | 0x14B..=0x178 if ch % 2 == 1 => ch - 1,
        0x13A..=0x149 | 0x17A..=0x17E if ch % 2 == 0 => ch - 1,
        0x17F => 0x53,
        0x3B1..=0x3C1 | 0x3C3..=0x3CB => ch - 0x20,
        0x3C2 => 0x3A3,
        0x430..=0x44F => ch - 0x20,
        0x450..=0x45F => ch - 0x50,
        0xDF => 0x1E9E,
        _ => ch,
    }
}

fn char_equal(a: u32, b: u32, ignore_case: bool) -> bool {
    a == b || (ignore_case && simple_lower(a) == simple_lower(b))
}

fn is_word(ch: u32) -> bool {
    matches!(ch, 0x30..=0x39 | 0x41..=0x5A | 0x61..=0x7A) || ch == u32::from('_')
}

// ----------------------------------------------------------------------
// Matcher
// ----------------------------------------------------------------------

type Caps = Vec<Option<(usize, usize)>>;

/// Continuation: the rest of the enclosing sequences, innermost first.
struct Cont<'a> {
    seq: &'a [ReNode],
    next: Option<&'a Cont<'a>>,
}

struct Matcher<'a> {
    input: &'a JsString,
    len: usize,
    ignore_case: bool,
}

impl Matcher<'_> {
    fn code_at(&self, pos: usize) -> u32 {
        self.input.code_at(pos).unwrap_or(0)
    }

    fn class_match(&self, negate: bool, ranges: &[(u32, u32)], ch: u32) -> bool {
        let (lower, upper) = if self.ignore_case {
            (simple_lower(ch), simple_upper(ch))
        } else {
            (ch, ch)
        };
        let mut matched = false;
        for &(start, end) in ranges {
            if (ch >= start && ch <= end)
                || (self.ignore_case
                    && ((lower >= start && lower <= end) || (upper >= start && upper <= end)))
            {
                matched = true;
                break;
            }
        }
        matched != negate
    }

    /// Matches `seq` followed by the continuation stack; returns the end
    /// position of the whole continuation on success.
    fn run(&self, seq: &[ReNode], cont: Option<&Cont>, pos: usize, caps: &mut Caps) -> Option<usize> {
        let Some((node, rest)) = seq.split_first() else {
            return match cont {
                Some(c) => self.run(c.seq, c.next, pos, caps),
                None => Some(pos),
            };
        };
        match node {
            ReNode::Literal(cp) => {
                if pos < self.len && char_equal(self.code_at(pos), *cp, self.ignore_case) {
                    self.run(rest, cont, pos + 1, caps)
                } else {
                    None
                }
            }
            ReNode::Dot => {
                if pos >= self.len {
                    return None;
                }
                let ch = self.code_at(pos);
                if ch == u32::from('\n') || ch == u32::from('\r') {
                    return None;
                }
                self.run(rest, cont, pos + 1, caps)
            }
            ReNode::Class { negate, ranges } => {
                if pos < self.len && self.class_match(*negate, ranges, self.code_at(pos)) {
                    self.run(rest, cont, pos + 1, caps)
                } else {
                    None
                }
            }
            ReNode::AnchorStart => {
                if pos == 0 {
                    self.run(rest, cont, pos, caps)
                } else {
                    None
                }
            }
            ReNode::AnchorEnd => {
                if pos == self.len {
                    self.run(rest, cont, pos, caps)
                } else {
                    None
                }
            }
            ReNode::WordBoundary | ReNode::NotWordBoundary => {
                let prev = pos > 0 && is_word(self.code_at(pos - 1));
                let here = pos < self.len && is_word(self.code_at(pos));
                let boundary = prev != here;
                let want = matches!(node, ReNode::WordBoundary);
                if boundary == want {
                    self.run(rest, cont, pos, caps)
                } else {
                    None
                }
            }
            ReNode::Backref(index) => {
                let Some(&Some((start, end))) = caps.get(*index) else {
                    // an unset group matches the empty string
                    return self.run(rest, cont, pos, caps);
                };
                let capture_len = end.saturating_sub(start);
                if pos + capture_len > self.len {
                    return None;
                }
                for offset in 0..capture_len {
                    let a = self.code_at(start + offset);
                    let b = self.code_at(pos + offset);
                    if !char_equal(a, b, self.ignore_case) {
                        return None;
                    }
                }
                self.run(rest, cont, pos + capture_len, caps)
            }
            ReNode::Group { child, index } => {
                let saved = caps[*index];
                caps[*index] = Some((pos, pos));
                if let Some(child_end) = self.run(child, None, pos, caps) {
                    caps[*index] = Some((pos, child_end));
                    if let Some(end) = self.run(rest, cont, child_end, caps) {
                        return Some(end);
                    }
                }
                caps[*index] = saved;
                None
            }
            ReNode::Alt(left, right) => {
                let sub_cont = Cont {
                    seq: rest,
                    next: cont,
                };
                for branch in [left, right] {
                    let mut attempt = caps.clone();
                    if let Some(end) = self.run(branch, Some(&sub_cont), pos, &mut attempt) {
                        *caps = attempt;
                        return Some(end);
                    }
                }
                None
            }
            ReNode::Repeat { child, min, max } => {
                let limit = max.map_or(usize::MAX, |m| m as usize);
                let child_seq = std::slice::from_ref(child.as_ref());
                let mut positions = vec![pos];
                let mut snapshots = vec![caps.clone()];
                while positions.len() - 1 < limit {
                    let count = positions.len() - 1;
                    let current = positions[count];
                    let mut state = snapshots[count].clone();
                    match self.run(child_seq, None, current, &mut state) {
                        // the empty-match rule: a zero-width iteration ends
                        // the greedy expansion
                        Some(next_pos) if next_pos != current => {
                            positions.push(next_pos);
                            snapshots.push(state);
                        }
                        _ => break,
                    }
                }
                let reached = positions.len() - 1;
                let floor = *min as usize;
                let mut count = reached;
                loop {
                    if count < floor {
                        return None;
                    }
                    *caps = snapshots[count].clone();
                    if let Some(end) = self.run(rest, cont, positions[count], caps) {
                        return Some(end);
                    }
                    if count == 0 {
                        return None;
                    }
                    count -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(pattern: &str, flags: &str, input: &str) -> Option<(usize, usize, Vec<Option<String>>)> {
        let re = JsRegExp::compile(pattern, flags).expect("compile failure");
        let text = JsString::new(input);
        let found = re.find_at(&text, 0)?;
        let groups = found
            .groups
            .iter()
            .skip(1)
            .map(|g| g.map(|(s, e)| text.substring(s, e).to_owned()))
            .collect();
        Some((found.start, found.end, groups))
    }

    #[test]
    fn literal_and_captures() {
        let (start, end, groups) = exec(r"([a-z]+)(\d+)", "", "abc123").unwrap();
        assert_eq!((start, end), (0, 6));
        assert_eq!(groups[0].as_deref(), Some("abc"));
        assert_eq!(groups[1].as_deref(), Some("123"));
    }

    #[test]
    fn greedy_repeat_backtracks() {
        let (start, end, _) = exec(r"a+ab", "", "aaab").unwrap();
        assert_eq!((start, end), (0, 4));
    }

    #[test]
    fn alternation_restores_captures() {
        let (_, _, groups) = exec(r"(ab|a)c", "", "ac").unwrap();
        assert_eq!(groups[0].as_deref(), Some("a"));
    }

    #[test]
    fn anchors() {
        assert!(exec(r"^abc$", "", "abc").is_some());
        assert!(exec(r"^abc$", "", "xabc").is_none());
        assert!(exec(r"^b", "", "ab").is_none());
    }

    #[test]
    fn word_boundaries() {
        let (start, end, _) = exec(r"\bcat\b", "", "a cat sat").unwrap();
        assert_eq!((start, end), (2, 5));
        assert!(exec(r"\bcat\b", "", "concatenate").is_none());
    }

    #[test]
    fn backreference() {
        assert!(exec(r"(ab)\1", "", "abab").is_some());
        assert!(exec(r"(ab)\1", "", "abac").is_none());
    }

    #[test]
    fn case_insensitive_flag() {
        assert!(exec(r"hello", "i", "HELLO").is_some());
        assert!(exec(r"ПРИВЕТ", "i", "привет").is_some());
        assert!(exec(r"Σ", "i", "σ").is_some());
    }

    #[test]
    fn class_negation_and_shortcuts() {
        assert!(exec(r"[^0-9]", "", "a").is_some());
        assert!(exec(r"[^0-9]", "", "5").is_none());
        assert!(exec(r"\s\S", "", " x").is_some());
        assert!(exec(r"[\d]+", "", "42").is_some());
    }

    #[test]
    fn bounded_quantifiers() {
        assert!(exec(r"^a{2,3}$", "", "aa").is_some());
        assert!(exec(r"^a{2,3}$", "", "aaa").is_some());
        assert!(exec(r"^a{2,3}$", "", "a").is_none());
        assert!(exec(r"^a{2,3}$", "", "aaaa").is_none());
        assert!(exec(r"^a{2}$", "", "aa").is_some());
    }

    #[test]
    fn empty_repeat_bodies_terminate() {
        // `(a?)*` could loop forever without the empty-match rule
        let (start, end, _) = exec(r"(a?)*b", "", "aab").unwrap();
        assert_eq!((start, end), (0, 3));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(JsRegExp::compile("(", "").is_err());
        assert!(JsRegExp::compile("a{2,1}", "").is_err());
        assert!(JsRegExp::compile("[z-a]", "").is_err());
        assert!(JsRegExp::compile("a", "q").is_err());
    }
}

use super::flatten::{PLACEHOLDER_LEN, SENTINEL};

pub const SOFT_HYPHEN: char = '\u{AD}';

/// How many chars a heuristic compares before trusting a realignment.
pub const LOOKAHEAD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchKind {
    /// The rest of the current ALTO word is noise; the next word lines up.
    ExtraCharInAltoNext,
    /// One ALTO char is noise; the rest of the current word lines up.
    ExtraCharInAltoCurrent,
    /// One casebody char has no ALTO counterpart.
    ExtraCharInCaseMets,
    Unspecified,
    /// Casebody text left over once every linked ALTO word was consumed.
    LeftoverCasebody,
}

impl MismatchKind {
    pub fn description(&self) -> &'static str {
        match self {
            MismatchKind::ExtraCharInAltoNext => "extra char in alto - subsequent alto element",
            MismatchKind::ExtraCharInAltoCurrent => "extra char in alto - current alto element",
            MismatchKind::ExtraCharInCaseMets => "extra char in case_mets",
            MismatchKind::Unspecified => "Unspecified Mismatch",
            MismatchKind::LeftoverCasebody => "Leftover chars in casebody element not found in ALTO",
        }
    }
}

pub fn fold(c: char) -> char {
    if c == SOFT_HYPHEN {
        '-'
    } else {
        c
    }
}

pub fn chars_match(case_char: char, alto_char: char) -> bool {
    fold(case_char) == fold(alto_char)
}

/// Skips placeholders and whitespace; ALTO words carry neither.
pub fn skip_ignorable(text: &[char], mut pos: usize) -> usize {
    while pos < text.len() {
        if text[pos] == SENTINEL {
            pos += PLACEHOLDER_LEN;
        } else if text[pos].is_whitespace() {
            pos += 1;
        } else {
            break;
        }
    }
    pos.min(text.len())
}

/// The next `n` comparable casebody chars from `pos`, folded.
pub fn peek(text: &[char], pos: usize, n: usize) -> Vec<char> {
    let mut out = Vec::with_capacity(n);
    let mut pos = skip_ignorable(text, pos);
    while out.len() < n && pos < text.len() {
        out.push(fold(text[pos]));
        pos = skip_ignorable(text, pos + 1);
    }
    out
}

fn lines_up(text: &[char], pos: usize, expected: &[char]) -> bool {
    if expected.is_empty() {
        return false;
    }
    let expected: Vec<char> = expected.iter().map(|c| fold(*c)).collect();
    peek(text, pos, expected.len()) == expected
}

fn window(chars: &[char], start: usize) -> &[char] {
    if start >= chars.len() {
        return &[];
    }
    &chars[start..(start + LOOKAHEAD).min(chars.len())]
}

pub fn extra_char_in_alto_next(text: &[char], pos: usize, next_word: Option<&[char]>) -> bool {
    next_word.is_some_and(|next| lines_up(text, pos, window(next, 0)))
}

pub fn extra_char_in_alto_current(text: &[char], pos: usize, word: &[char], at: usize) -> bool {
    lines_up(text, pos, window(word, at + 1))
}

pub fn extra_char_in_case_mets(text: &[char], pos: usize, word: &[char], at: usize) -> bool {
    let second = skip_ignorable(text, pos + 1);
    second < text.len() && lines_up(text, second, window(word, at))
}

/// Picks the first heuristic whose precondition holds at a mismatch between
/// `text[pos]` and `word[at]`.
pub fn choose(text: &[char], pos: usize, word: &[char], at: usize, next_word: Option<&[char]>) -> MismatchKind {
    if extra_char_in_alto_next(text, pos, next_word) {
        MismatchKind::ExtraCharInAltoNext
    } else if extra_char_in_alto_current(text, pos, word, at) {
        MismatchKind::ExtraCharInAltoCurrent
    } else if extra_char_in_case_mets(text, pos, word, at) {
        MismatchKind::ExtraCharInCaseMets
    } else {
        MismatchKind::Unspecified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn soft_hyphen_folds_to_hyphen() {
        assert!(chars_match('\u{AD}', '-'));
        assert!(!chars_match('a', '-'));
    }

    #[test]
    fn peek_skips_spaces_and_placeholders() {
        let text = chars("a \u{E000}f<b c");
        assert_eq!(peek(&text, 0, 3), chars("abc"));
    }

    #[test]
    fn detects_noise_at_end_of_alto_word() {
        let text = chars("cat The");
        // ALTO "cat." then "The": cursor sits on 'T' when '.' fails to match.
        assert_eq!(
            choose(&text, 3, &chars("cat."), 3, Some(&chars("The"))),
            MismatchKind::ExtraCharInAltoNext
        );
    }

    #[test]
    fn detects_noise_inside_alto_word() {
        let text = chars("bc");
        assert_eq!(
            choose(&text, 0, &chars("abXbc"), 2, None),
            MismatchKind::ExtraCharInAltoCurrent
        );
    }

    #[test]
    fn detects_extra_casebody_char() {
        let text = chars("xbc");
        assert_eq!(choose(&text, 0, &chars("bc"), 0, None), MismatchKind::ExtraCharInCaseMets);
    }

    #[test]
    fn falls_back_to_unspecified() {
        let text = chars("abc");
        assert_eq!(choose(&text, 0, &chars("xyz"), 0, None), MismatchKind::Unspecified);
    }
}

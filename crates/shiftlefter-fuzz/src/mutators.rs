//! The six mutation operators, plus two-mutator combos, applied to a known
//! valid source text to stress the lexer and parser.

use crate::rng::Rng;

/// Which mutator produced a given candidate; also the `mutator_type` half
/// of a failure [`crate::signature::Signature`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub enum MutatorType {
    /// Widened or narrowed a line's leading indentation.
    IndentDamage,
    /// Dropped a table `|` delimiter.
    DelimiterRemoval,
    /// Duplicated or dropped a data table cell.
    TableCorruption,
    /// Dropped one `"""` docstring fence.
    DocstringDelimiterRemoval,
    /// Corrupted a keyword's spelling.
    KeywordPerturbation,
    /// Stripped the `:` after a block keyword.
    ColonRemoval,
    /// Two mutators applied back to back.
    Combo(Box<MutatorType>, Box<MutatorType>),
}

impl std::fmt::Display for MutatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndentDamage => write!(f, "indent_damage"),
            Self::DelimiterRemoval => write!(f, "delimiter_removal"),
            Self::TableCorruption => write!(f, "table_corruption"),
            Self::DocstringDelimiterRemoval => write!(f, "docstring_delimiter_removal"),
            Self::KeywordPerturbation => write!(f, "keyword_perturbation"),
            Self::ColonRemoval => write!(f, "colon_removal"),
            Self::Combo(a, b) => write!(f, "combo({a}+{b})"),
        }
    }
}

const SINGLE_MUTATORS: &[MutatorType] = &[
    MutatorType::IndentDamage,
    MutatorType::DelimiterRemoval,
    MutatorType::TableCorruption,
    MutatorType::DocstringDelimiterRemoval,
    MutatorType::KeywordPerturbation,
    MutatorType::ColonRemoval,
];

fn indent_damage(src: &str, rng: &mut Rng) -> String {
    let mut lines: Vec<String> = src.lines().map(str::to_owned).collect();
    if lines.is_empty() {
        return src.to_owned();
    }
    let idx = rng.next_below(lines.len());
    if let Some(line) = lines.get_mut(idx) {
        let trimmed = line.trim_start();
        let extra = 1 + rng.next_below(5);
        *line = format!("{}{trimmed}", " ".repeat(extra));
    }
    lines.join("\n")
}

fn delimiter_removal(src: &str, rng: &mut Rng) -> String {
    let candidates: Vec<usize> = src
        .lines()
        .enumerate()
        .filter(|(_, l)| l.trim_start().starts_with('|'))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = rng.pick(&candidates) else {
        return src.to_owned();
    };
    let mut lines: Vec<String> = src.lines().map(str::to_owned).collect();
    if let Some(line) = lines.get_mut(idx) {
        *line = line.replacen('|', "", 1);
    }
    lines.join("\n")
}

fn table_corruption(src: &str, rng: &mut Rng) -> String {
    let candidates: Vec<usize> = src
        .lines()
        .enumerate()
        .filter(|(_, l)| l.trim_start().starts_with('|'))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = rng.pick(&candidates) else {
        return src.to_owned();
    };
    let mut lines: Vec<String> = src.lines().map(str::to_owned).collect();
    if let Some(line) = lines.get_mut(idx) {
        if rng.chance(1, 2) {
            line.push_str(" extra |");
        } else if let Some(pos) = line.rfind('|') {
            line.truncate(pos);
        }
    }
    lines.join("\n")
}

fn docstring_delimiter_removal(src: &str, rng: &mut Rng) -> String {
    let candidates: Vec<usize> = src
        .lines()
        .enumerate()
        .filter(|(_, l)| l.trim_start().starts_with("\"\"\""))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = rng.pick(&candidates) else {
        return src.to_owned();
    };
    src.lines()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, l)| l)
        .collect::<Vec<_>>()
        .join("\n")
}

const KEYWORD_PREFIXES: &[&str] = &["Feature", "Background", "Scenario", "Rule", "Examples", "Given", "When", "Then", "And", "But"];

fn keyword_perturbation(src: &str, rng: &mut Rng) -> String {
    let candidates: Vec<usize> = src
        .lines()
        .enumerate()
        .filter(|(_, l)| {
            let trimmed = l.trim_start();
            KEYWORD_PREFIXES.iter().any(|kw| trimmed.starts_with(kw))
        })
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = rng.pick(&candidates) else {
        return src.to_owned();
    };
    let mut lines: Vec<String> = src.lines().map(str::to_owned).collect();
    if let Some(line) = lines.get_mut(idx) {
        if let Some(first_alpha) = line.find(|c: char| c.is_ascii_alphabetic()) {
            let mut chars: Vec<char> = line.chars().collect();
            if let Some(c) = chars.get_mut(first_alpha) {
                *c = c.to_ascii_lowercase();
            }
            if chars.len() > first_alpha + 1 {
                chars.remove(first_alpha + 1);
            }
            *line = chars.into_iter().collect();
        }
    }
    lines.join("\n")
}

fn colon_removal(src: &str, rng: &mut Rng) -> String {
    let candidates: Vec<usize> = src
        .lines()
        .enumerate()
        .filter(|(_, l)| l.contains(':'))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = rng.pick(&candidates) else {
        return src.to_owned();
    };
    let mut lines: Vec<String> = src.lines().map(str::to_owned).collect();
    if let Some(line) = lines.get_mut(idx) {
        *line = line.replacen(':', "", 1);
    }
    lines.join("\n")
}

fn apply_single(kind: &MutatorType, src: &str, rng: &mut Rng) -> String {
    match kind {
        MutatorType::IndentDamage => indent_damage(src, rng),
        MutatorType::DelimiterRemoval => delimiter_removal(src, rng),
        MutatorType::TableCorruption => table_corruption(src, rng),
        MutatorType::DocstringDelimiterRemoval => docstring_delimiter_removal(src, rng),
        MutatorType::KeywordPerturbation => keyword_perturbation(src, rng),
        MutatorType::ColonRemoval => colon_removal(src, rng),
        MutatorType::Combo(a, b) => apply_single(b, &apply_single(a, src, rng), rng),
    }
}

/// Apply one randomly chosen mutator (or, with probability `1/4`, a combo
/// of two distinct mutators) to `src`, returning the mutated text and which
/// mutator(s) produced it.
pub fn mutate(src: &str, rng: &mut Rng) -> (String, MutatorType) {
    let first = rng.pick(SINGLE_MUTATORS).cloned().unwrap_or(MutatorType::ColonRemoval);
    if rng.chance(1, 4) {
        let second = rng.pick(SINGLE_MUTATORS).cloned().unwrap_or(MutatorType::IndentDamage);
        let kind = MutatorType::Combo(Box::new(first), Box::new(second));
        let out = apply_single(&kind, src, rng);
        (out, kind)
    } else {
        let out = apply_single(&first, src, rng);
        (out, first)
    }
}

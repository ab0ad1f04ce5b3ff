//! Approximate string scoring.
//!
//! The matcher only talks to [`FuzzyScorer`]; [`EditDistanceScorer`] is the
//! default engine. Distances run from 0.0 (identical) to 1.0 (unrelated).

/// One weighted text field of a candidate.
#[derive(Debug, Clone, Copy)]
pub struct FieldText<'a> {
    pub text: &'a str,
    pub weight: f64,
}

impl<'a> FieldText<'a> {
    pub fn new(text: &'a str, weight: f64) -> Self {
        Self { text, weight }
    }
}

/// Scores a candidate's fields against a query.
pub trait FuzzyScorer: Send + Sync {
    /// Combined distance in [0, 1], or `None` when no field clears the
    /// engine's relevance floor.
    fn score(&self, fields: &[FieldText<'_>], query: &str) -> Option<f64>;
}

/// Longest pattern scored in one pass; longer queries are chunked.
pub const MAX_PATTERN_CHARS: usize = 32;

/// Floor for any non-identical match so exact fields always rank first.
const MIN_PARTIAL_DISTANCE: f64 = 0.001;

/// Bounded Levenshtein search over every start offset of a field.
///
/// An alignment starting at offset `s` with `e` errors for a pattern of
/// length `m` costs `e / m + s / location_distance`. Alignments above
/// `threshold` are discarded, and an alignment only counts if it holds a
/// run of at least `min_fragment_len` exactly matched characters.
#[derive(Debug, Clone)]
pub struct EditDistanceScorer {
    threshold: f64,
    location_distance: usize,
    min_fragment_len: usize,
}

impl Default for EditDistanceScorer {
    fn default() -> Self {
        Self::new(0.3, 100, 3)
    }
}

impl EditDistanceScorer {
    pub fn new(threshold: f64, location_distance: usize, min_fragment_len: usize) -> Self {
        Self {
            threshold,
            location_distance: location_distance.max(1),
            min_fragment_len,
        }
    }

    /// Distance between a single field and the query, case-insensitive.
    pub fn field_distance(&self, text: &str, query: &str) -> Option<f64> {
        let text: Vec<char> = text.to_lowercase().chars().collect();
        let pattern: Vec<char> = query.to_lowercase().chars().collect();

        if text.is_empty() || pattern.is_empty() {
            return None;
        }
        if text == pattern {
            return Some(0.0);
        }

        let chunks: Vec<&[char]> = pattern.chunks(MAX_PATTERN_CHARS).collect();
        let mut total = 0.0;
        let mut matched = false;

        for chunk in &chunks {
            match self.best_alignment(&text, chunk) {
                Some(distance) => {
                    matched = true;
                    total += distance.max(MIN_PARTIAL_DISTANCE);
                }
                None => total += 1.0,
            }
        }

        matched.then(|| total / chunks.len() as f64)
    }

    fn best_alignment(&self, text: &[char], pattern: &[char]) -> Option<f64> {
        let m = pattern.len();
        let max_errors = (self.threshold * m as f64).floor() as usize;
        let max_start = (self.threshold * self.location_distance as f64).floor() as usize;

        let mut best: Option<f64> = None;

        for start in 0..text.len().min(max_start + 1) {
            let location_cost = start as f64 / self.location_distance as f64;
            if best.is_some_and(|b| location_cost >= b) {
                break;
            }

            let end = text.len().min(start + m + max_errors);
            let window = &text[start..end];
            let table = edit_table(pattern, window);

            for (j, &errors) in table[m].iter().enumerate() {
                if errors > max_errors {
                    continue;
                }
                let distance = errors as f64 / m as f64 + location_cost;
                if distance > self.threshold || best.is_some_and(|b| distance >= b) {
                    continue;
                }
                if longest_run(&table, pattern, window, j) >= self.min_fragment_len {
                    best = Some(distance);
                }
            }
        }

        best
    }
}

impl FuzzyScorer for EditDistanceScorer {
    fn score(&self, fields: &[FieldText<'_>], query: &str) -> Option<f64> {
        let total_weight: f64 = fields.iter().map(|f| f.weight).sum();
        if total_weight <= 0.0 {
            return None;
        }

        let mut combined = 1.0;
        let mut matched = false;

        for field in fields {
            let Some(distance) = self.field_distance(field.text, query) else {
                continue;
            };
            matched = true;
            let distance = if distance == 0.0 { f64::EPSILON } else { distance };
            combined *= distance.powf(field.weight / total_weight);
        }

        matched.then_some(combined.clamp(0.0, 1.0))
    }
}

/// Levenshtein table of `pattern` (rows) against a prefix of `window` (columns).
fn edit_table(pattern: &[char], window: &[char]) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0usize; window.len() + 1]; pattern.len() + 1];

    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=window.len() {
        table[0][j] = j;
    }

    for i in 1..=pattern.len() {
        for j in 1..=window.len() {
            let substitution = usize::from(pattern[i - 1] != window[j - 1]);
            table[i][j] = (table[i - 1][j - 1] + substitution)
                .min(table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1);
        }
    }

    table
}

/// Longest run of consecutive exactly matched window characters on the
/// alignment that ends at column `end`.
fn longest_run(table: &[Vec<usize>], pattern: &[char], window: &[char], end: usize) -> usize {
    let (mut i, mut j) = (pattern.len(), end);
    let mut longest = 0;
    let mut run = 0;
    let mut last_matched: Option<usize> = None;

    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let diagonal = table[i - 1][j - 1];
            if pattern[i - 1] == window[j - 1] && diagonal == table[i][j] {
                run = match last_matched {
                    Some(prev) if prev == j => run + 1,
                    _ => 1,
                };
                longest = longest.max(run);
                last_matched = Some(j - 1);
                i -= 1;
                j -= 1;
                continue;
            }
            if diagonal + 1 == table[i][j] {
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && table[i - 1][j] + 1 == table[i][j] {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    longest
}

//! Cutting finalized episodes into retrieval chunks and ranking them.

use crate::{Chunk, Episode, RelevantChunk, Story};
use std::cmp::Ordering;

/// Foundational chunks always offered to the ranker.
const FOUNDATIONAL_LIMIT: usize = 2;

/// Split prose into sentences and lines, trimmed, empties dropped.
///
/// A terminal followed by a closing quote ends the sentence only when the
/// next word starts with an uppercase letter, so dialogue keeps its
/// attribution.
///
/// # Examples
///
/// ```
/// use shakescript_core::split_sentences;
///
/// let parts = split_sentences("It rained. \"Run!\" she said.\nThe end");
/// assert_eq!(parts, vec!["It rained.", "\"Run!\" she said.", "The end"]);
/// ```
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;
    let mut quoted = false;

    for (i, ch) in text.char_indices() {
        if ch == '\n' || (after_terminal && ch.is_whitespace()) {
            if ch != '\n' && quoted && !opens_sentence(&text[i..]) {
                after_terminal = false;
                quoted = false;
                continue;
            }
            let sentence = text[start..i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i;
            after_terminal = false;
            quoted = false;
            continue;
        }
        match ch {
            '.' | '!' | '?' => {
                after_terminal = true;
                quoted = false;
            }
            '"' | '\'' | ')' | '\u{201d}' | '\u{2019}' => quoted = after_terminal,
            _ => {
                after_terminal = false;
                quoted = false;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Whether the text after a closing quote begins a new sentence.
fn opens_sentence(rest: &str) -> bool {
    match rest.chars().find(|c| *c == '\n' || !c.is_whitespace()) {
        None | Some('\n') => true,
        Some(c) => c.is_uppercase(),
    }
}

/// Pack sentences into chunks of at most `max_chars`, repeating up to
/// `overlap` characters of trailing sentences at the head of the next chunk.
///
/// Carried sentences are dropped from the front when the incoming sentence
/// would not fit beside them. A single sentence longer than `max_chars`
/// becomes its own chunk.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let overlap = overlap.min(max_chars / 2);
    let width = |parts: &[&str]| parts.iter().map(|p| p.len() + 1).sum::<usize>();

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for sentence in split_sentences(text) {
        if !current.is_empty() && width(&current) + sentence.len() > max_chars {
            chunks.push(current.join(" "));
            let mut carry = Vec::new();
            let mut carried = 0;
            for previous in current.iter().rev() {
                if carried + previous.len() > overlap {
                    break;
                }
                carried += previous.len() + 1;
                carry.push(*previous);
            }
            carry.reverse();
            while !carry.is_empty() && width(&carry) + sentence.len() > max_chars {
                carry.remove(0);
            }
            current = carry;
        }
        current.push(sentence);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Known character names that appear in `text`, case-insensitively.
pub fn characters_mentioned<'a>(
    text: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let haystack = text.to_lowercase();
    names
        .into_iter()
        .filter(|name| !name.trim().is_empty() && haystack.contains(&name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// One point per mentioned character, two more for the opening and
/// midpoint episodes.
///
/// # Examples
///
/// ```
/// use shakescript_core::importance_score;
///
/// assert_eq!(importance_score(2, 1, 10), 4.0);
/// assert_eq!(importance_score(1, 5, 10), 3.0);
/// assert_eq!(importance_score(1, 7, 10), 1.0);
/// ```
pub fn importance_score(mentioned: usize, episode_number: u32, num_episodes: u32) -> f32 {
    let foundational = episode_number == 1 || episode_number == num_episodes / 2;
    mentioned as f32 + if foundational { 2.0 } else { 0.0 }
}

/// Chunks for a finalized episode, embeddings left empty.
pub fn chunk_episode(
    story: &Story,
    episode: &Episode,
    max_chars: usize,
    overlap: usize,
) -> Vec<Chunk> {
    let names: Vec<&str> = story.characters().iter().map(|c| c.name.as_str()).collect();
    chunk_text(&episode.content, max_chars, overlap)
        .into_iter()
        .enumerate()
        .map(|(index, content)| {
            let characters = characters_mentioned(&content, names.iter().copied());
            let importance_score =
                importance_score(characters.len(), episode.episode_number, story.num_episodes);
            Chunk {
                story_id: story.id,
                episode_number: episode.episode_number,
                chunk_number: index as u32 + 1,
                content,
                characters,
                embedding: Vec::new(),
                importance_score,
            }
        })
        .collect()
}

/// Cosine similarity; zero for mismatched or zero-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn position(a: &Chunk, b: &Chunk) -> Ordering {
    (a.episode_number, a.chunk_number).cmp(&(b.episode_number, b.chunk_number))
}

/// Rank a story's chunks for a query embedding.
///
/// The top `k` by similarity are merged with up to two foundational
/// chunks (episode 1 and `midpoint`, heaviest first), re-sorted by
/// importance plus similarity and cut to `k`.
pub fn rank_chunks(
    chunks: &[Chunk],
    query_embedding: &[f32],
    midpoint: u32,
    k: usize,
) -> Vec<RelevantChunk> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &Chunk)> = chunks
        .iter()
        .map(|chunk| (cosine_similarity(&chunk.embedding, query_embedding), chunk))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| position(a.1, b.1)));

    let mut foundational: Vec<(f32, &Chunk)> = scored
        .iter()
        .filter(|(_, c)| c.episode_number == 1 || (midpoint > 0 && c.episode_number == midpoint))
        .copied()
        .collect();
    foundational.sort_by(|a, b| {
        b.1.importance_score
            .total_cmp(&a.1.importance_score)
            .then_with(|| position(a.1, b.1))
    });

    let mut picked: Vec<(f32, &Chunk)> = scored.iter().take(k).copied().collect();
    for candidate in foundational.into_iter().take(FOUNDATIONAL_LIMIT) {
        if !picked.iter().any(|(_, c)| position(c, candidate.1).is_eq()) {
            picked.push(candidate);
        }
    }

    picked.sort_by(|a, b| {
        (b.1.importance_score + b.0)
            .total_cmp(&(a.1.importance_score + a.0))
            .then_with(|| position(a.1, b.1))
    });
    picked.truncate(k);
    picked.into_iter().map(|(_, chunk)| chunk.into()).collect()
}

use super::{Chunk, Document};

/// Packs words into non-overlapping chunks of at most `chunk_size` chars.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for word in document.text.split_whitespace() {
            let word_len = word.chars().count();

            if word_len > self.chunk_size {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let chars: Vec<char> = word.chars().collect();
                pieces.extend(chars.chunks(self.chunk_size).map(|c| c.iter().collect()));
                continue;
            }

            let needed = if current.is_empty() {
                word_len
            } else {
                current_len + 1 + word_len
            };

            if needed > self.chunk_size {
                pieces.push(std::mem::replace(&mut current, word.to_owned()));
                current_len = word_len;
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_len = needed;
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(id, text)| Chunk {
                id,
                source: document.source.clone(),
                text,
            })
            .collect()
    }
}
